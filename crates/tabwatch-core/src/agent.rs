use anyhow::Result;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{interval, interval_at, Instant, Interval, MissedTickBehavior},
};

use crate::{
    categorizer::{self, ClassificationSource},
    config::SettingsStore,
    dispatcher::{Dispatcher, Submission},
    event::ActivityEvent,
    observer::{TabSource, Trigger},
    privacy::{BlockReason, PrivacyFilter},
};

/// What a single sampling cycle ended with
#[derive(Debug)]
pub enum CycleOutcome {
    Disabled,
    NoActiveTab,
    Blocked(BlockReason),
    Dispatched(Submission),
}

/// Sampling loop: capture, filter, categorize, dispatch.
///
/// Every trigger source feeds the same channel and cycles run one after the
/// other. Only the network round trip is detached.
pub struct Agent {
    settings: Arc<SettingsStore>,
    source: Arc<dyn TabSource>,
    filter: PrivacyFilter,
    dispatcher: Dispatcher,
    triggers: UnboundedReceiver<Trigger>,
}

impl Agent {
    #[must_use]
    pub fn new(
        settings: Arc<SettingsStore>,
        source: Arc<dyn TabSource>,
        dispatcher: Dispatcher,
        triggers: UnboundedReceiver<Trigger>,
    ) -> Self {
        Self {
            settings,
            source,
            filter: PrivacyFilter::new(),
            dispatcher,
            triggers,
        }
    }

    /// Run until Ctrl-C or until every trigger sender is gone.
    ///
    /// # Errors
    ///
    /// Cycle failures are logged, not returned; this currently always succeeds.
    pub async fn run(&mut self) -> Result<()> {
        let mut period = self.settings.current().await.poll_interval();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Agent started, sampling every {}ms", period.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.cycle(Trigger::Timer).await,
                trigger = self.triggers.recv() => {
                    let Some(trigger) = trigger else {
                        log::info!("All trigger sources closed");
                        break;
                    };
                    self.cycle(trigger).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    break;
                }
            }

            let wanted = self.settings.current().await.poll_interval();
            if wanted != period {
                log::info!(
                    "Sampling interval changed {}ms -> {}ms",
                    period.as_millis(),
                    wanted.as_millis()
                );
                period = wanted;
                ticker = delayed_ticker(period);
            }
        }

        log::info!("Agent shut down gracefully.");
        Ok(())
    }

    async fn cycle(&mut self, trigger: Trigger) {
        match self.run_cycle(trigger).await {
            Ok(CycleOutcome::Blocked(reason)) => log::debug!("[{trigger}] not tracked: {reason}"),
            Ok(CycleOutcome::NoActiveTab) => log::trace!("[{trigger}] no active tab"),
            Ok(_) => {}
            Err(e) => log::error!("[{trigger}] sampling cycle failed: {e:#}"),
        }
    }

    /// One pass through the pipeline for `trigger`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tab source fails.
    pub async fn run_cycle(&mut self, trigger: Trigger) -> Result<CycleOutcome> {
        let config = self.settings.current().await;
        if !config.enabled {
            return Ok(CycleOutcome::Disabled);
        }

        let Some(snapshot) = self.source.active_tab().await? else {
            return Ok(CycleOutcome::NoActiveTab);
        };

        self.filter.sync_revision(self.settings.revision());
        let location = match self.filter.evaluate(&snapshot, &config) {
            Ok(location) => location,
            Err(reason) => return Ok(CycleOutcome::Blocked(reason)),
        };

        let haystack = format!(
            "{} {} {}",
            snapshot.title.as_deref().unwrap_or_default(),
            location.url,
            location.domain
        );
        let classification = categorizer::classify(
            &location.domain,
            &location.path,
            &config.client_keywords,
            &haystack,
        );
        if let ClassificationSource::ClientKeyword { client, keyword } = &classification.source {
            log::debug!("[{trigger}] attributed to client '{client}' ('{keyword}')");
        }

        // Titles are redacted only after classification has seen them
        let mut snapshot = snapshot;
        if config.track_titles {
            snapshot.title = snapshot
                .title
                .map(|title| self.filter.redact_title(&title, &config));
        }

        let event = ActivityEvent::heartbeat(
            &snapshot,
            &location,
            classification.category,
            &config,
            Utc::now(),
        );
        Ok(CycleOutcome::Dispatched(self.dispatcher.submit(event).await))
    }
}

fn delayed_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
