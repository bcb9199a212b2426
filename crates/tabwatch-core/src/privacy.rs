use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::{fmt, num::NonZeroUsize};

use crate::{config::Config, event::PageLocation, observer::TabSnapshot};

/// Schemes of pages that belong to the browser itself
const INTERNAL_SCHEMES: &[&str] = &[
    "about",
    "brave",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "extension",
    "moz-extension",
    "opera",
    "resource",
    "safari-web-extension",
    "view-source",
    "vivaldi",
];

const PATTERN_CACHE_SIZE: usize = 256;

/// Title sent in place of one that matched `excludeTitles`
pub const REDACTED_TITLE: &str = "[REDACTED]";

/// Personal data masked in titles, applied in order. Longer digit runs go
/// first so a card number is not half-eaten by the phone pattern.
const PII_PATTERNS: &[(&str, &str)] = &[
    (
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        "[EMAIL]",
    ),
    (r"\b(?:\d{4}[-.\s]?){3}\d{4}\b", "[CREDIT_CARD]"),
    (r"\b\d{3}[-.\s]?\d{2}[-.\s]?\d{4}\b", "[SSN]"),
    (
        r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
        "[PHONE]",
    ),
];

/// Why a snapshot was not tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    MissingUrl,
    InternalPage(String),
    Incognito,
    ExcludedDomain(String),
    ExcludedPattern(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUrl => write!(f, "no usable URL"),
            Self::InternalPage(scheme) => write!(f, "browser page ({scheme}:)"),
            Self::Incognito => write!(f, "incognito tab"),
            Self::ExcludedDomain(domain) => write!(f, "excluded domain '{domain}'"),
            Self::ExcludedPattern(pattern) => write!(f, "excluded pattern '{pattern}'"),
        }
    }
}

/// Privacy filter for controlling what gets tracked
///
/// Compiled exclude patterns are cached by source string. The cache is dropped
/// whenever the settings revision moves.
pub struct PrivacyFilter {
    patterns: LruCache<String, Option<Regex>>,
    pii: Vec<(Regex, &'static str)>,
    revision: u64,
}

impl PrivacyFilter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: LruCache::new(
                NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            ),
            pii: compile_pii(),
            revision: 0,
        }
    }

    /// Forget compiled patterns if the settings changed since the last call.
    pub fn sync_revision(&mut self, revision: u64) {
        if revision != self.revision {
            log::debug!(
                "Settings revision {} -> {revision}, dropping {} cached patterns",
                self.revision,
                self.patterns.len()
            );
            self.patterns.clear();
            self.revision = revision;
        }
    }

    /// Decide whether `snapshot` may be tracked.
    ///
    /// Checks run in a fixed order and stop at the first rejection. On accept
    /// the parsed location is handed back so later stages do not re-parse.
    ///
    /// # Errors
    ///
    /// Returns the [`BlockReason`] of the first check that rejected the snapshot.
    pub fn evaluate(
        &mut self,
        snapshot: &TabSnapshot,
        config: &Config,
    ) -> Result<PageLocation, BlockReason> {
        let raw = snapshot
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(BlockReason::MissingUrl)?;
        let location = PageLocation::parse(raw).ok_or(BlockReason::MissingUrl)?;

        if is_internal_scheme(&location.protocol) {
            return Err(BlockReason::InternalPage(location.protocol));
        }

        if snapshot.incognito && !config.incognito_tracking {
            return Err(BlockReason::Incognito);
        }

        if let Some(domain) = excluded_domain(&location.domain, config) {
            return Err(BlockReason::ExcludedDomain(domain.to_string()));
        }

        for source in &config.exclude_patterns {
            if self.pattern_matches(source, &location.url) {
                return Err(BlockReason::ExcludedPattern(source.clone()));
            }
        }

        Ok(location)
    }

    /// Title as it may leave the machine.
    ///
    /// A title matching any `excludeTitles` pattern is replaced whole.
    /// Otherwise personal data inside it is masked when `redactPii` is set.
    pub fn redact_title(&mut self, title: &str, config: &Config) -> String {
        for source in &config.exclude_titles {
            if self.pattern_matches(source, title) {
                log::debug!("Title matched exclude pattern '{source}'");
                return REDACTED_TITLE.to_string();
            }
        }
        if !config.redact_pii {
            return title.to_string();
        }
        self.pii
            .iter()
            .fold(title.to_string(), |text, (re, mask)| {
                re.replace_all(&text, *mask).into_owned()
            })
    }

    fn pattern_matches(&mut self, source: &str, text: &str) -> bool {
        let compiled = self.patterns.get_or_insert(source.to_string(), || {
            match RegexBuilder::new(source).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Ignoring invalid exclude pattern '{source}': {e}");
                    None
                }
            }
        });
        compiled.as_ref().is_some_and(|re| re.is_match(text))
    }
}

impl Default for PrivacyFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_pii() -> Vec<(Regex, &'static str)> {
    PII_PATTERNS
        .iter()
        .filter_map(|(source, mask)| match Regex::new(source) {
            Ok(re) => Some((re, *mask)),
            Err(e) => {
                log::error!("Built-in {mask} pattern failed to compile: {e}");
                None
            }
        })
        .collect()
}

fn is_internal_scheme(scheme: &str) -> bool {
    INTERNAL_SCHEMES.contains(&scheme)
}

fn excluded_domain<'a>(hostname: &str, config: &'a Config) -> Option<&'a str> {
    let hostname = hostname.to_lowercase();
    config
        .exclude_domains
        .iter()
        .map(|d| d.trim())
        .find(|d| !d.is_empty() && hostname.contains(&d.to_lowercase()))
}
