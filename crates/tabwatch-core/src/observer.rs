use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::sync::RwLock;

/// Window id the browser reports when no window has focus
pub const WINDOW_ID_NONE: i64 = -1;

/// What started a sampling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    TabActivated,
    TabUpdated,
    FocusChanged,
    /// Tracking was switched back on
    Reenabled,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timer => "timer",
            Self::TabActivated => "tab-activated",
            Self::TabUpdated => "tab-updated",
            Self::FocusChanged => "focus-changed",
            Self::Reenabled => "re-enabled",
        };
        f.write_str(name)
    }
}

/// Raw state of the active tab at sampling time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub url: Option<String>,
    pub title: Option<String>,
    pub incognito: bool,
    pub audible: bool,
    pub tab_count: usize,
}

/// Tab as reported by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: i64,
    pub window_id: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default)]
    pub audible: bool,
}

/// Tab and window notifications forwarded by the browser
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabEvent {
    /// Full resync, sent when the browser side connects
    Tabs {
        tabs: Vec<BrowserTab>,
        #[serde(default)]
        focused_window_id: Option<i64>,
    },
    TabActivated {
        tab_id: i64,
        window_id: i64,
    },
    /// Carries the complete new state of the tab
    TabUpdated {
        tab: BrowserTab,
    },
    TabRemoved {
        tab_id: i64,
    },
    WindowFocusChanged {
        window_id: i64,
    },
}

/// Mirror of the browser's tab inventory
#[derive(Debug, Default)]
pub struct TabInventory {
    tabs: BTreeMap<i64, BrowserTab>,
    focused_window: Option<i64>,
}

impl TabInventory {
    /// Fold an event into the mirror and report whether it should start a cycle.
    pub fn apply(&mut self, event: TabEvent) -> Option<Trigger> {
        match event {
            TabEvent::Tabs {
                tabs,
                focused_window_id,
            } => {
                self.tabs = tabs.into_iter().map(|t| (t.id, t)).collect();
                self.focused_window = focused_window_id.filter(|id| *id != WINDOW_ID_NONE);
                log::debug!("Tab inventory resynced: {} tabs", self.tabs.len());
                None
            }
            TabEvent::TabActivated { tab_id, window_id } => {
                self.activate(tab_id, window_id);
                Some(Trigger::TabActivated)
            }
            TabEvent::TabUpdated { tab } => {
                let id = tab.id;
                if tab.active {
                    self.deactivate_window(tab.window_id);
                }
                let changed = match self.tabs.insert(id, tab.clone()) {
                    Some(prev) => prev.url != tab.url || prev.title != tab.title,
                    None => true,
                };

                let is_current = self.active_tab().is_some_and(|t| t.id == id);
                (is_current && changed).then_some(Trigger::TabUpdated)
            }
            TabEvent::TabRemoved { tab_id } => {
                self.tabs.remove(&tab_id);
                None
            }
            TabEvent::WindowFocusChanged { window_id } => {
                if window_id == WINDOW_ID_NONE {
                    return None;
                }
                self.focused_window = Some(window_id);
                Some(Trigger::FocusChanged)
            }
        }
    }

    fn activate(&mut self, tab_id: i64, window_id: i64) {
        self.deactivate_window(window_id);
        if let Some(tab) = self.tabs.get_mut(&tab_id) {
            tab.active = true;
            tab.window_id = window_id;
        }
    }

    fn deactivate_window(&mut self, window_id: i64) {
        for tab in self.tabs.values_mut().filter(|t| t.window_id == window_id) {
            tab.active = false;
        }
    }

    /// Active tab of the focused window. Before any focus is known, the first
    /// active tab is used.
    #[must_use]
    pub fn active_tab(&self) -> Option<&BrowserTab> {
        let mut active = self.tabs.values().filter(|t| t.active);
        match self.focused_window {
            Some(window_id) => active.find(|t| t.window_id == window_id),
            None => active.next(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<TabSnapshot> {
        self.active_tab().map(|tab| TabSnapshot {
            url: tab.url.clone(),
            title: tab.title.clone(),
            incognito: tab.incognito,
            audible: tab.audible,
            tab_count: self.tabs.len(),
        })
    }
}

/// Source of active-tab snapshots
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Snapshot the active tab, `None` when there is none.
    async fn active_tab(&self) -> Result<Option<TabSnapshot>>;
}

/// Shared handle on the inventory: the host reader writes, the agent reads.
#[derive(Clone, Default)]
pub struct TabObserver {
    inventory: Arc<RwLock<TabInventory>>,
}

impl TabObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn observe(&self, event: TabEvent) -> Option<Trigger> {
        self.inventory.write().await.apply(event)
    }
}

#[async_trait]
impl TabSource for TabObserver {
    async fn active_tab(&self) -> Result<Option<TabSnapshot>> {
        Ok(self.inventory.read().await.snapshot())
    }
}
