use std::collections::HashSet;

use super::alert::{TriggerId, TriggeredAlert};
use super::quote::Period;

/// State that lives for one interactive session and is never persisted.
///
/// Passed explicitly into engine calls; a fresh context means an empty
/// silence set, which is what a process restart gives you.
#[derive(Debug, Clone)]
pub struct SessionContext {
    silenced: HashSet<TriggerId>,

    /// Play a sound when new alerts appear (presentation concern, stored here)
    pub sound_enabled: bool,

    /// Whether the timed refresh is active
    pub auto_refresh: bool,

    /// Period used for the dashboard metrics
    pub period: Period,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            silenced: HashSet::new(),
            sound_enabled: false,
            auto_refresh: false,
            period: Period::OneMonth,
        }
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add identities to the silence set. Purely additive.
    pub fn silence<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = TriggerId>,
    {
        self.silenced.extend(ids);
    }

    pub fn is_silenced(&self, id: &TriggerId) -> bool {
        self.silenced.contains(id)
    }

    pub fn clear_silenced(&mut self) {
        self.silenced.clear();
    }

    pub fn silenced_count(&self) -> usize {
        self.silenced.len()
    }

    /// Drop alerts whose identity has been silenced in this session.
    pub fn filter_active(&self, alerts: Vec<TriggeredAlert>) -> Vec<TriggeredAlert> {
        alerts
            .into_iter()
            .filter(|a| !self.is_silenced(&a.id()))
            .collect()
    }
}
