use chrono::{DateTime, Utc};
use serde::Serialize;

/// A client's local view of the flag.
///
/// `enabled` starts out `false` and `loading` stays set until the first
/// fetch attempt settles, successful or not.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct FlagState {
    pub enabled: bool,
    pub loading: bool,
    pub last_synced: Option<DateTime<Utc>>,
}

impl Default for FlagState {
    fn default() -> Self {
        Self {
            enabled: false,
            loading: true,
            last_synced: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerBranch {
    Loading,
    On,
    Off,
}

impl FlagState {
    pub fn branch(&self) -> ViewerBranch {
        match (self.loading, self.enabled) {
            (true, _) => ViewerBranch::Loading,
            (false, true) => ViewerBranch::On,
            (false, false) => ViewerBranch::Off,
        }
    }

    /// Adopt a value the service confirmed. Returns whether a subscriber would see a difference.
    pub(crate) fn confirm(&mut self, enabled: bool, at: DateTime<Utc>) -> bool {
        let changed = self.loading || self.enabled != enabled;

        self.enabled = enabled;
        self.loading = false;
        self.last_synced = Some(at);

        changed
    }

    /// Record a failed attempt. The value is left alone.
    pub(crate) fn settle_failure(&mut self) -> bool {
        std::mem::replace(&mut self.loading, false)
    }
}

#[cfg(test)]
mod test {
    use super::{FlagState, ViewerBranch};

    #[test]
    fn test_lifecycle() {
        let mut state = FlagState::default();
        assert_eq!(state.branch(), ViewerBranch::Loading);

        let now = chrono::Utc::now();
        assert!(state.confirm(true, now));
        assert_eq!(state.branch(), ViewerBranch::On);
        assert_eq!(state.last_synced, Some(now));

        assert!(!state.confirm(true, now), "re-confirming is not a change");
        assert!(!state.settle_failure());
        assert_eq!(state.branch(), ViewerBranch::On);

        assert!(state.confirm(false, now));
        assert_eq!(state.branch(), ViewerBranch::Off);
    }

    #[test]
    fn test_first_failure_stops_loading() {
        let mut state = FlagState::default();

        assert!(state.settle_failure());
        assert_eq!(state.branch(), ViewerBranch::Off);
        assert_eq!(state.last_synced, None);
    }
}
