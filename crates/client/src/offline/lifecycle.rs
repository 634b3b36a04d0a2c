//! Install/activate lifecycle state and phase reports.

use serde::Serialize;
use std::fmt;

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, nothing provisioned yet.
    #[default]
    Parsed,
    Installing,
    /// Provisioned and ready to take over without waiting.
    Installed,
    Activating,
    /// Controlling every request.
    Activated,
    /// Install could not open the store.
    Redundant,
}

impl WorkerState {
    pub fn can_activate(self) -> bool {
        matches!(self, Self::Installed | Self::Activating | Self::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// A manifest locator that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLocator {
    pub locator: String,
    pub reason: String,
}

/// Outcome of install provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub store: String,
    /// URLs stored, in manifest order.
    pub stored: Vec<String>,
    pub failed: Vec<FailedLocator>,
    /// Always true: a partially provisioned store still takes over.
    pub skip_waiting: bool,
}

/// Outcome of activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub store: String,
    /// Stale stores removed.
    pub deleted: Vec<String>,
    /// Always true: open sessions are controlled immediately.
    pub claimed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_activate() {
        assert!(!WorkerState::Parsed.can_activate());
        assert!(!WorkerState::Installing.can_activate());
        assert!(!WorkerState::Redundant.can_activate());
        assert!(WorkerState::Installed.can_activate());
        assert!(WorkerState::Activating.can_activate());
        assert!(WorkerState::Activated.can_activate());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&WorkerState::Activated).unwrap();
        assert_eq!(json, "\"activated\"");
        assert_eq!(WorkerState::Installing.to_string(), "installing");
    }
}
