use serde::{Deserialize, Serialize};

/// Short server state reported to front-door callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    /// A new run was submitted and the lock acquired.
    Starting,
    /// A run already holds the lock.
    Online,
    /// Termination was requested and the lock released.
    Stopping,
    /// No run holds the lock.
    Offline,
}

impl ServerStatus {
    /// Returns wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Online => "ONLINE",
            Self::Stopping => "STOPPING",
            Self::Offline => "OFFLINE",
        }
    }
}
