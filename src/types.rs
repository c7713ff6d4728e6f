use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::{BotMode, ErrorKind};

/// Outcome of a bot-mode change that the remote side accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct BotModeUpdate {
    pub phone: String,
    pub mode: BotMode,
    pub requested_at: DateTime<Utc>,
    /// Response body, when it was JSON. The webhook guarantees nothing more.
    pub response: Option<JsonValue>,
}

/// Reachability of the sheet endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HealthReport {
    /// `None` when the sheet answered with a 2xx.
    pub sheet_error: Option<ErrorKind>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.sheet_error.is_none()
    }
}
