//! User-facing notifications.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::Lane;
use crate::types::DbId;

/// How long a notification stays visible when no duration is given.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
    Warning,
}

impl Severity {
    /// Glyph prefixed to the rendered message.
    pub fn glyph(self) -> Option<&'static str> {
        match self {
            Severity::Info => None,
            Severity::Success => Some("✓"),
            Severity::Error => Some("✗"),
            Severity::Warning => Some("⚠"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// User the notification concerns; `None` means everyone.
    pub user_id: Option<DbId>,
    pub job_id: Option<DbId>,
    pub lane: Option<Lane>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            duration: DEFAULT_NOTIFICATION_DURATION,
            user_id: None,
            job_id: None,
            lane: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn for_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_job(mut self, job_id: DbId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    /// Message with its severity glyph.
    pub fn display_text(&self) -> String {
        match self.severity.glyph() {
            Some(glyph) => format!("{glyph} {}", self.message),
            None => self.message.clone(),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
