//! Runtime configuration for the lifecycle services.

use serde::Deserialize;
use std::time::Duration;

/// Bounds applied to caller-supplied audit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditLimits {
    /// Maximum actor identifier length in characters, capped at
    /// [`MAX_ACTOR_CHARS`](crate::task::domain::MAX_ACTOR_CHARS).
    pub max_actor_chars: usize,
    /// Maximum remark length in characters.
    pub max_remark_chars: usize,
}

impl Default for AuditLimits {
    fn default() -> Self {
        Self {
            max_actor_chars: 128,
            max_remark_chars: 1000,
        }
    }
}

/// Settings for the background breach sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between sweep passes.
    pub interval_secs: u64,
}

impl SweepConfig {
    /// Returns the sweep interval. Zero is raised to one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Configuration shared by the lifecycle services.
///
/// # Examples
///
/// ```
/// use civicworks::task::services::LifecycleConfig;
///
/// let config = LifecycleConfig::from_json(r#"{"audit": {"max_remark_chars": 200}}"#)
///     .expect("valid configuration");
/// assert_eq!(config.audit.max_remark_chars, 200);
/// assert_eq!(config.audit.max_actor_chars, 128);
/// assert_eq!(config.sweep.interval_secs, 60);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Audit field bounds.
    pub audit: AuditLimits,
    /// Breach sweep settings.
    pub sweep: SweepConfig,
}

impl LifecycleConfig {
    /// Parses configuration from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the document is malformed.
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(document)
    }

    /// Overrides the audit bounds.
    #[must_use]
    pub const fn with_audit_limits(mut self, audit: AuditLimits) -> Self {
        self.audit = audit;
        self
    }

    /// Overrides the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval_secs(mut self, interval_secs: u64) -> Self {
        self.sweep.interval_secs = interval_secs;
        self
    }
}
