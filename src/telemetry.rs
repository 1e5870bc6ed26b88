//! Telemetry utilities for command timing and span construction.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one inbound update.
    pub fn update(user_id: i64, kind: &str) -> Span {
        info_span!("update", user_id, kind = %kind)
    }

    /// Span for a match session's run loop.
    pub fn session(code: u32) -> Span {
        info_span!("match", code)
    }

    /// Span for a building session's run loop.
    pub fn building(user_id: i64) -> Span {
        info_span!("building", user_id)
    }

    /// Span for a command execution.
    pub fn command(name: &str, user_id: i64) -> Span {
        info_span!("command", name = %name, user_id)
    }
}
