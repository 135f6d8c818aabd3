//! Tracing setup and span helpers.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Logs how long an operation took when dropped.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        tracing::debug!(
            operation = self.operation,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "Operation finished"
        );
    }
}

pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one verification.
    pub fn verification(account: &str, member: &str, label: &str) -> Span {
        info_span!("verification", account = %account, member = %member, label = %label)
    }

    /// Span covering a staff operation on one member.
    pub fn staff(operation: &'static str, member: &str, label: &str) -> Span {
        info_span!("staff", operation = operation, member = %member, label = %label)
    }
}
