//! Logging setup for collaborators embedding the pipeline.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a formatted `tracing` subscriber.
///
/// `verbosity` maps 0 to WARN, 1 to INFO, 2 to DEBUG and anything higher to
/// TRACE. Returns `false` if a global subscriber was already installed, in
/// which case the existing one is kept.
pub fn init_tracing(verbosity: u8) -> bool {
    let log_level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let _ = init_tracing(1);
        assert!(!init_tracing(3));
    }
}
