//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system with a fixed default level
///
/// `RUST_LOG` still overrides the level when set. Calling this more than once
/// is harmless: later calls leave the installed logger in place.
pub fn init_with_level(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
    if result.is_err() {
        debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Parse a level name such as `"info"` or `"warn"`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(LevelFilter::Info));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level(LevelFilter::Debug);
        init_with_level(LevelFilter::Info);
    }
}
