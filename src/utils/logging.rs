use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `settings.level` is used, and an
/// unparsable level falls back to `info`.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level_filter(&settings.level));

    // a subscriber may already be installed by an earlier test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn level_filter(level: &str) -> EnvFilter {
    let level = match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        other => other.to_string(),
    };
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn level_filter_accepts_names_and_directives() {
        assert_eq!(level_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(level_filter("WARNING").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(
            level_filter("gamehub=trace").max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn level_filter_falls_back_to_info() {
        assert_eq!(level_filter("gamehub=loud").max_level_hint(), Some(LevelFilter::INFO));
    }
}
