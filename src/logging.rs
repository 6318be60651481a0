//! Tracing subscriber setup for the binary.
//!
//! Filtering follows `RUST_LOG` (default `info`). `LOG_FORMAT=json` selects
//! JSON lines; anything else the human-readable formatter.

use tracing_subscriber::EnvFilter;

/// Output format of log events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Read the format from the `LOG_FORMAT` value
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Read the format from the process environment
    pub fn from_env() -> Self {
        Self::from_value(std::env::var("LOG_FORMAT").ok().as_deref())
    }
}

/// Initialize tracing for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => builder.with_target(false).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_selected_case_insensitively() {
        assert_eq!(LogFormat::from_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_value(Some(" JSON ")), LogFormat::Json);
    }

    #[test]
    fn anything_else_is_pretty() {
        assert_eq!(LogFormat::from_value(None), LogFormat::Pretty);
        assert_eq!(LogFormat::from_value(Some("text")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_value(Some("")), LogFormat::Pretty);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogFormat::Pretty);
        init(LogFormat::Json);
    }
}
