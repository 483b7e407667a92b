//! Tracing setup: rolling file output, optional stdout echo.
//!
//! Auth and websocket spans log identity ids, never tokens, signatures or
//! challenge values; nothing here needs redaction.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

fn rotation(name: &str) -> Rotation {
    match name {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Filter directives used when `RUST_LOG` is not set.
fn default_directives(config: &AppConfig) -> String {
    if config.enable_tracing {
        config.log_level.clone()
    } else {
        // Third-party crates stay at the configured level; our own spans go quiet
        format!("{},ichtaka=off", config.log_level)
    }
}

/// Initialize the global subscriber. The returned guard must stay alive for
/// the process lifetime or buffered log lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender =
        RollingFileAppender::new(rotation(&config.rotation), &config.log_dir, &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .with(fmt::layer().with_target(false))
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ServerConfig};

    fn config(enable_tracing: bool) -> AppConfig {
        AppConfig {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "test.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            enable_tracing,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            auth: AuthConfig {
                jwt_secret: "s".to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 30,
                blacklist_sweep_secs: 60,
            },
            postgres_url: None,
        }
    }

    #[test]
    fn test_directives_silence_own_spans_when_tracing_disabled() {
        assert_eq!(default_directives(&config(true)), "info");
        assert_eq!(default_directives(&config(false)), "info,ichtaka=off");
    }

    #[test]
    fn test_unknown_rotation_falls_back_to_never() {
        assert_eq!(rotation("weekly"), Rotation::NEVER);
        assert_eq!(rotation("daily"), Rotation::DAILY);
    }
}
