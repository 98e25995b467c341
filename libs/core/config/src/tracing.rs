use crate::Environment;
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Output format of the fmt layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Resolve the format from `LOG_FORMAT`, defaulting by environment
    ///
    /// Production defaults to JSON, development to pretty output. Unknown
    /// values fall back to the environment default.
    pub fn from_env(environment: &Environment) -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|raw| LogFormat::from_str(raw.trim()).ok())
            .unwrap_or(if environment.is_production() {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            })
    }
}

/// Install color-eyre with the project-standard configuration.
///
/// Call this early in main() before any fallible operations. Safe to call
/// multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Default directives used when `RUST_LOG` is not set.
///
/// The driver logs every pool refresh at info level, so it is kept at warn
/// unless explicitly requested.
pub fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "warn"
    } else {
        "info,scylla=warn"
    }
}

/// Initialize tracing for the given environment.
///
/// - `APP_ENV=production`: JSON lines, warn and above
/// - development (default): pretty output, info and above
/// - `LOG_FORMAT` overrides the format (`pretty`, `compact`, `json`)
/// - `RUST_LOG` overrides the filter
///
/// An `ErrorLayer` is always installed so `color-eyre` reports carry span traces.
/// Calling this more than once is harmless (common in tests).
pub fn init_tracing(environment: &Environment) {
    let format = LogFormat::from_env(environment);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment)));

    let registry = tracing_subscriber::registry()
        .with(tracing_error::ErrorLayer::default())
        .with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .try_init(),
    };

    match result {
        Ok(_) => info!(?environment, %format, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping re-initialization"),
    }
}
