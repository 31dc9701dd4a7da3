//! Bootstrap utilities for ils-gateway binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the ILSGW_LOG environment variable.
///
/// Defaults to "info" level if ILSGW_LOG is not set. Output goes to stderr so
/// binaries can print JSON results on stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Split `--config <path>` (or `-c <path>`) out of the process arguments.
///
/// Returns the config path, if given, and the remaining arguments without
/// the program name.
pub fn parse_config_path() -> (Option<String>, Vec<String>) {
    split_config_arg(std::env::args().skip(1))
}

fn split_config_arg<I: IntoIterator<Item = String>>(args: I) -> (Option<String>, Vec<String>) {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(path.to_string());
        } else if arg == "--config" || arg == "-c" {
            config_path = args.next();
        } else {
            rest.push(arg);
        }
    }

    (config_path, rest)
}
