use env_logger::{Builder, Env};

/// Initialize stderr logging. `RUST_LOG` wins over the configured level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_level: &str) {
    let env = Env::default().default_filter_or(default_level);
    if let Err(e) = Builder::from_env(env).format_timestamp_secs().try_init() {
        log::debug!("logger already initialized: {}", e);
    }
}
