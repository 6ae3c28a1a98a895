//! Logger setup.

/// Installs the global logger.
///
/// The default filter is `info`, or `debug` with `verbose`; `RUST_LOG`
/// overrides both. Calling this more than once is harmless.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp(None)
    .format_target(false)
    .try_init();
}
