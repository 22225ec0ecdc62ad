use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. Safe to call more than once; only the
/// first call wins.
pub fn init_tracing() {
    // RUST_LOG=uvm_debug_core=debug,uvm_debug_dpi=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .compact()
        .try_init();
}

/// Route panics through tracing so they land next to the simulator log
/// instead of tearing through the host's stderr unannounced.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = match info.payload().downcast_ref::<&str>() {
            Some(s) => (*s).to_string(),
            None => info
                .payload()
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "<non-string panic payload>".to_string()),
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();

        tracing::error!(%thread, %location, %payload, "bridge panicked");
    }));
}
