//! Explicit logging configuration (replaces the observed `DEBUG = True/False`
//! module-level toggle in the original source with a config value threaded
//! through the port session).

/// Sink for link-layer diagnostics: unexpected bytes, checksum failures,
/// retries, and similar events that are worth a human's attention but are
/// not themselves errors returned to a caller.
pub trait TraceSink: Send + Sync {
    fn trace(&self, message: &str);
}

/// Default sink, forwarding to the `log` facade at `debug!` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn trace(&self, message: &str) {
        log::debug!("{message}");
    }
}

/// Discards everything. Useful in tests that assert on wire bytes and don't
/// want log noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn trace(&self, _message: &str) {}
}
