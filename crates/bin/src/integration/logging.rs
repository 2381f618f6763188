//! Tracing setup for the CLI.

use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Filter used when `RUST_LOG` is unset.
pub(crate) const DEFAULT_FILTER: &str = "warn,steelwatch=info";

/// Log sink that writes to stderr, suspending the active progress bar (if
/// any) for the duration of each event.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressWriter {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl ProgressWriter {
    /// Route subsequent log lines around `bar`.
    pub(crate) fn attach(&self, bar: &ProgressBar) {
        *self.slot() = Some(bar.clone());
    }

    /// Stop suspending; log lines go straight to stderr.
    pub(crate) fn detach(&self) {
        *self.slot() = None;
    }

    fn current(&self) -> Option<ProgressBar> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter {
            bar: self.current(),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Buffers one formatted event and emits it on drop.
#[derive(Debug)]
pub(crate) struct EventWriter {
    bar: Option<ProgressBar>,
    buf: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let emit = || {
            let _ = io::stderr().lock().write_all(&self.buf);
        };
        match &self.bar {
            Some(bar) if !bar.is_finished() => bar.suspend(emit),
            _ => emit(),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub(crate) fn init(writer: ProgressWriter) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .init();
}
