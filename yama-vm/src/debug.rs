//! Categorised debug event stream.
//!
//! The domain, verifier and execution context post human-readable messages
//! and fine-grained [`DSignal`]s to an optional sink. Sinks filter by
//! category, so high-volume streams (per-instruction execution, low-level
//! command tracing) can be disabled without affecting behaviour.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::dsignal::DSignal;

bitflags::bitflags! {
    /// Categories of debug output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugCat: u32 {
        /// Uncategorised events.
        const GENERAL = 1;
        /// Static verification events.
        const VERIF = 1 << 1;
        /// Compilation events.
        const COMPILE = 1 << 2;
        /// Low-level context command events (high volume).
        const CTX_LLCMD = 1 << 3;
        /// Per-instruction bytecode execution events (high volume).
        const BCODE_EXEC = 1 << 4;
    }
}

/// A consumer of debug events.
///
/// Sinks may be shared across threads and are expected to serialise
/// internally.
pub trait DebugSink: Send + Sync {
    /// Categories this sink currently wants. Senders skip formatting for
    /// filtered categories.
    fn cats(&self) -> DebugCat {
        DebugCat::all()
    }

    /// Receives one human-readable event.
    fn message(&self, cat: DebugCat, text: &str);

    /// Receives one fine-grained diagnostic signal.
    fn signal(&self, sig: DSignal) {
        let _ = sig;
    }
}

/// A sink that writes messages to standard error.
#[derive(Debug)]
pub struct StderrSink {
    cats: Mutex<DebugCat>,
}

impl StderrSink {
    /// Creates a sink receiving every category.
    pub fn new() -> Self {
        Self {
            cats: Mutex::new(DebugCat::all()),
        }
    }

    /// Stops receiving the given categories.
    pub fn remove_cat(&self, cat: DebugCat) {
        if let Ok(mut cats) = self.cats.lock() {
            cats.remove(cat);
        }
    }

    /// Resumes receiving the given categories.
    pub fn add_cat(&self, cat: DebugCat) {
        if let Ok(mut cats) = self.cats.lock() {
            cats.insert(cat);
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugSink for StderrSink {
    fn cats(&self) -> DebugCat {
        self.cats.lock().map(|cats| *cats).unwrap_or(DebugCat::empty())
    }

    fn message(&self, cat: DebugCat, text: &str) {
        if self.cats().intersects(cat) {
            eprintln!("[{cat:?}] {text}");
        }
    }
}

/// A sink that counts raised signals, forwarding everything to an optional
/// inner sink. Lets tests assert on the exact failure mode.
pub struct SignalCounter {
    inner: Option<Arc<dyn DebugSink>>,
    counts: Mutex<HashMap<DSignal, usize>>,
}

impl SignalCounter {
    /// Creates a counter forwarding to `inner`.
    pub fn new(inner: Option<Arc<dyn DebugSink>>) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// How many times `sig` has been raised.
    pub fn count(&self, sig: DSignal) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(&sig).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total signals raised across all codes.
    pub fn total(&self) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }
}

impl DebugSink for SignalCounter {
    fn cats(&self) -> DebugCat {
        self.inner
            .as_ref()
            .map(|inner| inner.cats())
            .unwrap_or(DebugCat::all())
    }

    fn message(&self, cat: DebugCat, text: &str) {
        if let Some(inner) = &self.inner {
            inner.message(cat, text);
        }
    }

    fn signal(&self, sig: DSignal) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(sig).or_insert(0) += 1;
        }
        if let Some(inner) = &self.inner {
            inner.signal(sig);
        }
    }
}

pub(crate) fn post_with(
    dbg: &Option<Arc<dyn DebugSink>>,
    cat: DebugCat,
    text: impl FnOnce() -> String,
) {
    if let Some(sink) = dbg {
        if sink.cats().intersects(cat) {
            sink.message(cat, &text());
        }
    }
}

pub(crate) fn post_signal(dbg: &Option<Arc<dyn DebugSink>>, sig: DSignal) {
    if let Some(sink) = dbg {
        sink.signal(sig);
    }
}
