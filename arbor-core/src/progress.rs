//! Progress reporting and cancellation for a tree build.
//!
//! The growth engine never talks to a [`Progress`] sink directly. It goes
//! through a [`ProgressGuard`], which batches increments and isolates sink
//! failures so a misbehaving sink cannot abort generation.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::warn;

use crate::error::TreeError;

/// Error type returned by progress sinks.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Total passed to [`Progress::begin_phase`] when the amount of work is not
/// known up front.
pub const UNKNOWN_TOTAL: i64 = -1;

/// Increment batch size used when the total is unknown.
const UNKNOWN_TOTAL_STEP: i64 = 100;

/// Receives coarse progress updates while a tree grows.
pub trait Progress {
    /// Starts a phase of `total` work units, or [`UNKNOWN_TOTAL`].
    fn begin_phase(&mut self, name: &str, total: i64) -> Result<(), SinkError>;

    fn inc_progress(&mut self, n: i64) -> Result<(), SinkError>;

    fn end_phase(&mut self) -> Result<(), SinkError>;
}

/// A sink that ignores every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn begin_phase(&mut self, _name: &str, _total: i64) -> Result<(), SinkError> {
        Ok(())
    }

    fn inc_progress(&mut self, _n: i64) -> Result<(), SinkError> {
        Ok(())
    }

    fn end_phase(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Wraps a [`Progress`] sink for the duration of one build.
///
/// Increments are forwarded in steps of about 1% of the phase total. Sink
/// errors are logged with `warn!`, counted and otherwise ignored.
pub struct ProgressGuard<'a> {
    sink: &'a mut dyn Progress,
    step: i64,
    pending: i64,
    failures: usize,
}

impl<'a> ProgressGuard<'a> {
    pub fn new(sink: &'a mut dyn Progress) -> Self {
        Self {
            sink,
            step: 1,
            pending: 0,
            failures: 0,
        }
    }

    pub fn begin(&mut self, name: &str, total: i64) {
        self.pending = 0;
        self.step = if total > 0 {
            (total / 100).max(1)
        } else {
            UNKNOWN_TOTAL_STEP
        };
        let total = if total > 0 { total } else { UNKNOWN_TOTAL };
        let result = self.sink.begin_phase(name, total);
        self.report("begin_phase", result);
    }

    /// Records `n` finished units, forwarding them once a step is full.
    pub fn inc(&mut self, n: i64) {
        self.pending += n;
        if self.pending >= self.step {
            self.flush();
        }
    }

    /// Flushes outstanding units and closes the phase.
    pub fn end(&mut self) {
        self.flush();
        let result = self.sink.end_phase();
        self.report("end_phase", result);
    }

    /// Number of sink calls that returned an error.
    pub fn failures(&self) -> usize {
        self.failures
    }

    fn flush(&mut self) {
        if self.pending > 0 {
            let n = std::mem::take(&mut self.pending);
            let result = self.sink.inc_progress(n);
            self.report("inc_progress", result);
        }
    }

    fn report(&mut self, call: &'static str, result: Result<(), SinkError>) {
        if let Err(error) = result {
            self.failures += 1;
            warn!(call, %error, "progress sink failed, continuing");
        }
    }
}

/// Cooperative cancellation flag shared with the thread running a build.
///
/// Growth checks it once per stem; a cancelled build returns
/// [`TreeError::Cancelled`] and no tree.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), TreeError> {
        if self.is_cancelled() {
            Err(TreeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
