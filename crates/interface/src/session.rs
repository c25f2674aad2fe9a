use crate::{Opts, diagnostics::DiagCtxt};
use std::fmt;

/// Information about the current compiler session.
pub struct Session {
    /// The compiler options.
    pub opts: Opts,
    /// The diagnostics context.
    pub dcx: DiagCtxt,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Opts::default())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("opts", &self.opts).finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session emitting diagnostics to stderr.
    pub fn new(opts: Opts) -> Self {
        Self { opts, dcx: DiagCtxt::with_stderr_emitter() }
    }

    /// Creates a session that buffers diagnostics instead of printing them.
    /// Intended for tests.
    pub fn with_buffer_emitter(opts: Opts) -> Self {
        Self { opts, dcx: DiagCtxt::with_buffer_emitter() }
    }

    /// The diagnostics context.
    #[inline]
    pub fn dcx(&self) -> &DiagCtxt {
        &self.dcx
    }

    /// Whether the verbosity level is at least `level`.
    #[inline]
    pub fn verbose_ge(&self, level: u8) -> bool {
        self.opts.verbosity >= level
    }
}
