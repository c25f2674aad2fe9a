//! Diagnostics implementation.
//!
//! A trimmed-down cousin of `rustc_errors`: a [`DiagCtxt`] hands out
//! [`DiagBuilder`]s which are filled in and emitted through an [`Emitter`].

use std::{fmt, sync::Mutex};

mod emitter;
pub use emitter::{BufferEmitter, Emitter, HumanEmitter};

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// An error; the requested operation has failed.
    Error,
    /// A warning; the operation proceeds.
    Warning,
    /// Additional information attached to a previous diagnostic.
    Note,
}

impl Level {
    /// The label printed before the message.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }

    fn style(self) -> anstyle::Style {
        use anstyle::{AnsiColor, Color};
        let color = match self {
            Self::Error => AnsiColor::BrightRed,
            Self::Warning => AnsiColor::BrightYellow,
            Self::Note => AnsiColor::BrightGreen,
        };
        anstyle::Style::new().fg_color(Some(Color::Ansi(color))).bold()
    }
}

/// A single diagnostic.
#[derive(Clone, Debug)]
pub struct Diag {
    /// Severity.
    pub level: Level,
    /// The main message.
    pub msg: String,
    /// The input file the diagnostic refers to, if known.
    pub file: Option<String>,
    /// The 1-based input line the diagnostic refers to, if known.
    pub line: Option<u32>,
    /// A rendering of the offending (sub-)expression, if any.
    pub expr: Option<String>,
}

impl Diag {
    fn new(level: Level, msg: impl Into<String>) -> Self {
        Self { level, msg: msg.into(), file: None, line: None, expr: None }
    }
}

/// The diagnostics context: counts and emits diagnostics.
pub struct DiagCtxt {
    inner: Mutex<DiagCtxtInner>,
}

struct DiagCtxtInner {
    emitter: Box<dyn Emitter>,
    err_count: usize,
    warn_count: usize,
}

impl fmt::Debug for DiagCtxt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagCtxt").finish_non_exhaustive()
    }
}

impl DiagCtxt {
    /// Creates a new context with the given emitter.
    pub fn new(emitter: Box<dyn Emitter>) -> Self {
        Self { inner: Mutex::new(DiagCtxtInner { emitter, err_count: 0, warn_count: 0 }) }
    }

    /// Creates a new context printing to stderr.
    pub fn with_stderr_emitter() -> Self {
        Self::new(Box::new(HumanEmitter::stderr()))
    }

    /// Creates a new context that only buffers diagnostics; retrieve them
    /// with [`emitted`](Self::emitted).
    pub fn with_buffer_emitter() -> Self {
        Self::new(Box::<BufferEmitter>::default())
    }

    /// Creates a builder at the `Error` level with the given message.
    #[track_caller]
    pub fn err(&self, msg: impl Into<String>) -> DiagBuilder<'_> {
        DiagBuilder { dcx: self, diag: Diag::new(Level::Error, msg) }
    }

    /// Creates a builder at the `Warning` level with the given message.
    #[track_caller]
    pub fn warn(&self, msg: impl Into<String>) -> DiagBuilder<'_> {
        DiagBuilder { dcx: self, diag: Diag::new(Level::Warning, msg) }
    }

    /// Creates a builder at the `Note` level with the given message.
    #[track_caller]
    pub fn note(&self, msg: impl Into<String>) -> DiagBuilder<'_> {
        DiagBuilder { dcx: self, diag: Diag::new(Level::Note, msg) }
    }

    /// The number of errors emitted so far.
    pub fn err_count(&self) -> usize {
        self.inner.lock().unwrap().err_count
    }

    /// The number of warnings emitted so far.
    pub fn warn_count(&self) -> usize {
        self.inner.lock().unwrap().warn_count
    }

    /// Whether any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.err_count() > 0
    }

    /// Returns the buffered diagnostics, if this context buffers them.
    pub fn emitted(&self) -> Vec<Diag> {
        self.inner.lock().unwrap().emitter.buffered().unwrap_or_default()
    }

    fn emit_diag(&self, diag: Diag) {
        let mut inner = self.inner.lock().unwrap();
        match diag.level {
            Level::Error => inner.err_count += 1,
            Level::Warning => inner.warn_count += 1,
            Level::Note => {}
        }
        inner.emitter.emit(&diag);
    }
}

/// An in-flight diagnostic. Build it up, then [`emit`](Self::emit) it.
#[must_use = "diagnostics do nothing unless emitted"]
pub struct DiagBuilder<'a> {
    dcx: &'a DiagCtxt,
    diag: Diag,
}

impl DiagBuilder<'_> {
    /// Attaches the input file name.
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.diag.file = Some(file.into());
        self
    }

    /// Attaches the input line number.
    pub fn line(mut self, line: u32) -> Self {
        self.diag.line = Some(line);
        self
    }

    /// Attaches a rendering of the offending expression.
    pub fn expr(mut self, expr: impl fmt::Display) -> Self {
        self.diag.expr = Some(expr.to_string());
        self
    }

    /// Emits the diagnostic.
    pub fn emit(self) {
        self.dcx.emit_diag(self.diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_buffering() {
        let dcx = DiagCtxt::with_buffer_emitter();
        dcx.err("boom").line(3).emit();
        dcx.warn("careful").emit();
        assert_eq!(dcx.err_count(), 1);
        assert_eq!(dcx.warn_count(), 1);
        assert!(dcx.has_errors());
        let diags = dcx.emitted();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].msg, "boom");
        assert_eq!(diags[0].line, Some(3));
        assert_eq!(diags[1].level, Level::Warning);
    }
}
