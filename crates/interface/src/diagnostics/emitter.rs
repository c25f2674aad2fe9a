use super::Diag;
use std::io::Write;

/// Where diagnostics end up.
pub trait Emitter: Send {
    /// Emits one diagnostic.
    fn emit(&mut self, diag: &Diag);

    /// Returns the diagnostics emitted so far, for emitters that keep them.
    fn buffered(&self) -> Option<Vec<Diag>> {
        None
    }
}

/// Renders diagnostics as styled text on a stream.
pub struct HumanEmitter {
    out: anstream::AutoStream<std::io::Stderr>,
}

impl HumanEmitter {
    /// Creates an emitter writing to stderr, with styling when supported.
    pub fn stderr() -> Self {
        Self { out: anstream::AutoStream::auto(std::io::stderr()) }
    }
}

impl Emitter for HumanEmitter {
    fn emit(&mut self, diag: &Diag) {
        let style = diag.level.style();
        let _ = write!(self.out, "{style}{}{style:#}: {}", diag.level.as_str(), diag.msg);
        if let Some(expr) = &diag.expr {
            let _ = write!(self.out, ": {expr}");
        }
        let _ = writeln!(self.out);
        if diag.file.is_some() || diag.line.is_some() {
            let file = diag.file.as_deref().unwrap_or("<input>");
            match diag.line {
                Some(line) => {
                    let _ = writeln!(self.out, "  --> {file}:{line}");
                }
                None => {
                    let _ = writeln!(self.out, "  --> {file}");
                }
            }
        }
        let _ = self.out.flush();
    }
}

/// Keeps diagnostics in memory; used by tests.
#[derive(Default)]
pub struct BufferEmitter {
    buf: Vec<Diag>,
}

impl Emitter for BufferEmitter {
    fn emit(&mut self, diag: &Diag) {
        self.buf.push(diag.clone());
    }

    fn buffered(&self) -> Option<Vec<Diag>> {
        Some(self.buf.clone())
    }
}
