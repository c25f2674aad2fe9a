/// The options the symbol-table and type-checking core reads.
///
/// These only affect violation severity and diagnostic emission, never the
/// inferred types themselves.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Demotes certain type errors to warnings, matching the behaviour of
    /// checkers that predate the type system.
    pub backward_compat: bool,
    /// Whether type-checking warnings are emitted at all.
    pub type_check_warnings: bool,
    /// Verbosity level; gates informational output only.
    pub verbosity: u8,
}

impl Default for Opts {
    fn default() -> Self {
        Self { backward_compat: false, type_check_warnings: true, verbosity: 0 }
    }
}

impl Opts {
    /// Returns a copy of `self` with backward compatibility enabled.
    pub fn with_backward_compat(mut self) -> Self {
        self.backward_compat = true;
        self
    }

    /// Returns a copy of `self` with warnings suppressed.
    pub fn without_warnings(mut self) -> Self {
        self.type_check_warnings = false;
        self
    }
}
