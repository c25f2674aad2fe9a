use smv_interface::Opts;

/// The kinds of type-system violations a checker can report.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeViolation {
    /// An identifier with no declaration.
    UndefinedIdentifier,
    /// An identifier with more than one interpretation.
    AmbiguousIdentifier,
    /// The general violation; always an error.
    TypeMandatory,
    /// A violation that predates the type system; demoted to a warning
    /// under backward compatibility.
    TypeBackCompat,
    /// A violation that is only ever a warning.
    TypeWarning,
    /// Access to bits outside a word's width.
    OutOfWordWidth,
    /// An incorrectly formed word type.
    IncorrectWordWidth,
    /// Word widths not matching a word-array's declared widths.
    OutOfWordArrayWidth,
    /// An incorrectly formed word-array type.
    IncorrectWordArrayWidth,
    /// Duplicate constants in an enum type; demoted under backward
    /// compatibility.
    DuplicateConstants,
    /// `@` time operators may not nest.
    AttimeNested,
    /// `@` requires a constant number as its time.
    AttimeNumberRequired,
    /// Wrong number of arguments in a function call.
    ParamsCount,
    /// Wrong argument types in a function call.
    ParamsType,
    /// A function signature mixing the bit-vector and real/integer
    /// families.
    ParamsFamilyMix,
    /// A constant expression was required.
    NonConstantExpression,
    /// An invalid subrange in a bounded operator.
    InvalidRange,
}

impl TypeViolation {
    /// The human-readable description used in diagnostics.
    pub fn message(self) -> &'static str {
        match self {
            Self::UndefinedIdentifier => "undefined identifier",
            Self::AmbiguousIdentifier => "identifier has more than one interpretation",
            Self::TypeMandatory | Self::TypeBackCompat | Self::TypeWarning => {
                "illegal operand types"
            }
            Self::OutOfWordWidth => "access outside the word width",
            Self::IncorrectWordWidth => "incorrectly formed word type",
            Self::OutOfWordArrayWidth => "word widths do not match the word-array",
            Self::IncorrectWordArrayWidth => "incorrectly formed word-array type",
            Self::DuplicateConstants => "duplicate constants in enum type",
            Self::AttimeNested => "nested @ operators are not allowed",
            Self::AttimeNumberRequired => "the time of @ must be a constant number",
            Self::ParamsCount => "wrong number of arguments in function call",
            Self::ParamsType => "wrong argument types in function call",
            Self::ParamsFamilyMix => {
                "function call mixes bit-vector and real or integer arguments"
            }
            Self::NonConstantExpression => "expected a constant expression",
            Self::InvalidRange => "invalid range",
        }
    }
}

/// What a reported violation does to the enclosing check.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    /// Report an error; the rule yields the error type.
    Fatal,
    /// Report a warning; the rule keeps its best-effort type.
    Warning,
    /// Say nothing; the rule keeps its best-effort type.
    Silent,
}

/// The default severity policy, shared by all checkers: everything is fatal
/// except the warning-only code, with two codes demotable under backward
/// compatibility.
pub(crate) fn severity(violation: TypeViolation, opts: &Opts) -> Severity {
    let warning = |opts: &Opts| {
        if opts.type_check_warnings { Severity::Warning } else { Severity::Silent }
    };
    match violation {
        TypeViolation::TypeWarning => warning(opts),
        TypeViolation::TypeBackCompat | TypeViolation::DuplicateConstants => {
            if opts.backward_compat {
                warning(opts)
            } else {
                Severity::Fatal
            }
        }
        _ => Severity::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy() {
        let default = Opts::default();
        assert_eq!(severity(TypeViolation::TypeMandatory, &default), Severity::Fatal);
        assert_eq!(severity(TypeViolation::TypeBackCompat, &default), Severity::Fatal);
        assert_eq!(severity(TypeViolation::TypeWarning, &default), Severity::Warning);

        let compat = Opts::default().with_backward_compat();
        assert_eq!(severity(TypeViolation::TypeBackCompat, &compat), Severity::Warning);
        assert_eq!(severity(TypeViolation::DuplicateConstants, &compat), Severity::Warning);
        assert_eq!(severity(TypeViolation::TypeMandatory, &compat), Severity::Fatal);

        let quiet = Opts::default().with_backward_compat().without_warnings();
        assert_eq!(severity(TypeViolation::TypeBackCompat, &quiet), Severity::Silent);
        assert_eq!(severity(TypeViolation::TypeWarning, &quiet), Severity::Silent);
    }
}
