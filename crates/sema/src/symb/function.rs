use crate::ty::Ty;
use std::fmt;

/// An uninterpreted (or opaque interpreted) function declared in the model.
///
/// Carries the ordered argument types, the return type and a "main type":
/// the first argument type, preferring words over infinite-precision types
/// over booleans, which the encoders use to pick a theory for the symbol.
#[derive(Clone, Debug)]
pub struct NFunction<'a> {
    args: Vec<Ty<'a>>,
    ret: Ty<'a>,
    main: Ty<'a>,
    uninterpreted: bool,
}

impl<'a> NFunction<'a> {
    /// Creates an uninterpreted function `args -> ret`.
    ///
    /// # Panics
    ///
    /// Panics if `args` is empty.
    pub fn uninterpreted(args: Vec<Ty<'a>>, ret: Ty<'a>) -> Self {
        Self::new(args, ret, true)
    }

    /// Creates an interpreted function; the body stays with the caller.
    pub fn interpreted(args: Vec<Ty<'a>>, ret: Ty<'a>) -> Self {
        Self::new(args, ret, false)
    }

    fn new(args: Vec<Ty<'a>>, ret: Ty<'a>, uninterpreted: bool) -> Self {
        assert!(!args.is_empty(), "a function needs at least one argument");
        let mut main = None;
        let mut have_word = false;
        let mut have_real_int = false;
        for &ty in &args {
            if ty.is_word() {
                if !have_word {
                    main = Some(ty);
                    have_word = true;
                }
            } else if !have_word
                && (ty.is_real() || ty.is_pure_int_enum() || ty.is_integer())
            {
                if !have_real_int {
                    main = Some(ty);
                    have_real_int = true;
                }
            } else if !have_word && !have_real_int && ty.is_boolean() && main.is_none() {
                main = Some(ty);
            }
        }
        let main = main.unwrap_or(args[0]);
        Self { args, ret, main, uninterpreted }
    }

    /// The ordered argument types.
    pub fn args(&self) -> &[Ty<'a>] {
        &self.args
    }

    /// The number of arguments.
    pub fn args_number(&self) -> usize {
        self.args.len()
    }

    /// The return type.
    pub fn return_type(&self) -> Ty<'a> {
        self.ret
    }

    /// The representative argument type; see the type-level docs.
    pub fn main_type(&self) -> Ty<'a> {
        self.main
    }

    /// Whether the function has no interpretation.
    pub fn is_uninterpreted(&self) -> bool {
        self.uninterpreted
    }
}

impl fmt::Display for NFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" * ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, " -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeCtx;
    use smv_ast::Arena;

    #[test]
    fn main_type_prefers_words() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let f = NFunction::uninterpreted(
            vec![tcx.boolean(), tcx.real(), tcx.unsigned_word(8)],
            tcx.unsigned_word(8),
        );
        assert_eq!(f.main_type(), tcx.unsigned_word(8));
        assert_eq!(f.args_number(), 3);
        assert!(f.is_uninterpreted());

        let g = NFunction::uninterpreted(vec![tcx.boolean(), tcx.integer()], tcx.real());
        assert_eq!(g.main_type(), tcx.integer());

        let h = NFunction::uninterpreted(vec![tcx.boolean()], tcx.boolean());
        assert_eq!(h.main_type(), tcx.boolean());
    }

    #[test]
    fn display() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let f = NFunction::uninterpreted(vec![tcx.real(), tcx.real()], tcx.real());
        assert_eq!(f.to_string(), "real * real -> real");
    }
}
