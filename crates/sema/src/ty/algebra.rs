//! The implicit-conversion lattice over abstract types.
//!
//! All operations here expect [normalized](super::TypeCtx::normalize) types
//! and return normalized types, so callers can compare results by pointer.

use super::{Ty, TyKind, TypeCtx};

impl<'a> TypeCtx<'a> {
    /// Returns `left` if `right` can be implicitly converted to it.
    ///
    /// The conversions are: identity, `integer` to `real`, `integer` or a
    /// symbolic enum to the integer-symbolic enum, any set to the
    /// integer-symbolic set, and element-wise conversion between arrays
    /// with equal bounds.
    pub fn convert_right_to_left(&self, left: Ty<'a>, right: Ty<'a>) -> Option<Ty<'a>> {
        if left == right {
            return Some(left);
        }

        // Words, word arrays and no-type never convert to anything else.
        if left.is_real() {
            return right.is_integer().then_some(left);
        }

        if left.is_int_symbolic_enum() {
            return (right.is_integer() || right.is_pure_symbolic_enum()).then_some(left);
        }

        if left.is_array() || right.is_array() {
            if !left.is_array() || !right.is_array() || left.array_bounds() != right.array_bounds()
            {
                return None;
            }
            let sub = self.convert_right_to_left(left.array_subtype(), right.array_subtype())?;
            let (lo, hi) = left.array_bounds();
            return Some(self.array(sub, lo, hi));
        }

        if left.kind() == TyKind::SetIntSymb {
            return right.is_set().then_some(left);
        }

        None
    }

    /// The minimal type both arguments convert to, if any.
    pub fn minimal_common(&self, a: Ty<'a>, b: Ty<'a>) -> Option<Ty<'a>> {
        if a == b {
            return Some(a);
        }

        if a.is_infinite_precision() && b.is_infinite_precision() {
            return Some(self.real());
        }

        let enumish = |t: Ty<'a>| {
            t.is_integer() || t.is_pure_symbolic_enum() || t.is_int_symbolic_enum()
        };
        if enumish(a) && enumish(b) {
            return Some(self.int_symbolic_enum());
        }

        if a.is_array() || b.is_array() {
            if !a.is_array() || !b.is_array() || a.array_bounds() != b.array_bounds() {
                return None;
            }
            let sub = self.minimal_common(a.array_subtype(), b.array_subtype())?;
            let (lo, hi) = a.array_bounds();
            return Some(self.array(sub, lo, hi));
        }

        if a.is_set() && b.is_set() {
            return Some(self.set_int_symb());
        }

        None
    }

    /// Returns whichever argument the other converts to, if either does.
    pub fn greater(&self, a: Ty<'a>, b: Ty<'a>) -> Option<Ty<'a>> {
        self.convert_right_to_left(a, b).or_else(|| self.convert_right_to_left(b, a))
    }

    /// Lifts a scalar to its set counterpart; sets lift to themselves.
    pub fn make_set_type(&self, ty: Ty<'a>) -> Option<Ty<'a>> {
        match ty.kind() {
            TyKind::Boolean => Some(self.set_bool()),
            TyKind::Integer => Some(self.set_int()),
            TyKind::Enum(super::EnumCategory::PureSymbolic, _) => Some(self.set_symb()),
            TyKind::Enum(super::EnumCategory::IntSymbolic, _) => Some(self.set_int_symb()),
            _ if ty.is_set() => Some(ty),
            _ => None,
        }
    }

    /// The inverse of [`make_set_type`](Self::make_set_type); identity on
    /// non-set types.
    pub fn from_set_type(&self, ty: Ty<'a>) -> Ty<'a> {
        match ty.kind() {
            TyKind::SetBool => self.boolean(),
            TyKind::SetInt => self.integer(),
            TyKind::SetSymb => self.pure_symbolic_enum(),
            TyKind::SetIntSymb => self.int_symbolic_enum(),
            _ => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TypeCtx;
    use smv_ast::Arena;

    #[test]
    fn conversion_lattice() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let int = tcx.integer();
        let real = tcx.real();
        let symb = tcx.pure_symbolic_enum();
        let int_symb = tcx.int_symbolic_enum();

        assert_eq!(tcx.convert_right_to_left(real, int), Some(real));
        assert_eq!(tcx.convert_right_to_left(int, real), None);
        assert_eq!(tcx.convert_right_to_left(int_symb, int), Some(int_symb));
        assert_eq!(tcx.convert_right_to_left(int_symb, symb), Some(int_symb));
        assert_eq!(tcx.convert_right_to_left(symb, int), None);
        assert_eq!(tcx.convert_right_to_left(tcx.set_int_symb(), tcx.set_bool()),
            Some(tcx.set_int_symb()));
        assert_eq!(tcx.convert_right_to_left(tcx.set_bool(), tcx.set_int_symb()), None);

        // Words never convert implicitly.
        assert_eq!(tcx.convert_right_to_left(tcx.unsigned_word(4), int), None);
        assert_eq!(tcx.convert_right_to_left(tcx.unsigned_word(4), tcx.unsigned_word(5)), None);
        assert_eq!(tcx.convert_right_to_left(tcx.unsigned_word(4), tcx.signed_word(4)), None);

        // Reflexivity.
        for t in [int, real, symb, int_symb, tcx.boolean(), tcx.unsigned_word(3)] {
            assert_eq!(tcx.convert_right_to_left(t, t), Some(t));
        }
    }

    #[test]
    fn greater_is_consistent_with_convert() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let types = [
            tcx.boolean(),
            tcx.integer(),
            tcx.real(),
            tcx.pure_symbolic_enum(),
            tcx.int_symbolic_enum(),
            tcx.unsigned_word(4),
            tcx.signed_word(4),
            tcx.set_bool(),
            tcx.set_int_symb(),
        ];
        for &a in &types {
            for &b in &types {
                let g = tcx.greater(a, b);
                if g == Some(a) {
                    assert!(a == b || tcx.convert_right_to_left(a, b) == Some(a));
                }
                if g.is_none() {
                    assert_eq!(tcx.convert_right_to_left(a, b), None);
                    assert_eq!(tcx.convert_right_to_left(b, a), None);
                }
            }
        }
    }

    #[test]
    fn minimal_common_mixes() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        assert_eq!(tcx.minimal_common(tcx.integer(), tcx.real()), Some(tcx.real()));
        assert_eq!(tcx.minimal_common(tcx.real(), tcx.integer()), Some(tcx.real()));
        assert_eq!(
            tcx.minimal_common(tcx.integer(), tcx.pure_symbolic_enum()),
            Some(tcx.int_symbolic_enum())
        );
        assert_eq!(tcx.minimal_common(tcx.set_bool(), tcx.set_symb()), Some(tcx.set_int_symb()));
        assert_eq!(tcx.minimal_common(tcx.boolean(), tcx.integer()), None);
        assert_eq!(tcx.minimal_common(tcx.unsigned_word(4), tcx.unsigned_word(5)), None);

        // Commutativity over a small universe.
        let types = [
            tcx.boolean(),
            tcx.integer(),
            tcx.real(),
            tcx.pure_symbolic_enum(),
            tcx.int_symbolic_enum(),
            tcx.unsigned_word(2),
            tcx.set_int(),
            tcx.set_symb(),
        ];
        for &a in &types {
            for &b in &types {
                assert_eq!(tcx.minimal_common(a, b), tcx.minimal_common(b, a));
            }
        }
    }

    #[test]
    fn array_recursion() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let ints = tcx.array(tcx.integer(), 0, 3);
        let reals = tcx.array(tcx.real(), 0, 3);
        assert_eq!(tcx.convert_right_to_left(reals, ints), Some(reals));
        assert_eq!(tcx.minimal_common(ints, reals), Some(reals));
        let shifted = tcx.array(tcx.integer(), 1, 4);
        assert_eq!(tcx.convert_right_to_left(reals, shifted), None);
        assert_eq!(tcx.minimal_common(ints, shifted), None);
    }

    #[test]
    fn set_round_trips() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        for t in [tcx.boolean(), tcx.integer(), tcx.pure_symbolic_enum(), tcx.int_symbolic_enum()]
        {
            let set = tcx.make_set_type(t).unwrap();
            assert!(set.is_set());
            assert_eq!(tcx.from_set_type(set), t);
        }
        // Identity on non-liftable and non-set types.
        assert_eq!(tcx.make_set_type(tcx.unsigned_word(4)), None);
        assert_eq!(tcx.from_set_type(tcx.unsigned_word(4)), tcx.unsigned_word(4));
        assert_eq!(tcx.make_set_type(tcx.set_int()), Some(tcx.set_int()));
    }
}
