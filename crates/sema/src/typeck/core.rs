//! The checker for the core expression opcodes: constants, identifiers,
//! arithmetic, words, sets, CTL/LTL temporal operators and function calls.

use super::{ExprWalker, TypeChecker, TypeViolation, back_compat_or_mandatory, back_compat_or_mandatory1};
use crate::{
    flatten::resolve_number,
    resolve::Resolution,
    symb::SymbTable,
    ty::Ty,
};
use smv_ast::{MAX_WORD_WIDTH, Node, Op, OpRange};

pub(crate) struct CoreChecker;

impl<'a> ExprWalker<'a> for CoreChecker {
    fn name(&self) -> &'static str {
        "core"
    }

    fn range(&self) -> OpRange {
        Op::CORE
    }

    fn check_expr(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let key = ck.wrap_context(st, expr, ctx);
        let error = tcx.error();

        match expr.op() {
            // `self` outside a name is meaningless.
            Op::SelfIdent => error,

            Op::Context => {
                let body = expr.cdr().expect("context without body");
                ck.check_expression(st, body, expr.car())
            }

            // ---------------- constants ----------------
            Op::True | Op::False => tcx.boolean(),
            Op::Number => tcx.integer(),
            Op::NumberUnsignedWord => {
                tcx.unsigned_word(expr.word().expect("word leaf without payload").width())
            }
            Op::NumberSignedWord => {
                tcx.signed_word(expr.word().expect("word leaf without payload").width())
            }
            Op::NumberFrac | Op::NumberReal | Op::NumberExp => tcx.real(),

            // The flattener turns constant `uwconst`/`swconst` applications
            // into word constants; anything it cannot fold is not constant.
            Op::Uwconst | Op::Swconst => {
                let flattened = st.flattener().flatten(st, expr, ctx);
                match flattened.op() {
                    Op::NumberUnsignedWord | Op::NumberSignedWord => {
                        ck.check_expression(st, flattened, None)
                    }
                    _ => {
                        self.violation(ck, st, TypeViolation::NonConstantExpression, key);
                        error
                    }
                }
            }

            Op::Twodots => {
                debug_assert!(
                    expr.car().is_some_and(|lo| lo.op() == Op::Number)
                        && expr.cdr().is_some_and(|hi| hi.op() == Op::Number),
                    "a range has two number children"
                );
                tcx.set_int()
            }

            // Single bits of an encoded variable; created artificially,
            // never checked further.
            Op::Bit => tcx.boolean(),

            // ---------------- identifiers ----------------
            Op::ArrayIndex => {
                let rs = st.resolve(expr, ctx);
                if rs.is_undefined() {
                    // Not a declared identifier-with-brackets, so it is an
                    // array access expression.
                    let base = ck.check_expression(st, expr.car().expect("index base"), ctx);
                    let index = ck.check_expression(st, expr.cdr().expect("index expr"), ctx);
                    if base.is_error() || index.is_error() {
                        return error;
                    }
                    if !base.is_array()
                        || !(index.is_boolean() || index.is_integer() || index.is_word())
                    {
                        self.violation(ck, st, TypeViolation::TypeMandatory, key);
                        return error;
                    }
                    // Out-of-range constant indexes are the flattener's
                    // business; the subtype is already normalized.
                    return base.array_subtype();
                }
                self.check_resolved(ck, st, rs, key, ctx)
            }
            Op::Atom | Op::Dot => {
                let rs = st.resolve(expr, ctx);
                self.check_resolved(ck, st, rs, key, ctx)
            }

            // ---------------- boolean unaries ----------------
            Op::Ex
            | Op::Ax
            | Op::Ef
            | Op::Af
            | Op::Eg
            | Op::Ag
            | Op::Not
            | Op::OpGlobal
            | Op::OpPrec
            | Op::OpNotPrecNot
            | Op::OpFuture
            | Op::OpNext
            | Op::OpHistorical
            | Op::OpOnce
            | Op::Ebf
            | Op::Abf
            | Op::Ebg
            | Op::Abg => {
                let ty = ck.check_expression(st, expr.car().expect("unary operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                // The bounded variants carry a subrange to validate.
                if let Some(range) = expr.cdr() {
                    if !subrange_not_negative(range)
                        && self.violation(ck, st, TypeViolation::InvalidRange, key)
                    {
                        return error;
                    }
                }
                if ty.is_boolean() || (expr.op() == Op::Not && ty.is_word()) {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), key) {
                    return error;
                }
                ty
            }

            // ---------------- casts ----------------
            Op::CastBool | Op::CastWord1 => {
                let ty = ck.check_expression(st, expr.car().expect("cast operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if expr.op() == Op::CastBool && (ty.is_word1() || ty.is_integer()) {
                    return tcx.boolean();
                }
                if expr.op() == Op::CastWord1 && ty.is_boolean() {
                    return tcx.unsigned_word(1);
                }
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    return error;
                }
                if expr.op() == Op::CastBool { tcx.boolean() } else { tcx.unsigned_word(1) }
            }

            Op::CastSigned | Op::CastUnsigned => {
                let ty = ck.check_expression(st, expr.car().expect("cast operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if expr.op() == Op::CastSigned && ty.is_unsigned_word() {
                    return tcx.signed_word(ty.word_width());
                }
                if expr.op() == Op::CastUnsigned && ty.is_signed_word() {
                    return tcx.unsigned_word(ty.word_width());
                }
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    return error;
                }
                if expr.op() == Op::CastSigned { tcx.unsigned_word(1) } else { tcx.signed_word(1) }
            }

            Op::Wsizeof => {
                let ty = ck.check_expression(st, expr.car().expect("sizeof operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if !ty.is_word() {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.signed_word(1);
                }
                tcx.integer()
            }

            Op::CastToInt => {
                let ty = ck.check_expression(st, expr.car().expect("toint operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if !(ty.is_word() || ty.is_boolean() || ty.is_integer()) {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.signed_word(1);
                }
                tcx.integer()
            }

            Op::Count => {
                let list = expr.car().expect("count needs a list");
                for elem in list.iter_cons() {
                    let ty = ck.check_expression(st, elem, ctx);
                    if ty.is_error() {
                        return error;
                    }
                    if !ty.is_boolean() {
                        self.violation(ck, st, TypeViolation::TypeMandatory, key);
                        return error;
                    }
                }
                tcx.integer()
            }

            Op::Wresize => {
                let ty = ck.check_expression(st, expr.car().expect("resize operand"), ctx);
                if ty.is_error() {
                    return error;
                }
                if !ty.is_word() {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.unsigned_word(1);
                }
                let size = expr.cdr().expect("resize needs a size");
                let Some(new_width) = resolve_number(st, size, ctx) else {
                    // A malformed size reports on its own; a well-typed but
                    // non-constant one is the violation here.
                    let size_ty = ck.check_expression(st, size, ctx);
                    if !size_ty.is_error() {
                        self.violation(ck, st, TypeViolation::NonConstantExpression, key);
                    }
                    return error;
                };
                if new_width > 0 && new_width <= i64::from(MAX_WORD_WIDTH) {
                    let new_width = new_width as u32;
                    return if ty.is_signed_word() {
                        tcx.signed_word(new_width)
                    } else {
                        tcx.unsigned_word(new_width)
                    };
                }
                if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                    return error;
                }
                tcx.unsigned_word(1)
            }

            Op::Extend => {
                let ty = ck.check_expression(st, expr.car().expect("extend operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                let delta = expr.cdr().and_then(|delta| resolve_number(st, delta, ctx));
                let Some(delta) = delta else {
                    self.violation(ck, st, TypeViolation::NonConstantExpression, key);
                    return error;
                };
                if !ty.is_word() {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.unsigned_word(1);
                }
                let old_width = i64::from(ty.word_width());
                if delta >= 0 && old_width + delta <= i64::from(MAX_WORD_WIDTH) {
                    let new_width = (old_width + delta) as u32;
                    return if ty.is_unsigned_word() {
                        tcx.unsigned_word(new_width)
                    } else {
                        tcx.signed_word(new_width)
                    };
                }
                if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                    return error;
                }
                tcx.unsigned_word(1)
            }

            // ---------------- init/next ----------------
            Op::SmallInit | Op::Next => {
                // Some producers build these nodes from scratch; memoise
                // under the normalised form too so structurally equal
                // occurrences share their type.
                let normalised = st.ast().find_atom(expr);
                let normalised_key = ck.wrap_context(st, normalised, ctx);
                if let Some(ty) = ck.lookup(normalised_key) {
                    return ty;
                }
                let ty = ck.check_expression(st, expr.car().expect("init/next operand"), ctx);
                if normalised_key != key {
                    ck.memoize(normalised_key, ty);
                }
                ty
            }

            // ---------------- word structure ----------------
            Op::Concatenation => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if lhs.is_word() && rhs.is_word() {
                    let new_width = lhs.word_width() + rhs.word_width();
                    if new_width > MAX_WORD_WIDTH {
                        if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                            return error;
                        }
                        return tcx.unsigned_word(1);
                    }
                    return tcx.unsigned_word(new_width);
                }
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    return error;
                }
                tcx.unsigned_word(1)
            }

            Op::BitSelection => self.check_bit_selection(ck, st, expr, ctx, key),

            Op::WaWrite => {
                let write = expr.cdr().expect("write needs index and value");
                debug_assert_eq!(write.op(), Op::WaWrite);
                let array = ck.check_expression(st, expr.car().expect("array"), ctx);
                let index = ck.check_expression(st, write.car().expect("index"), ctx);
                let value = ck.check_expression(st, write.cdr().expect("value"), ctx);
                if array.is_error() || index.is_error() || value.is_error() {
                    return error;
                }
                if !array.is_wordarray() || !index.is_unsigned_word() || !value.is_unsigned_word()
                {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.wordarray(1, 1);
                }
                let (awidth, vwidth) = array.wordarray_widths();
                if (awidth != index.word_width() || vwidth != value.word_width())
                    && self.violation(ck, st, TypeViolation::OutOfWordArrayWidth, key)
                {
                    return error;
                }
                array
            }

            Op::WaRead => {
                let array = ck.check_expression(st, expr.car().expect("array"), ctx);
                let index = ck.check_expression(st, expr.cdr().expect("index"), ctx);
                if array.is_error() || index.is_error() {
                    return error;
                }
                if !array.is_wordarray() || !index.is_unsigned_word() {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.wordarray(1, 1);
                }
                let (awidth, vwidth) = array.wordarray_widths();
                if awidth != index.word_width()
                    && self.violation(ck, st, TypeViolation::OutOfWordArrayWidth, key)
                {
                    return error;
                }
                tcx.unsigned_word(vwidth)
            }

            // ---------------- arithmetic ----------------
            Op::UMinus => {
                let ty = ck.check_expression(st, expr.car().expect("operand"), ctx);
                if ty.is_error() {
                    return error;
                }
                if ty.is_integer() || ty.is_real() || ty.is_word() {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), key) {
                    return error;
                }
                ty
            }

            Op::Plus | Op::Minus | Op::Times | Op::Divide => {
                let lhs_expr = expr.car().expect("lhs");
                let lhs = ck.check_expression(st, lhs_expr, ctx);
                let (rhs_expr, rhs) = match expr.cdr() {
                    Some(rhs_expr) => (rhs_expr, ck.check_expression(st, rhs_expr, ctx)),
                    // Plus and minus may be unary.
                    None => {
                        debug_assert!(matches!(expr.op(), Op::Plus | Op::Minus));
                        (lhs_expr, lhs)
                    }
                };
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                let (lhs_p, rhs_p) =
                    promote_int_constants(st, (lhs_expr, lhs), (rhs_expr, rhs), ctx);
                if let Some(result) = tcx.greater(lhs_p, rhs_p) {
                    if result.is_integer() || result.is_real() || result.is_word() {
                        return result;
                    }
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                lhs
            }

            Op::Mod => {
                let lhs_expr = expr.car().expect("lhs");
                let rhs_expr = expr.cdr().expect("rhs");
                let lhs = ck.check_expression(st, lhs_expr, ctx);
                let rhs = ck.check_expression(st, rhs_expr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                let (lhs_p, rhs_p) =
                    promote_int_constants(st, (lhs_expr, lhs), (rhs_expr, rhs), ctx);
                // No implicit conversion beyond constant promotion.
                if lhs_p == rhs_p && (lhs_p.is_word() || lhs_p.is_integer()) {
                    return lhs_p;
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                lhs
            }

            Op::LShift | Op::RShift | Op::LRotate | Op::RRotate => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs_expr = expr.cdr().expect("shift amount");
                let rhs = ck.check_expression(st, rhs_expr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if lhs.is_word() && (rhs.is_integer() || rhs.is_unsigned_word()) {
                    // A statically known amount must fit the width.
                    let amount = match rhs_expr.word() {
                        Some(word) => Some(if word.is_signed() {
                            word.to_signed()
                        } else {
                            word.to_unsigned() as i64
                        }),
                        None => resolve_number(st, rhs_expr, ctx),
                    };
                    if amount.is_some_and(|amount| amount > i64::from(lhs.word_width()))
                        && self.violation(ck, st, TypeViolation::OutOfWordWidth, key)
                    {
                        return error;
                    }
                    return lhs;
                }
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    return error;
                }
                lhs
            }

            // ---------------- comparisons ----------------
            Op::Equal | Op::NotEqual => {
                let lhs_expr = expr.car().expect("lhs");
                let rhs_expr = expr.cdr().expect("rhs");
                let lhs = ck.check_expression(st, lhs_expr, ctx);
                let rhs = ck.check_expression(st, rhs_expr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                let (lhs_p, rhs_p) =
                    promote_int_constants(st, (lhs_expr, lhs), (rhs_expr, rhs), ctx);
                if tcx.greater(lhs_p, rhs_p).is_some_and(is_comparable) {
                    return tcx.boolean();
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                let lhs_expr = expr.car().expect("lhs");
                let rhs_expr = expr.cdr().expect("rhs");
                let lhs = ck.check_expression(st, lhs_expr, ctx);
                let rhs = ck.check_expression(st, rhs_expr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                let (lhs_p, rhs_p) =
                    promote_int_constants(st, (lhs_expr, lhs), (rhs_expr, rhs), ctx);
                if let Some(result) = tcx.greater(lhs_p, rhs_p) {
                    if result.is_integer() || result.is_real() || result.is_word() {
                        return tcx.boolean();
                    }
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            // Assignments are type-checked like expressions because
            // predicate normalisation can push them into formulas.
            Op::Eqdef => {
                let lhs_expr = expr.car().expect("lhs");
                let rhs_expr = expr.cdr().expect("rhs");
                let lhs = ck.check_expression(st, lhs_expr, ctx);
                let rhs = ck.check_expression(st, rhs_expr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                let (lhs_p, rhs_p) =
                    promote_int_constants(st, (lhs_expr, lhs), (rhs_expr, rhs), ctx);
                let rhs_scalar = tcx.from_set_type(rhs_p);
                if tcx.convert_right_to_left(lhs_p, rhs_scalar).is_some_and(is_comparable) {
                    return tcx.boolean();
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            // ---------------- logic ----------------
            Op::Or | Op::Xor | Op::Xnor | Op::Implies | Op::Iff => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if (lhs.is_boolean() && rhs.is_boolean()) || (lhs.is_word() && lhs == rhs) {
                    return lhs;
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                lhs
            }

            // AND doubles as the connector of expression lists: a missing
            // operand is skipped and statement-typed operands are admitted.
            Op::And => {
                let (car, cdr) = (expr.car(), expr.cdr());
                let (Some(car), Some(cdr)) = (car, cdr) else {
                    let operand = car.or(cdr).expect("AND with no operands");
                    return ck.check_expression(st, operand, ctx);
                };
                let lhs = ck.check_expression(st, car, ctx);
                let rhs = ck.check_expression(st, cdr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if (lhs.is_boolean() && rhs.is_boolean()) || (lhs.is_word() && lhs == rhs) {
                    return lhs;
                }
                if lhs.is_statement() && rhs.is_statement() {
                    return lhs;
                }
                if (lhs.is_boolean() || lhs.is_statement())
                    && (rhs.is_boolean() || rhs.is_statement())
                {
                    return tcx.boolean();
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                lhs
            }

            // ---------------- sets ----------------
            Op::Union => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if let (Some(lhs_set), Some(rhs_set)) =
                    (tcx.make_set_type(lhs), tcx.make_set_type(rhs))
                {
                    if let Some(result) = tcx.minimal_common(lhs_set, rhs_set) {
                        return result;
                    }
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            Op::SetIn => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                // Words and reals have no set counterpart, so they are
                // rejected here.
                if let (Some(lhs_set), Some(rhs_set)) =
                    (tcx.make_set_type(lhs), tcx.make_set_type(rhs))
                {
                    if tcx.greater(lhs_set, rhs_set).is_some() {
                        return tcx.boolean();
                    }
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            // ---------------- case ----------------
            Op::Case | Op::IfThenElse => {
                let branch = expr.car().expect("case branch");
                debug_assert_eq!(branch.op(), Op::Colon);
                let cond = ck.check_expression(st, branch.car().expect("condition"), ctx);
                let then = ck.check_expression(st, branch.cdr().expect("branch value"), ctx);
                if cond.is_error() || then.is_error() {
                    return error;
                }
                if !cond.is_boolean() {
                    let cond_key = ck.wrap_context(st, branch, ctx);
                    if self.violation(ck, st, back_compat_or_mandatory1(cond), cond_key) {
                        return error;
                    }
                }
                let rest = expr.cdr().expect("case tail");
                if rest.op() == Op::Failure {
                    return then;
                }
                let rest = ck.check_expression(st, rest, ctx);
                if rest.is_error() {
                    return error;
                }
                if let Some(result) = common_with_set_lifting(ck, then, rest) {
                    return result;
                }
                if self.violation(ck, st, back_compat_or_mandatory(then, rest), key) {
                    return error;
                }
                then
            }

            // The terminator of a case expression; boolean so that the
            // LTL expansion of cases stays typeable.
            Op::Failure => tcx.boolean(),

            Op::Colon => unreachable!("COLON is analysed by CASE and BIT_SELECTION"),

            // ---------------- temporal binaries ----------------
            Op::Au | Op::Eu | Op::Until | Op::Since | Op::Releases | Op::Triggered => {
                self.check_boolean_binary(ck, st, expr, ctx, key)
            }

            Op::Abu | Op::Ebu => {
                let ty = ck.check_expression(st, expr.car().expect("bounded until body"), ctx);
                if ty.is_error() {
                    return error;
                }
                if let Some(range) = expr.cdr() {
                    if !subrange_not_negative(range)
                        && self.violation(ck, st, TypeViolation::InvalidRange, key)
                    {
                        return error;
                    }
                }
                ty
            }

            // Used by COMPUTE.
            Op::Minu | Op::Maxu => self.check_boolean_binary(ck, st, expr, ctx, key),

            // ---------------- containers ----------------
            Op::Cons => {
                let lhs = ck.check_expression(st, expr.car().expect("list head"), ctx);
                let Some(cdr) = expr.cdr() else { return lhs };
                let rhs = ck.check_expression(st, cdr, ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if let Some(result) = common_with_set_lifting(ck, lhs, rhs) {
                    return result;
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                lhs
            }

            Op::ArrayDef => {
                let Some(list) = expr.car() else {
                    self.violation(ck, st, TypeViolation::TypeMandatory, key);
                    return error;
                };
                let mut common = None;
                let mut count = 0i64;
                for elem in list.iter_cons() {
                    let ty = ck.check_expression(st, elem, ctx);
                    if ty.is_error() {
                        return error;
                    }
                    count += 1;
                    common = match common {
                        None => Some(ty),
                        Some(prev) => match ck.tcx().minimal_common(prev, ty) {
                            Some(merged) => Some(merged),
                            None => {
                                self.violation(ck, st, TypeViolation::TypeMandatory, key);
                                return error;
                            }
                        },
                    };
                }
                match common {
                    Some(subtype) => tcx.array(subtype, 0, count - 1),
                    None => {
                        self.violation(ck, st, TypeViolation::TypeMandatory, key);
                        error
                    }
                }
            }

            // ---------------- function calls ----------------
            Op::NFunction => self.check_nfunction(ck, st, expr, ctx, key),

            op => unreachable!("opcode {op:?} is not a core expression"),
        }
    }
}

impl CoreChecker {
    fn check_resolved<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        rs: Resolution<'a>,
        key: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        match rs {
            Resolution::Undefined(name) => {
                if self.violation(ck, st, TypeViolation::UndefinedIdentifier, name) {
                    tcx.error()
                } else {
                    tcx.pure_symbolic_enum()
                }
            }
            Resolution::Ambiguous(_) => {
                if self.violation(ck, st, TypeViolation::AmbiguousIdentifier, key) {
                    tcx.error()
                } else {
                    tcx.pure_symbolic_enum()
                }
            }
            Resolution::Constant(_) => tcx.pure_symbolic_enum(),
            Resolution::Parameter(name) => {
                // The flattened actual is context-free; checking it under
                // the current context is harmless and keeps lines stable.
                let actual = st.flatten_parameter_actual(name);
                ck.check_expression(st, actual, ctx)
            }
            Resolution::Define(name) => {
                let body = st.define_body(name);
                let body_ctx = st.define_context(name);
                ck.check_expression(st, body, body_ctx)
            }
            Resolution::ArrayDefine(name) => {
                let body = st.array_define_body(name);
                let body_ctx = st.array_define_context(name);
                ck.check_expression(st, body, body_ctx)
            }
            Resolution::VariableArray(name) => tcx.normalize(st.variable_array_type(name)),
            Resolution::Var(name) => tcx.normalize(st.var_type(name)),
            Resolution::Function(_) => {
                // A function name is not a value.
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    tcx.error()
                } else {
                    tcx.pure_symbolic_enum()
                }
            }
        }
    }

    fn check_boolean_binary<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
        key: Node<'a>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
        let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
        if lhs.is_error() || rhs.is_error() {
            return tcx.error();
        }
        if lhs.is_boolean() && rhs.is_boolean() {
            return tcx.boolean();
        }
        if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
            return tcx.error();
        }
        tcx.boolean()
    }

    fn check_bit_selection<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
        key: Node<'a>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let ty = ck.check_expression(st, expr.car().expect("selection base"), ctx);
        if ty.is_error() {
            return ty;
        }
        let range = expr.cdr().expect("selection range");
        debug_assert_eq!(range.op(), Op::Colon);
        let high = range.car().and_then(|h| resolve_number(st, h, ctx));
        let low = range.cdr().and_then(|l| resolve_number(st, l, ctx));
        let (Some(high), Some(low)) = (high, low) else {
            if self.violation(ck, st, TypeViolation::NonConstantExpression, key) {
                return tcx.error();
            }
            return tcx.unsigned_word(1);
        };
        if !ty.is_word() {
            if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                return tcx.error();
            }
            return tcx.unsigned_word(1);
        }
        let width = i64::from(ty.word_width());
        let (mut high, mut low) = (high, low);
        if high >= width || high < low || low < 0 {
            if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                return tcx.error();
            }
            (high, low) = (0, 0);
        }
        tcx.unsigned_word((high - low + 1) as u32)
    }

    fn check_nfunction<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
        key: Node<'a>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let name = expr.car().expect("function name");
        let resolved = st.resolve(name, ctx).name();
        if !st.is_function(resolved) {
            self.violation(ck, st, TypeViolation::UndefinedIdentifier, resolved);
            return tcx.error();
        }

        // The descriptor stays borrowed across the argument recursion;
        // nothing mutates the cache while checking.
        let fun = st.function(resolved);
        let formals = fun.args();

        let mut has_bitvector = false;
        let mut has_real_int = false;
        let mut classify = |ty: Ty<'a>| {
            if ty.is_word() {
                has_bitvector = true;
            } else if ty.is_real() || ty.is_pure_int_enum() || ty.is_integer() {
                has_real_int = true;
            }
        };

        let mut actual_count = 0usize;
        if let Some(args) = expr.cdr() {
            for actual in args.iter_cons() {
                let Some(&formal) = formals.get(actual_count) else {
                    self.violation(ck, st, TypeViolation::ParamsCount, key);
                    return tcx.error();
                };
                actual_count += 1;
                let actual_ty = ck.check_expression(st, actual, ctx);
                if actual_ty.is_error() {
                    return tcx.error();
                }
                classify(formal);
                if ck.tcx().greater(actual_ty, tcx.normalize(formal)).is_none() {
                    self.violation(ck, st, TypeViolation::ParamsType, key);
                    return tcx.error();
                }
            }
        }
        if actual_count != formals.len() {
            self.violation(ck, st, TypeViolation::ParamsCount, key);
            return tcx.error();
        }

        let ret = fun.return_type();
        classify(ret);
        if has_bitvector && has_real_int {
            self.violation(ck, st, TypeViolation::ParamsFamilyMix, key);
            return tcx.error();
        }
        tcx.normalize(ret)
    }
}

/// The types equality and assignment accept once implicit conversion has
/// settled on a common type. Sets and artificial types cannot be compared.
fn is_comparable(ty: Ty<'_>) -> bool {
    ty.is_boolean()
        || ty.is_enum()
        || ty.is_integer()
        || ty.is_real()
        || ty.is_word()
        || ty.is_wordarray()
}

/// `0 <= lo <= hi` over a `lo..hi` range of number constants.
fn subrange_not_negative(range: Node<'_>) -> bool {
    range.op() == Op::Twodots
        && matches!(
            (range.car().and_then(Node::number), range.cdr().and_then(Node::number)),
            (Some(lo), Some(hi)) if 0 <= lo && lo <= hi
        )
}

/// The integer-constant-to-word promotion applied by arithmetic,
/// comparisons and assignments: a constant integer operand takes the word
/// type of the other side.
fn promote_int_constants<'a>(
    st: &SymbTable<'_, 'a>,
    lhs: (Node<'a>, Ty<'a>),
    rhs: (Node<'a>, Ty<'a>),
    ctx: Option<Node<'a>>,
) -> (Ty<'a>, Ty<'a>) {
    let (lhs_expr, lhs_ty) = lhs;
    let (rhs_expr, rhs_ty) = rhs;
    if lhs_ty.is_word() && rhs_ty.is_integer() && resolve_number(st, rhs_expr, ctx).is_some() {
        return (lhs_ty, lhs_ty);
    }
    if rhs_ty.is_word() && lhs_ty.is_integer() && resolve_number(st, lhs_expr, ctx).is_some() {
        return (rhs_ty, rhs_ty);
    }
    (lhs_ty, rhs_ty)
}

/// The common-type rule of `CASE` and lists: when one side is a set, the
/// other is lifted to its set counterpart before taking the minimal common
/// type.
fn common_with_set_lifting<'a>(ck: &TypeChecker<'a>, a: Ty<'a>, b: Ty<'a>) -> Option<Ty<'a>> {
    let tcx = ck.tcx();
    let lifted_a = if b.is_set() { tcx.make_set_type(a)? } else { a };
    let lifted_b = if a.is_set() { tcx.make_set_type(b)? } else { b };
    tcx.minimal_common(lifted_a, lifted_b)
}
