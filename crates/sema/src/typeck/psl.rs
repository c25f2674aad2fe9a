//! The checker for the PSL opcodes: SERE forms, PSL temporal operators and
//! the `forall` replicator.

use super::{ExprWalker, TypeChecker, TypeViolation, back_compat_or_mandatory, back_compat_or_mandatory1};
use crate::{flatten::resolve_number, symb::SymbTable, ty::Ty};
use smv_ast::{MAX_WORD_WIDTH, Node, Op, OpRange};

pub(crate) struct PslChecker;

impl<'a> ExprWalker<'a> for PslChecker {
    fn name(&self) -> &'static str {
        "psl"
    }

    fn range(&self) -> OpRange {
        Op::PSL
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
            // The upper bound of an unbounded repetition.
            Op::PslInf => tcx.set_int(),

            // A braced or parenthesised SERE is as boolean as its body.
            Op::PslSere | Op::PslSereCompound => {
                let ty = ck.check_expression(st, expr.car().expect("sere body"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if ty.is_boolean() {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), key) {
                    return error;
                }
                ty
            }

            Op::PslSereConcat
            | Op::PslSereFusion
            | Op::PslPipeMinusGt
            | Op::PslPipeEqGt
            | Op::PslUntilBang
            | Op::PslUntil
            | Op::PslUntilBangIncl
            | Op::PslUntilIncl
            | Op::PslBeforeBang
            | Op::PslBefore
            | Op::PslBeforeBangIncl
            | Op::PslBeforeIncl
            | Op::PslWithinBang
            | Op::PslWithin
            | Op::PslWithinBangIncl
            | Op::PslWithinIncl
            | Op::PslWhileNotBang
            | Op::PslWhileNot
            | Op::PslWhileNotBangIncl
            | Op::PslWhileNotIncl
            | Op::PslAbort
            | Op::PslW
            | Op::PslOr
            | Op::PslCaret => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if lhs.is_boolean() && rhs.is_boolean() {
                    return tcx.boolean();
                }
                if self.violation(ck, st, back_compat_or_mandatory(lhs, rhs), key) {
                    return error;
                }
                tcx.boolean()
            }

            Op::PslSereRepeated => {
                if let Some(body) = expr.car() {
                    let ty = ck.check_expression(st, body, ctx);
                    if ty.is_error() {
                        return error;
                    }
                    if !ty.is_boolean()
                        && self.violation(ck, st, back_compat_or_mandatory1(ty), key)
                    {
                        return error;
                    }
                }
                if let Some(count) = expr.cdr() {
                    if let Some(fatal) = self.check_count(ck, st, count, ctx, key) {
                        if fatal {
                            return error;
                        }
                    }
                }
                tcx.boolean()
            }

            // Word concatenation inside PSL mirrors the core rule.
            Op::PslConcat => {
                let lhs = ck.check_expression(st, expr.car().expect("lhs"), ctx);
                let rhs = ck.check_expression(st, expr.cdr().expect("rhs"), ctx);
                if lhs.is_error() || rhs.is_error() {
                    return error;
                }
                if lhs.is_word() && rhs.is_word() {
                    let width = lhs.word_width() + rhs.word_width();
                    if width > MAX_WORD_WIDTH {
                        if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                            return error;
                        }
                        return tcx.unsigned_word(1);
                    }
                    return tcx.unsigned_word(width);
                }
                if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                    return error;
                }
                tcx.unsigned_word(1)
            }

            Op::PslWSelect => {
                let ty = ck.check_expression(st, expr.car().expect("selection base"), ctx);
                if ty.is_error() {
                    return ty;
                }
                let range = expr.cdr().expect("selection range");
                let high = range.car().and_then(|h| resolve_number(st, h, ctx));
                let low = range.cdr().and_then(|l| resolve_number(st, l, ctx));
                let (Some(high), Some(low)) = (high, low) else {
                    if self.violation(ck, st, TypeViolation::NonConstantExpression, key) {
                        return error;
                    }
                    return tcx.unsigned_word(1);
                };
                if !ty.is_word() {
                    if self.violation(ck, st, TypeViolation::TypeMandatory, key) {
                        return error;
                    }
                    return tcx.unsigned_word(1);
                }
                let width = i64::from(ty.word_width());
                let (mut high, mut low) = (high, low);
                if high >= width || high < low || low < 0 {
                    if self.violation(ck, st, TypeViolation::OutOfWordWidth, key) {
                        return error;
                    }
                    (high, low) = (0, 0);
                }
                tcx.unsigned_word((high - low + 1) as u32)
            }

            Op::PslIte => {
                let branch = expr.car().expect("ite branch");
                let cond = ck.check_expression(st, branch.car().expect("condition"), ctx);
                let then = ck.check_expression(st, branch.cdr().expect("then"), ctx);
                let otherwise = ck.check_expression(st, expr.cdr().expect("else"), ctx);
                if cond.is_error() || then.is_error() || otherwise.is_error() {
                    return error;
                }
                if !cond.is_boolean() {
                    let cond_key = ck.wrap_context(st, branch, ctx);
                    if self.violation(ck, st, back_compat_or_mandatory1(cond), cond_key) {
                        return error;
                    }
                }
                let lifted_then =
                    if otherwise.is_set() { tcx.make_set_type(then) } else { Some(then) };
                let lifted_else =
                    if then.is_set() { tcx.make_set_type(otherwise) } else { Some(otherwise) };
                if let (Some(a), Some(b)) = (lifted_then, lifted_else) {
                    if let Some(result) = tcx.minimal_common(a, b) {
                        return result;
                    }
                }
                if self.violation(ck, st, back_compat_or_mandatory(then, otherwise), key) {
                    return error;
                }
                then
            }

            Op::PslAlways
            | Op::PslNever
            | Op::PslEventuallyBang
            | Op::PslX
            | Op::PslXBang
            | Op::PslTilde => {
                let ty = ck.check_expression(st, expr.car().expect("operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if ty.is_boolean() {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), key) {
                    return error;
                }
                ty
            }

            Op::PslNextBang
            | Op::PslNext
            | Op::PslNextABang
            | Op::PslNextA
            | Op::PslNextEBang
            | Op::PslNextE => {
                let ty = ck.check_expression(st, expr.car().expect("operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                if let Some(when) = expr.cdr() {
                    if let Some(fatal) = self.check_count(ck, st, when, ctx, key) {
                        if fatal {
                            return error;
                        }
                    }
                }
                if !ty.is_boolean() && self.violation(ck, st, back_compat_or_mandatory1(ty), key)
                {
                    return error;
                }
                tcx.boolean()
            }

            Op::PslNextEventBang
            | Op::PslNextEvent
            | Op::PslNextEventABang
            | Op::PslNextEventA
            | Op::PslNextEventEBang
            | Op::PslNextEventE => {
                let ty = ck.check_expression(st, expr.car().expect("operand"), ctx);
                if ty.is_error() {
                    return ty;
                }
                // cdr is the (event, occurrence count) pair.
                if let Some(args) = expr.cdr() {
                    if let Some(event) = args.car() {
                        let event_ty = ck.check_expression(st, event, ctx);
                        if event_ty.is_error() {
                            return error;
                        }
                        if !event_ty.is_boolean()
                            && self.violation(ck, st, back_compat_or_mandatory1(event_ty), key)
                        {
                            return error;
                        }
                    }
                    if let Some(count) = args.cdr() {
                        if let Some(fatal) = self.check_count(ck, st, count, ctx, key) {
                            if fatal {
                                return error;
                            }
                        }
                    }
                }
                if !ty.is_boolean() && self.violation(ck, st, back_compat_or_mandatory1(ty), key)
                {
                    return error;
                }
                tcx.boolean()
            }

            // A bare range reaches the checker only out of position.
            Op::PslRange => {
                self.violation(ck, st, TypeViolation::InvalidRange, key);
                error
            }

            Op::PslReplProp => self.check_repl_prop(ck, st, expr, ctx, key),

            op => unreachable!("opcode {op:?} is not a PSL expression"),
        }
    }
}

impl PslChecker {
    /// Validates a repetition count or `next` occurrence index: a constant
    /// non-negative number, or a constant non-negative `lo..hi` range whose
    /// upper bound may be `inf`. Returns `Some(fatal)` when a violation was
    /// reported, `None` when the count is fine.
    fn check_count<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        count: Node<'a>,
        ctx: Option<Node<'a>>,
        key: Node<'a>,
    ) -> Option<bool> {
        match count.op() {
            Op::PslRange | Op::Twodots => {
                let low = count.car().and_then(|lo| resolve_number(st, lo, ctx));
                let Some(low) = low else {
                    return Some(self.violation(ck, st, TypeViolation::NonConstantExpression, key));
                };
                let high = match count.cdr() {
                    Some(hi) if hi.op() == Op::PslInf => None,
                    Some(hi) => match resolve_number(st, hi, ctx) {
                        Some(hi) => Some(hi),
                        None => {
                            return Some(self.violation(
                                ck,
                                st,
                                TypeViolation::NonConstantExpression,
                                key,
                            ));
                        }
                    },
                    None => Some(low),
                };
                if low < 0 || high.is_some_and(|high| high < low) {
                    return Some(self.violation(ck, st, TypeViolation::InvalidRange, key));
                }
                None
            }
            _ => match resolve_number(st, count, ctx) {
                Some(value) if value >= 0 => None,
                Some(_) => Some(self.violation(ck, st, TypeViolation::InvalidRange, key)),
                None => Some(self.violation(ck, st, TypeViolation::NonConstantExpression, key)),
            },
        }
    }

    /// `forall id in {v1, .., vn} : property` binds `id` to each value in
    /// turn as a temporary define and re-checks the property. Memoisation
    /// is disabled after the first iteration: later iterations are
    /// grammatically the same property with a different binding.
    fn check_repl_prop<'a>(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
        key: Node<'a>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let error = tcx.error();

        let replicator = expr.car().expect("forall replicator");
        let id = replicator.car().expect("forall identifier");
        let values = replicator.cdr().expect("forall value set");
        let property = expr.cdr().expect("forall property");

        let id_name = st.resolve(id, ctx).name();

        // The value set itself must be a well-formed enum.
        let values: Vec<_> = values.iter_cons().collect();
        let value_set_ty = tcx.enum_type(&values);
        if !ck.type_is_well_formed(st, value_set_ty, id_name) {
            return error;
        }

        let check_once = |value: Node<'a>| -> Result<(), Ty<'a>> {
            if st.is_symbol_declared(id_name) || !st.push_scoped_define(id_name, ctx, value) {
                self.violation(ck, st, TypeViolation::AmbiguousIdentifier, id);
                return Err(error);
            }
            let prop_ty = ck.check_expression(st, property, ctx);
            st.pop_scoped_define(id_name);
            if prop_ty.is_error() {
                return Err(error);
            }
            if !prop_ty.is_boolean()
                && self.violation(ck, st, back_compat_or_mandatory1(prop_ty), key)
            {
                return Err(error);
            }
            Ok(())
        };

        let mut iter = values.iter();
        if let Some(&first) = iter.next() {
            if let Err(err) = check_once(first) {
                return err;
            }
        }
        // The first pass memoised the property; later bindings must not
        // see those entries nor leave their own.
        let rest = ck.with_memo_disabled(|| {
            for &value in iter {
                check_once(value)?;
            }
            Ok(())
        });
        if let Err(err) = rest {
            return err;
        }

        tcx.boolean()
    }
}
