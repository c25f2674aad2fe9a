//! The checker for the statement opcodes: section tags, assignments, the
//! define wrapper and the `@` time operator.

use super::{ExprWalker, TypeChecker, TypeViolation, back_compat_or_mandatory1};
use crate::{symb::SymbTable, ty::Ty};
use smv_ast::{Node, Op, OpRange};
use std::cell::Cell;

pub(crate) struct StatementChecker {
    /// `@` operators may not nest; this survives the recursion through the
    /// master.
    inside_attime: Cell<bool>,
}

impl StatementChecker {
    pub(crate) fn new() -> Self {
        Self { inside_attime: Cell::new(false) }
    }
}

impl<'a> ExprWalker<'a> for StatementChecker {
    fn name(&self) -> &'static str {
        "statements"
    }

    fn range(&self) -> OpRange {
        Op::STATEMENTS
    }

    fn check_expr(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Ty<'a> {
        let tcx = ck.tcx();
        let error = tcx.error();

        match expr.op() {
            // Section tags: the body must be boolean, or statement-typed
            // when predicate normalisation pushed assignments into it. The
            // bodies these wrap are already flattened, so they are checked
            // context-free.
            Op::Trans
            | Op::Init
            | Op::Invar
            | Op::Fairness
            | Op::Justice
            | Op::Compassion
            | Op::Spec
            | Op::LtlSpec
            | Op::PslSpec
            | Op::InvarSpec
            | Op::Isa
            | Op::Constraint
            | Op::Module
            | Op::Process
            | Op::Modtype
            | Op::Lambda => {
                let ty = ck.check_expression(st, expr.car().expect("section body"), None);
                if ty.is_error() {
                    return error;
                }
                if ty.is_boolean() || ty.is_statement() {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), expr) {
                    return error;
                }
                ty
            }

            Op::Attime => {
                if self.inside_attime.get()
                    && self.violation(ck, st, TypeViolation::AttimeNested, expr)
                {
                    return error;
                }
                let time_ok = expr.cdr().is_some_and(|time| time.op() == Op::Number);
                if !time_ok && self.violation(ck, st, TypeViolation::AttimeNumberRequired, expr) {
                    return error;
                }
                self.inside_attime.set(true);
                let ty = ck.check_expression(st, expr.car().expect("timed expression"), ctx);
                self.inside_attime.set(false);
                if ty.is_error() {
                    return error;
                }
                ty
            }

            // An artificial wrapper used to type-check define bodies by
            // name; a define may have any type.
            Op::Define => {
                let ty = ck.check_expression(st, expr.car().expect("define name"), None);
                if ty.is_error() {
                    return error;
                }
                ty
            }

            Op::Assign => {
                let body = expr.car().expect("assignment body");
                debug_assert_eq!(body.op(), Op::Eqdef, "ASSIGN wraps exactly an EQDEF");
                let ty = ck.check_expression(st, body, None);
                if ty.is_error() {
                    return error;
                }
                ty
            }

            Op::Compute => {
                let body = expr.car().expect("compute body");
                debug_assert!(
                    body.op() != Op::Context
                        || body.cdr().is_some_and(|inner| {
                            matches!(inner.op(), Op::Minu | Op::Maxu)
                        }),
                    "COMPUTE wraps a MIN or MAX expression"
                );
                let ty = ck.check_expression(st, body, ctx);
                if ty.is_error() {
                    return error;
                }
                if ty.is_boolean() {
                    return ty;
                }
                if self.violation(ck, st, back_compat_or_mandatory1(ty), expr) {
                    return error;
                }
                ty
            }

            op => unreachable!("opcode {op:?} is not a statement"),
        }
    }
}
