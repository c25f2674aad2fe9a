use super::{TypeChecker, TypeViolation};
use crate::{symb::SymbTable, ty::Ty};
use smv_ast::{Node, OpRange};

/// An expression checker owning one contiguous opcode range.
///
/// The master [`TypeChecker`] routes each node to the walker whose range
/// contains its opcode; a walker recurses through the master for
/// sub-expressions outside its own range, and all walkers share the
/// master's memo.
pub trait ExprWalker<'a> {
    /// The walker's name, for registration errors and logging.
    fn name(&self) -> &'static str;

    /// The half-open opcode range this walker claims.
    fn range(&self) -> OpRange;

    /// Infers the type of `expr` under `ctx`. `expr`'s opcode is within
    /// [`range`](Self::range); memo lookups and stores happen in the
    /// master.
    fn check_expr(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Ty<'a>;

    /// The walker's violation handler: reports `violation` at `expr` and
    /// returns `true` when the violation is fatal. The default applies the
    /// shared severity policy; a walker may override it to downgrade or
    /// reword its own codes.
    fn violation(
        &self,
        ck: &TypeChecker<'a>,
        st: &SymbTable<'_, 'a>,
        violation: TypeViolation,
        expr: Node<'a>,
    ) -> bool {
        ck.report_violation(st, violation, expr)
    }
}
