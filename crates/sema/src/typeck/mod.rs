//! The memoising recursive type checker.
//!
//! A [`TypeChecker`] is a master walker: it owns an ordered list of
//! [`ExprWalker`]s, each claiming one contiguous opcode range, and routes
//! every node to the walker whose range contains its opcode. Inference
//! results are memoised per `(context, expression)` wrap; the memo is
//! flushed whenever a top-level check detects an error and whenever a
//! symbol is redeclared.

use crate::{
    symb::{SymbTable, SymbolKind},
    ty::{Ty, TyKind, TypeCtx},
};
use smv_ast::{Node, Op};
use smv_data_structures::map::FxHashMap;
use smv_interface::Session;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

mod core;
pub(crate) use core::CoreChecker;

mod stmt;
pub(crate) use stmt::StatementChecker;

mod psl;
pub(crate) use psl::PslChecker;

mod violation;
pub(crate) use violation::severity;
pub use violation::{Severity, TypeViolation};

mod walker;
pub use walker::ExprWalker;

/// The property kinds [`TypeChecker::check_property`] accepts; each tags
/// the property body with its section opcode before checking.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PropertyKind {
    Ctl,
    Ltl,
    Psl,
    Invar,
    Compute,
}

impl PropertyKind {
    fn section_op(self) -> Op {
        match self {
            Self::Ctl => Op::Spec,
            Self::Ltl => Op::LtlSpec,
            Self::Psl => Op::PslSpec,
            Self::Invar => Op::InvarSpec,
            Self::Compute => Op::Compute,
        }
    }
}

type Memo<'a> = Rc<RefCell<FxHashMap<Node<'a>, Ty<'a>>>>;

/// The master type checker bound to one symbol table for its lifetime.
pub struct TypeChecker<'a> {
    tcx: &'a TypeCtx<'a>,
    sess: &'a Session,
    walkers: Vec<Box<dyn ExprWalker<'a> + 'a>>,
    memo: Memo<'a>,
    /// Zero means memoising is enabled; walkers may disable it reentrantly
    /// through [`with_memo_disabled`](Self::with_memo_disabled).
    memo_disabled: Cell<u32>,
}

impl<'a> TypeChecker<'a> {
    /// Creates a checker with the default walkers: core expressions,
    /// statements and PSL.
    pub(crate) fn new(tcx: &'a TypeCtx<'a>, sess: &'a Session) -> Self {
        let mut this = Self {
            tcx,
            sess,
            walkers: Vec::new(),
            memo: Rc::new(RefCell::new(FxHashMap::default())),
            memo_disabled: Cell::new(0),
        };
        this.register_walker(Box::new(CoreChecker));
        this.register_walker(Box::new(StatementChecker::new()));
        this.register_walker(Box::new(PslChecker));
        this
    }

    /// Registers an additional walker.
    ///
    /// # Panics
    ///
    /// Panics if the walker's opcode range overlaps a registered one.
    pub fn register_walker(&mut self, walker: Box<dyn ExprWalker<'a> + 'a>) {
        for registered in &self.walkers {
            assert!(
                !registered.range().overlaps(walker.range()),
                "walker {} overlaps walker {}",
                walker.name(),
                registered.name(),
            );
        }
        debug!(walker = walker.name(), range = ?walker.range(), "registered walker");
        self.walkers.push(walker);
    }

    pub(crate) fn tcx(&self) -> &'a TypeCtx<'a> {
        self.tcx
    }

    /// The memo, shared with the cache's redeclare trigger.
    pub(crate) fn memo_handle(&self) -> Memo<'a> {
        Rc::clone(&self.memo)
    }

    // ---------------- public operations ----------------

    /// Infers the type of `expr` under `ctx`, memoising the result.
    /// Idempotent; an error flushes the memo so a later retry starts
    /// clean.
    pub fn expr_type(&self, st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Ty<'a> {
        self.force_memo_enabled();
        let ty = self.check_expression(st, expr, ctx);
        if ty.is_error() {
            self.flush_memo();
        }
        ty
    }

    /// Whether `expr` type-checks under `ctx`.
    pub fn expr_is_well_formed(
        &self,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> bool {
        !self.expr_type(st, expr, ctx).is_error()
    }

    /// Type-checks every declaration of a layer: each variable's declared
    /// type must be well formed, and each define's body must have some
    /// type.
    pub fn check_layer(&self, st: &SymbTable<'_, 'a>, layer: &str) -> bool {
        let view = st.layer(layer).unwrap_or_else(|| panic!("no layer named {layer}"));

        let mut ok = true;
        for var in view.iter(SymbolKind::VAR) {
            ok = self.type_is_well_formed(st, st.var_type(var), var) && ok;
        }
        if !ok {
            return false;
        }

        for def in view.iter(SymbolKind::DEFINE | SymbolKind::ARRAY_DEFINE) {
            // Wrapping the name makes the statement checker resolve the
            // define and type its body, memoising along the way.
            let wrapped = st.ast().wrap(Op::Define, def);
            ok = self.is_specification_well_formed(st, wrapped) && ok;
        }
        if ok {
            debug!(layer, "layer type-checked successfully");
        }
        ok
    }

    /// Type-checks the module constraints. Each argument is an `AND`- or
    /// `CONS`-joined list whose leaves are wrapped in the corresponding
    /// section tag before checking. Returns the conjunction of the
    /// per-section results.
    #[allow(clippy::too_many_arguments)]
    pub fn check_constraints(
        &self,
        st: &SymbTable<'_, 'a>,
        init: Option<Node<'a>>,
        trans: Option<Node<'a>>,
        invar: Option<Node<'a>>,
        assign: Option<Node<'a>>,
        justice: Option<Node<'a>>,
        compassion: Option<Node<'a>>,
    ) -> bool {
        let mut ok = true;
        ok &= self.check_constraint_list(st, Op::Init, init);
        ok &= self.check_constraint_list(st, Op::Trans, trans);
        ok &= self.check_constraint_list(st, Op::Invar, invar);
        ok &= self.check_constraint_list(st, Op::Assign, assign);
        ok &= self.check_constraint_list(st, Op::Justice, justice);
        ok &= self.check_constraint_list(st, Op::Compassion, compassion);
        if ok {
            debug!("module constraints type-checked successfully");
        }
        ok
    }

    fn check_constraint_list(&self, st: &SymbTable<'_, 'a>, section: Op, list: Option<Node<'a>>) -> bool {
        let Some(node) = list else { return true };
        match node.op() {
            // These lists come out of compilation joined by CONS and AND.
            Op::Cons | Op::And => {
                let car = self.check_constraint_list(st, section, node.car());
                let cdr = self.check_constraint_list(st, section, node.cdr());
                car && cdr
            }
            _ => self.is_specification_well_formed(st, st.ast().wrap(section, node)),
        }
    }

    /// Type-checks a property body, tagged by its kind.
    pub fn check_property(&self, st: &SymbTable<'_, 'a>, kind: PropertyKind, expr: Node<'a>) -> bool {
        let wrapped = st.ast().wrap(kind.section_op(), expr);
        let ok = self.is_specification_well_formed(st, wrapped);
        if ok {
            debug!(?kind, "property type-checked successfully");
        }
        ok
    }

    /// Whether a specification (an expression wrapped in a section tag)
    /// type-checks.
    pub fn is_specification_well_formed(&self, st: &SymbTable<'_, 'a>, spec: Node<'a>) -> bool {
        self.force_memo_enabled();
        if let Some(ty) = self.lookup(spec) {
            return !ty.is_error();
        }
        let ty = self.check_expression(st, spec, None);
        if ty.is_error() {
            self.flush_memo();
            return false;
        }
        true
    }

    /// Checks the well-formedness of a declared type: word widths within
    /// bounds, no duplicate enum constants, arrays recursively well
    /// formed. `var_name` only labels the diagnostics.
    pub fn type_is_well_formed(&self, st: &SymbTable<'_, 'a>, ty: Ty<'a>, var_name: Node<'a>) -> bool {
        match ty.kind() {
            TyKind::Boolean | TyKind::Integer | TyKind::Real => true,
            TyKind::Enum(_, values) => {
                let mut counts = FxHashMap::<Node<'a>, u32>::default();
                for &value in values {
                    *counts.entry(value).or_insert(0) += 1;
                }
                for &value in values {
                    if counts.get(&value).copied().unwrap_or(0) > 1 {
                        counts.remove(&value);
                        if self.report_violation(st, TypeViolation::DuplicateConstants, var_name) {
                            return false;
                        }
                    }
                }
                true
            }
            TyKind::SignedWord(w) | TyKind::UnsignedWord(w) => {
                crate::ty::valid_word_width(w)
                    || !self.report_violation(st, TypeViolation::IncorrectWordWidth, var_name)
            }
            TyKind::WordArray(aw, vw) => {
                let mut ok = true;
                if !crate::ty::valid_word_width(aw) {
                    ok = !self.report_violation(
                        st,
                        TypeViolation::IncorrectWordArrayWidth,
                        var_name,
                    ) && ok;
                }
                if !crate::ty::valid_word_width(vw) {
                    ok = !self.report_violation(
                        st,
                        TypeViolation::IncorrectWordArrayWidth,
                        var_name,
                    ) && ok;
                }
                ok
            }
            TyKind::Array(sub, ..) => self.type_is_well_formed(st, sub, var_name),
            kind => panic!("a variable cannot have type {kind:?}"),
        }
    }

    // ---------------- recursion and memoisation ----------------

    /// Wraps `expr` into `ctx` to form the memo key.
    pub(crate) fn wrap_context(
        &self,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Node<'a> {
        match ctx {
            None => expr,
            Some(ctx) => st.ast().context(Some(ctx), expr),
        }
    }

    /// The recursive entry point walkers use for sub-expressions: memo
    /// lookup, dispatch to the owning walker, memo store.
    pub(crate) fn check_expression(
        &self,
        st: &SymbTable<'_, 'a>,
        expr: Node<'a>,
        ctx: Option<Node<'a>>,
    ) -> Ty<'a> {
        let key = self.wrap_context(st, expr, ctx);
        if let Some(ty) = self.lookup(key) {
            return ty;
        }
        let ty = self.dispatch(st, expr, ctx);
        self.memoize(key, ty)
    }

    fn dispatch(&self, st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Ty<'a> {
        let op = expr.op();
        let walker = self
            .walkers
            .iter()
            .find(|walker| walker.range().contains(op))
            .unwrap_or_else(|| panic!("no walker claims opcode {op:?}"));
        walker.check_expr(self, st, expr, ctx)
    }

    pub(crate) fn lookup(&self, key: Node<'a>) -> Option<Ty<'a>> {
        if !self.memo_enabled() {
            return None;
        }
        self.memo.borrow().get(&key).copied()
    }

    pub(crate) fn memoize(&self, key: Node<'a>, ty: Ty<'a>) -> Ty<'a> {
        if self.memo_enabled() {
            self.memo.borrow_mut().insert(key, ty);
        }
        ty
    }

    /// Runs `f` with memoisation disabled; reentrant. The PSL `forall`
    /// checker uses this to re-check a property body under each binding of
    /// its iteration variable.
    pub fn with_memo_disabled<R>(&self, f: impl FnOnce() -> R) -> R {
        self.memo_disabled.set(self.memo_disabled.get() + 1);
        let result = f();
        self.memo_disabled.set(self.memo_disabled.get() - 1);
        result
    }

    fn memo_enabled(&self) -> bool {
        self.memo_disabled.get() == 0
    }

    /// Every public check re-enables memoisation; a walker that disabled
    /// it mid-check cannot leak the disabled state past its own scope.
    fn force_memo_enabled(&self) {
        self.memo_disabled.set(0);
    }

    fn flush_memo(&self) {
        self.memo.borrow_mut().clear();
    }

    // ---------------- violations ----------------


    /// Applies the shared severity policy to `violation` at `expr`,
    /// emitting the diagnostic. Returns `true` when fatal.
    pub(crate) fn report_violation(
        &self,
        _st: &SymbTable<'_, 'a>,
        violation: TypeViolation,
        expr: Node<'a>,
    ) -> bool {
        match severity(violation, &self.sess.opts) {
            Severity::Fatal => {
                self.sess.dcx().err(violation.message()).line(expr.line()).expr(expr).emit();
                true
            }
            Severity::Warning => {
                self.sess.dcx().warn(violation.message()).line(expr.line()).expr(expr).emit();
                false
            }
            Severity::Silent => false,
        }
    }
}

/// Picks the demotable violation code when every involved type predates the
/// type system.
pub(crate) fn back_compat_or_mandatory(lhs: Ty<'_>, rhs: Ty<'_>) -> TypeViolation {
    if lhs.is_back_compat() && rhs.is_back_compat() {
        TypeViolation::TypeBackCompat
    } else {
        TypeViolation::TypeMandatory
    }
}

pub(crate) fn back_compat_or_mandatory1(ty: Ty<'_>) -> TypeViolation {
    if ty.is_back_compat() { TypeViolation::TypeBackCompat } else { TypeViolation::TypeMandatory }
}
