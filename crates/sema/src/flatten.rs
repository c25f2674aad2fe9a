//! The flattening service: contextualising expressions and folding the
//! constant arguments the checker needs resolved.
//!
//! Full flattening (module expansion, define inlining into formulas) is the
//! compiler front-end's business; the checker only relies on the small
//! contract captured by [`Flatten`], and [`ContextFlattener`] implements it
//! over the symbol table.

use crate::{resolve::Resolution, symb::SymbTable};
use smv_ast::{MAX_WORD_WIDTH, Node, Op};

/// The external flattening service consumed by the cache (define-body
/// memoisation) and the checker (`uwconst`/`swconst` elimination).
pub trait Flatten<'a> {
    /// Rewrites `expr` under `ctx` into a context-free expression:
    /// identifiers become fully qualified, parameters are replaced by their
    /// actuals, and constant word constructors become word constants.
    fn flatten(&self, st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Node<'a>;
}

/// The in-tree [`Flatten`] implementation.
pub struct ContextFlattener;

impl<'a> Flatten<'a> for ContextFlattener {
    fn flatten(&self, st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Node<'a> {
        flatten_rec(st, expr, ctx)
    }
}

fn flatten_rec<'a>(st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Node<'a> {
    let ast = st.ast();
    match expr.op() {
        Op::Context => flatten_rec(st, expr.cdr().expect("context without body"), expr.car()),

        Op::Atom | Op::Dot | Op::ArrayIndex | Op::SelfIdent | Op::Bit => {
            match st.resolve(expr, ctx) {
                Resolution::Parameter(name) => st.flatten_parameter_actual(name),
                resolution => resolution.name(),
            }
        }

        // Constant word constructors fold into word constants when both
        // arguments resolve; otherwise they are left for the checker to
        // reject.
        Op::Uwconst | Op::Swconst => {
            let value = expr.car().and_then(|v| resolve_number(st, v, ctx));
            let width = expr.cdr().and_then(|w| resolve_number(st, w, ctx));
            match (value, width) {
                (Some(value), Some(width))
                    if width > 0 && width <= i64::from(MAX_WORD_WIDTH) =>
                {
                    let width = width as u32;
                    if expr.op() == Op::Uwconst {
                        ast.unsigned_word(width, value as u64)
                    } else {
                        ast.signed_word(width, value as u64)
                    }
                }
                _ => rebuild(st, expr, ctx),
            }
        }

        _ if expr.car().is_none() && expr.cdr().is_none() => expr,

        _ => rebuild(st, expr, ctx),
    }
}

fn rebuild<'a>(st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Node<'a> {
    let car = expr.car().map(|car| flatten_rec(st, car, ctx));
    let cdr = expr.cdr().map(|cdr| flatten_rec(st, cdr, ctx));
    st.ast().rebuild(expr, car, cdr)
}

/// Evaluates `expr` under `ctx` to an integer constant, resolving defines
/// and parameters and folding basic arithmetic. Word constants do not
/// count; callers that accept them inspect the node directly.
pub fn resolve_number<'a>(st: &SymbTable<'_, 'a>, expr: Node<'a>, ctx: Option<Node<'a>>) -> Option<i64> {
    match expr.op() {
        Op::Number => expr.number(),
        Op::Context => resolve_number(st, expr.cdr()?, expr.car()),
        Op::UMinus => resolve_number(st, expr.car()?, ctx).map(|n| -n),
        Op::Plus | Op::Minus | Op::Times | Op::Divide | Op::Mod => {
            let lhs = resolve_number(st, expr.car()?, ctx)?;
            match expr.cdr() {
                None => match expr.op() {
                    // Unary plus and minus.
                    Op::Plus => Some(lhs),
                    Op::Minus => Some(-lhs),
                    _ => None,
                },
                Some(rhs) => {
                    let rhs = resolve_number(st, rhs, ctx)?;
                    match expr.op() {
                        Op::Plus => lhs.checked_add(rhs),
                        Op::Minus => lhs.checked_sub(rhs),
                        Op::Times => lhs.checked_mul(rhs),
                        Op::Divide => lhs.checked_div(rhs),
                        Op::Mod => lhs.checked_rem(rhs),
                        _ => unreachable!(),
                    }
                }
            }
        }
        Op::Atom | Op::Dot | Op::ArrayIndex => match st.resolve(expr, ctx) {
            Resolution::Define(name) => {
                resolve_number(st, st.define_body(name), st.define_context(name))
            }
            Resolution::Parameter(name) => {
                resolve_number(st, st.parameter_actual(name), st.parameter_context(name))
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{symb::InsertPolicy, ty::TypeCtx};
    use smv_ast::{Arena, Ast};
    use smv_interface::Session;

    #[test]
    fn numbers_fold() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut st = SymbTable::new(&ast, &tcx, &sess);
        st.create_layer(Some("M"), InsertPolicy::Default);

        let w = ast.atom("w");
        st.layer_mut("M").declare_define(w, None, ast.number(4));

        let e = ast.binary(Op::Plus, ast.number(1), ast.binary(Op::Times, ast.number(2), w));
        assert_eq!(resolve_number(&st, e, None), Some(9));
        assert_eq!(resolve_number(&st, ast.wrap(Op::UMinus, ast.number(3)), None), Some(-3));
        assert_eq!(resolve_number(&st, ast.atom("unknown"), None), None);
        assert_eq!(resolve_number(&st, ast.true_(), None), None);
    }

    #[test]
    fn uwconst_folds_to_word_constant() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let st = SymbTable::new(&ast, &tcx, &sess);

        let e = ast.binary(Op::Uwconst, ast.number(5), ast.number(8));
        let flat = ContextFlattener.flatten(&st, e, None);
        assert_eq!(flat, ast.unsigned_word(8, 5));

        let s = ast.binary(Op::Swconst, ast.wrap(Op::UMinus, ast.number(1)), ast.number(4));
        let flat = ContextFlattener.flatten(&st, s, None);
        assert_eq!(flat, ast.signed_word(4, 0b1111));

        // A non-constant width stays put for the checker to reject.
        let bad = ast.binary(Op::Uwconst, ast.number(5), ast.atom("width"));
        assert_eq!(ContextFlattener.flatten(&st, bad, None).op(), Op::Uwconst);
    }

    #[test]
    fn identifiers_contextualize() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut st = SymbTable::new(&ast, &tcx, &sess);
        st.create_layer(Some("M"), InsertPolicy::Default);

        let m = ast.atom("m");
        let x = ast.atom("x");
        let m_x = ast.dot(m, x);
        st.layer_mut("M").declare_state_var(m_x, tcx.boolean());

        let e = ast.binary(Op::And, x, ast.true_());
        let flat = ContextFlattener.flatten(&st, e, Some(m));
        assert_eq!(flat, ast.binary(Op::And, m_x, ast.true_()));
    }
}
