//! Name resolution: mapping an identifier node and a context to the
//! declared symbol it denotes.
//!
//! Constants are global; every other symbol kind lives under its module
//! context. A bare name that is both a global constant and a contextual
//! symbol is ambiguous.

use crate::symb::SymbTable;
use smv_ast::{Ast, Node, Op};

/// What an identifier resolves to. Every variant carries the fully
/// qualified name the lookup settled on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resolution<'a> {
    /// Nothing declared under this name.
    Undefined(Node<'a>),
    /// The name has more than one interpretation.
    Ambiguous(Node<'a>),
    Constant(Node<'a>),
    Parameter(Node<'a>),
    Define(Node<'a>),
    ArrayDefine(Node<'a>),
    VariableArray(Node<'a>),
    Var(Node<'a>),
    Function(Node<'a>),
}

impl<'a> Resolution<'a> {
    /// The fully qualified name the lookup settled on.
    pub fn name(self) -> Node<'a> {
        match self {
            Self::Undefined(name)
            | Self::Ambiguous(name)
            | Self::Constant(name)
            | Self::Parameter(name)
            | Self::Define(name)
            | Self::ArrayDefine(name)
            | Self::VariableArray(name)
            | Self::Var(name)
            | Self::Function(name) => name,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined(_))
    }

    pub fn is_ambiguous(self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }
}

/// Prefixes `ctx` onto the leftmost atom of a (possibly dotted or indexed)
/// name. `self` in head position resolves to the context itself.
pub fn contextualize<'a>(ast: &Ast<'a>, ctx: Option<Node<'a>>, name: Node<'a>) -> Node<'a> {
    let Some(ctx) = ctx else { return name };
    match name.op() {
        Op::Atom => ast.dot(ctx, name),
        Op::SelfIdent => ctx,
        Op::Dot => {
            let base = contextualize(ast, Some(ctx), name.car().expect("dot without base"));
            ast.dot(base, name.cdr().expect("dot without field"))
        }
        Op::ArrayIndex => {
            let base = contextualize(ast, Some(ctx), name.car().expect("index without base"));
            ast.array_index(base, name.cdr().expect("index without index"))
        }
        Op::Bit => {
            let base = contextualize(ast, Some(ctx), name.car().expect("bit without base"));
            ast.bit(base, name.number().expect("bit without index"))
        }
        _ => name,
    }
}

impl<'a> SymbTable<'_, 'a> {
    /// Resolves `name` under `ctx`.
    ///
    /// The contextualised name is probed for every scoped symbol kind;
    /// the bare name is probed as a global constant. One match wins; a
    /// constant clashing with a scoped symbol is ambiguous; no match is
    /// undefined.
    pub fn resolve(&self, name: Node<'a>, ctx: Option<Node<'a>>) -> Resolution<'a> {
        let qualified = contextualize(self.ast(), ctx, name);

        let scoped = if self.is_define(qualified) {
            Some(Resolution::Define(qualified))
        } else if self.is_var(qualified) {
            Some(Resolution::Var(qualified))
        } else if self.is_parameter(qualified) {
            Some(Resolution::Parameter(qualified))
        } else if self.is_array_define(qualified) {
            Some(Resolution::ArrayDefine(qualified))
        } else if self.is_variable_array(qualified) {
            Some(Resolution::VariableArray(qualified))
        } else if self.is_function(qualified) {
            Some(Resolution::Function(qualified))
        } else {
            None
        };

        // Constants are looked up globally, under the bare name.
        let constant = if self.is_constant(name) {
            Some(Resolution::Constant(name))
        } else if qualified != name && self.is_constant(qualified) {
            Some(Resolution::Constant(qualified))
        } else {
            None
        };

        match (scoped, constant) {
            (Some(_), Some(_)) => Resolution::Ambiguous(qualified),
            (Some(resolution), None) => resolution,
            (None, Some(resolution)) => resolution,
            (None, None) => Resolution::Undefined(qualified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{symb::InsertPolicy, ty::TypeCtx};
    use smv_ast::Arena;
    use smv_interface::Session;

    #[test]
    fn contextualization() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let m = ast.atom("m");
        let x = ast.atom("x");
        assert_eq!(contextualize(&ast, None, x), x);
        assert_eq!(contextualize(&ast, Some(m), x), ast.dot(m, x));
        let dotted = ast.dot(ast.atom("sub"), x);
        assert_eq!(contextualize(&ast, Some(m), dotted), ast.dot(ast.dot(m, ast.atom("sub")), x));
        let selfed = ast.dot(ast.self_ident(), x);
        assert_eq!(contextualize(&ast, Some(m), selfed), ast.dot(m, x));
        let indexed = ast.array_index(x, ast.number(2));
        assert_eq!(
            contextualize(&ast, Some(m), indexed),
            ast.array_index(ast.dot(m, x), ast.number(2))
        );
    }

    #[test]
    fn constant_vs_scoped_ambiguity() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        let sess = Session::with_buffer_emitter(Default::default());
        let mut st = SymbTable::new(&ast, &tcx, &sess);
        st.create_layer(Some("M"), InsertPolicy::Default);

        let m = ast.atom("m");
        let x = ast.atom("x");
        let m_x = ast.dot(m, x);
        {
            let mut layer = st.layer_mut("M");
            layer.declare_state_var(m_x, tcx.boolean());
            layer.declare_constant(x);
        }

        assert_eq!(st.resolve(x, Some(m)), Resolution::Ambiguous(m_x));
        assert_eq!(st.resolve(x, None), Resolution::Constant(x));
        assert_eq!(st.resolve(m_x, None), Resolution::Var(m_x));
        let y = ast.atom("y");
        assert_eq!(st.resolve(y, Some(m)), Resolution::Undefined(ast.dot(m, y)));
    }
}
