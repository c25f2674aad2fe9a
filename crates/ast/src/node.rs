use crate::{Op, WordValue};
use smv_data_structures::{Interned, map::FxBuildHasher};
use smv_interface::Symbol;
use std::{
    fmt,
    hash::{Hash, Hasher},
};

type InternSet<T> = once_map::OnceMap<T, (), FxBuildHasher>;

/// Owns the memory behind an [`Ast`]. Dropping the arena frees every node
/// and interned type allocated through it.
#[derive(Default)]
pub struct Arena {
    bump: bumpalo::Bump,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bytes allocated so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Allocates `value` in the arena.
    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a copy of `values` in the arena.
    pub fn alloc_slice<T: Copy>(&self, values: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(values)
    }
}

/// The node interner: builds hash-consed [`Node`]s inside a borrowed
/// [`Arena`].
///
/// Structurally equal nodes built through the same `Ast` are pointer-equal.
/// Line numbers are carried but are not part of a node's identity, so the
/// first builder of a given shape fixes its line.
pub struct Ast<'a> {
    arena: &'a Arena,
    nodes: InternSet<&'a NodeData<'a>>,
}

/// Auxiliary payload of a leaf node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Payload {
    /// No payload.
    None,
    /// An interned name; also used for the textual form of real constants.
    Atom(Symbol),
    /// An integer constant.
    Number(i64),
    /// A word constant.
    Word(WordValue),
}

/// The contents of a node: an opcode, up to two children, a payload, and a
/// line number.
#[derive(Clone, Copy, Debug)]
pub struct NodeData<'a> {
    pub(crate) op: Op,
    pub(crate) car: Option<Node<'a>>,
    pub(crate) cdr: Option<Node<'a>>,
    pub(crate) payload: Payload,
    pub(crate) line: u32,
}

// The line number is deliberately not part of a node's identity: two
// occurrences of the same expression on different lines are the same node.
impl PartialEq for NodeData<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && self.car == other.car
            && self.cdr == other.cdr
            && self.payload == other.payload
    }
}

impl Eq for NodeData<'_> {}

impl Hash for NodeData<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.car.hash(state);
        self.cdr.hash(state);
        self.payload.hash(state);
    }
}

/// A hash-consed AST node. Copyable; equality and hashing are by address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node<'a>(Interned<'a, NodeData<'a>>);

impl<'a> Node<'a> {
    /// The opcode.
    #[inline]
    pub fn op(self) -> Op {
        self.0.op
    }

    /// The left child.
    #[inline]
    pub fn car(self) -> Option<Node<'a>> {
        self.0.car
    }

    /// The right child.
    #[inline]
    pub fn cdr(self) -> Option<Node<'a>> {
        self.0.cdr
    }

    /// The payload.
    #[inline]
    pub fn payload(self) -> Payload {
        self.0.payload
    }

    /// The source line this node was first built with.
    #[inline]
    pub fn line(self) -> u32 {
        self.0.line
    }

    /// The `Atom` payload, if any.
    pub fn atom(self) -> Option<Symbol> {
        match self.0.payload {
            Payload::Atom(sym) => Some(sym),
            _ => None,
        }
    }

    /// The `Number` payload, if any.
    pub fn number(self) -> Option<i64> {
        match self.0.payload {
            Payload::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The `Word` payload, if any.
    pub fn word(self) -> Option<WordValue> {
        match self.0.payload {
            Payload::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Iterates over the elements of a right-nested `Cons` chain.
    ///
    /// A non-`Cons` node yields itself once.
    pub fn iter_cons(self) -> ConsIter<'a> {
        ConsIter { cur: Some(self) }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({self})")
    }
}

/// See [`Node::iter_cons`].
pub struct ConsIter<'a> {
    cur: Option<Node<'a>>,
}

impl<'a> Iterator for ConsIter<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        let node = self.cur?;
        if node.op() == Op::Cons {
            self.cur = node.cdr();
            node.car()
        } else {
            self.cur = None;
            Some(node)
        }
    }
}

impl<'a> Ast<'a> {
    /// Creates a node interner over `arena`.
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena, nodes: Default::default() }
    }

    fn intern(&self, data: NodeData<'a>) -> Node<'a> {
        Node(Interned::new_unchecked(self.nodes.map_insert_ref(
            &data,
            |data| &*self.arena.bump.alloc(*data),
            |_| (),
            |node, _| *node,
        )))
    }

    /// Builds a node, inheriting the line of its left child.
    pub fn node(&self, op: Op, car: Option<Node<'a>>, cdr: Option<Node<'a>>) -> Node<'a> {
        let line = car.map(Node::line).unwrap_or(0);
        self.lined_node(op, line, car, cdr)
    }

    /// Builds a node with an explicit line number.
    pub fn lined_node(
        &self,
        op: Op,
        line: u32,
        car: Option<Node<'a>>,
        cdr: Option<Node<'a>>,
    ) -> Node<'a> {
        self.intern(NodeData { op, car, cdr, payload: Payload::None, line })
    }

    /// Re-interns the top node, yielding its canonical instance.
    ///
    /// With full hash-consing this is the identity on nodes built through
    /// this `Ast`; it exists so callers normalising foreign or rebuilt
    /// nodes have a name for the operation.
    pub fn find_atom(&self, node: Node<'a>) -> Node<'a> {
        self.intern(*node.0.0)
    }

    // ---------------- leaves ----------------

    /// An `Atom` identifier leaf.
    pub fn atom(&self, name: &str) -> Node<'a> {
        self.atom_sym(Symbol::intern(name))
    }

    /// An `Atom` identifier leaf from an interned symbol.
    pub fn atom_sym(&self, name: Symbol) -> Node<'a> {
        self.leaf(Op::Atom, Payload::Atom(name))
    }

    /// A `Number` integer constant.
    pub fn number(&self, value: i64) -> Node<'a> {
        self.leaf(Op::Number, Payload::Number(value))
    }

    /// An unsigned word constant of the given width.
    pub fn unsigned_word(&self, width: u32, bits: u64) -> Node<'a> {
        self.leaf(Op::NumberUnsignedWord, Payload::Word(WordValue::unsigned(width, bits)))
    }

    /// A signed word constant of the given width.
    pub fn signed_word(&self, width: u32, bits: u64) -> Node<'a> {
        self.leaf(Op::NumberSignedWord, Payload::Word(WordValue::signed(width, bits)))
    }

    /// A real constant, kept in its textual form.
    pub fn real(&self, text: &str) -> Node<'a> {
        self.leaf(Op::NumberReal, Payload::Atom(Symbol::intern(text)))
    }

    /// The `TRUE` constant.
    pub fn true_(&self) -> Node<'a> {
        self.leaf(Op::True, Payload::None)
    }

    /// The `FALSE` constant.
    pub fn false_(&self) -> Node<'a> {
        self.leaf(Op::False, Payload::None)
    }

    /// The `FAILURE` case terminator.
    pub fn failure(&self) -> Node<'a> {
        self.leaf(Op::Failure, Payload::None)
    }

    /// The `self` module reference.
    pub fn self_ident(&self) -> Node<'a> {
        self.leaf(Op::SelfIdent, Payload::None)
    }

    fn leaf(&self, op: Op, payload: Payload) -> Node<'a> {
        self.intern(NodeData { op, car: None, cdr: None, payload, line: 0 })
    }

    // ---------------- identifiers ----------------

    /// A qualified name: `base.field`.
    pub fn dot(&self, base: Node<'a>, field: Node<'a>) -> Node<'a> {
        self.node(Op::Dot, Some(base), Some(field))
    }

    /// An indexed name or array access: `base[index]`.
    pub fn array_index(&self, base: Node<'a>, index: Node<'a>) -> Node<'a> {
        self.node(Op::ArrayIndex, Some(base), Some(index))
    }

    /// The `index`-th bit of variable `base`.
    pub fn bit(&self, base: Node<'a>, index: i64) -> Node<'a> {
        self.intern(NodeData {
            op: Op::Bit,
            car: Some(base),
            cdr: None,
            payload: Payload::Number(index),
            line: base.line(),
        })
    }

    /// Wraps `expr` into context `ctx`.
    pub fn context(&self, ctx: Option<Node<'a>>, expr: Node<'a>) -> Node<'a> {
        self.lined_node(Op::Context, expr.line(), ctx, Some(expr))
    }

    // ---------------- containers and common operators ----------------

    /// A `Cons` cell.
    pub fn cons(&self, car: Node<'a>, cdr: Option<Node<'a>>) -> Node<'a> {
        self.node(Op::Cons, Some(car), cdr)
    }

    /// A right-nested `Cons` chain over `elems`; `None` when empty.
    pub fn list(&self, elems: impl IntoIterator<Item = Node<'a>>) -> Option<Node<'a>> {
        let elems = elems.into_iter().collect::<Vec<_>>();
        elems.into_iter().rev().fold(None, |rest, elem| Some(self.cons(elem, rest)))
    }

    /// `lhs & rhs`.
    pub fn and(&self, lhs: Node<'a>, rhs: Node<'a>) -> Node<'a> {
        self.node(Op::And, Some(lhs), Some(rhs))
    }

    /// `lhs := rhs`.
    pub fn eqdef(&self, lhs: Node<'a>, rhs: Node<'a>) -> Node<'a> {
        self.node(Op::Eqdef, Some(lhs), Some(rhs))
    }

    /// `next(expr)`.
    pub fn next(&self, expr: Node<'a>) -> Node<'a> {
        self.node(Op::Next, Some(expr), None)
    }

    /// `init(expr)`.
    pub fn small_init(&self, expr: Node<'a>) -> Node<'a> {
        self.node(Op::SmallInit, Some(expr), None)
    }

    /// The integer range `lo..hi`.
    pub fn twodots(&self, lo: Node<'a>, hi: Node<'a>) -> Node<'a> {
        self.node(Op::Twodots, Some(lo), Some(hi))
    }

    /// One `cond : value` branch of a case expression.
    pub fn colon(&self, cond: Node<'a>, value: Node<'a>) -> Node<'a> {
        self.node(Op::Colon, Some(cond), Some(value))
    }

    /// A case node: `branch` is a [`colon`](Self::colon) pair, `rest` the
    /// remaining cases or the `FAILURE` terminator.
    pub fn case(&self, branch: Node<'a>, rest: Node<'a>) -> Node<'a> {
        self.node(Op::Case, Some(branch), Some(rest))
    }

    /// Re-builds `node` with new children, keeping its opcode, payload and
    /// line.
    pub fn rebuild(
        &self,
        node: Node<'a>,
        car: Option<Node<'a>>,
        cdr: Option<Node<'a>>,
    ) -> Node<'a> {
        self.intern(NodeData { op: node.op(), car, cdr, payload: node.payload(), line: node.line() })
    }

    /// A unary wrapper node: `op(expr)`.
    pub fn wrap(&self, op: Op, expr: Node<'a>) -> Node<'a> {
        self.node(op, Some(expr), None)
    }

    /// A binary operator node.
    pub fn binary(&self, op: Op, lhs: Node<'a>, rhs: Node<'a>) -> Node<'a> {
        self.node(op, Some(lhs), Some(rhs))
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_node(*self, f)
    }
}

fn print_node(node: Node<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let car = node.car();
    let cdr = node.cdr();
    match node.op() {
        Op::Atom => match node.atom() {
            Some(sym) => write!(f, "{sym}"),
            None => f.write_str("<atom>"),
        },
        Op::Number => write!(f, "{}", node.number().unwrap_or(0)),
        Op::NumberUnsignedWord | Op::NumberSignedWord => match node.word() {
            Some(w) => write!(f, "{w}"),
            None => f.write_str("<word>"),
        },
        Op::NumberReal | Op::NumberFrac | Op::NumberExp => match node.atom() {
            Some(sym) => write!(f, "{sym}"),
            None => f.write_str("<real>"),
        },
        Op::True => f.write_str("TRUE"),
        Op::False => f.write_str("FALSE"),
        Op::Failure => f.write_str("FAILURE"),
        Op::SelfIdent => f.write_str("self"),
        Op::Dot => {
            if let (Some(l), Some(r)) = (car, cdr) {
                write!(f, "{l}.{r}")
            } else {
                f.write_str(".")
            }
        }
        Op::ArrayIndex => {
            if let (Some(l), Some(r)) = (car, cdr) {
                write!(f, "{l}[{r}]")
            } else {
                f.write_str("[]")
            }
        }
        Op::Bit => {
            if let (Some(l), Some(n)) = (car, node.number()) {
                write!(f, "{l}.{n}")
            } else {
                f.write_str("<bit>")
            }
        }
        Op::Context => match (car, cdr) {
            (Some(ctx), Some(expr)) => write!(f, "{ctx}.{expr}"),
            (None, Some(expr)) => write!(f, "{expr}"),
            _ => f.write_str("<context>"),
        },
        Op::Twodots => {
            if let (Some(l), Some(r)) = (car, cdr) {
                write!(f, "{l}..{r}")
            } else {
                f.write_str("..")
            }
        }
        Op::Cons => {
            let mut first = true;
            for elem in node.iter_cons() {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                write!(f, "{elem}")?;
            }
            Ok(())
        }
        Op::Case | Op::IfThenElse => {
            f.write_str("case ")?;
            let mut cur = Some(node);
            while let Some(n) = cur {
                match n.op() {
                    Op::Case | Op::IfThenElse => {
                        if let Some(branch) = n.car() {
                            write!(f, "{branch}; ")?;
                        }
                        cur = n.cdr();
                    }
                    Op::Failure => break,
                    _ => {
                        write!(f, "{n}; ")?;
                        break;
                    }
                }
            }
            f.write_str("esac")
        }
        Op::Colon => {
            if let (Some(l), Some(r)) = (car, cdr) {
                write!(f, "{l} : {r}")
            } else {
                f.write_str(":")
            }
        }
        Op::SmallInit | Op::Next => match car {
            Some(e) => write!(f, "{}({e})", node.op()),
            None => f.write_str(node.op().as_str()),
        },
        Op::CastBool
        | Op::CastWord1
        | Op::CastSigned
        | Op::CastUnsigned
        | Op::CastToInt
        | Op::Wsizeof
        | Op::Count
        | Op::Uwconst
        | Op::Swconst => match (car, cdr) {
            (Some(l), Some(r)) => write!(f, "{}({l}, {r})", node.op()),
            (Some(l), None) => write!(f, "{}({l})", node.op()),
            _ => f.write_str(node.op().as_str()),
        },
        Op::Extend | Op::Wresize | Op::WaRead | Op::WaWrite => match (car, cdr) {
            (Some(l), Some(r)) => write!(f, "{}({l}, {r})", node.op()),
            _ => f.write_str(node.op().as_str()),
        },
        Op::BitSelection | Op::PslWSelect => match (car, cdr) {
            (Some(base), Some(range)) => {
                if let (Some(h), Some(l)) = (range.car(), range.cdr()) {
                    write!(f, "{base}[{h}:{l}]")
                } else {
                    write!(f, "{base}[{range}]")
                }
            }
            _ => f.write_str("[ : ]"),
        },
        Op::NFunction => match (car, cdr) {
            (Some(name), Some(args)) => write!(f, "{name}({args})"),
            (Some(name), None) => write!(f, "{name}()"),
            _ => f.write_str("<function>"),
        },
        Op::Attime => match (car, cdr) {
            (Some(e), Some(t)) => write!(f, "{e} @ {t}"),
            _ => f.write_str("@"),
        },
        _ => match (car, cdr) {
            (Some(l), Some(r)) => write!(f, "({l} {} {r})", node.op()),
            (Some(l), None) => write!(f, "{} {l}", node.op()),
            _ => f.write_str(node.op().as_str()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let x = ast.atom("x");
        let one = ast.number(1);
        let a = ast.binary(Op::Plus, x, one);
        let b = ast.binary(Op::Plus, ast.atom("x"), ast.number(1));
        assert_eq!(a, b);
        assert_eq!(ast.find_atom(a), a);
        let c = ast.binary(Op::Plus, one, x);
        assert_ne!(a, c);
    }

    #[test]
    fn line_is_not_identity() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let x = ast.atom("x");
        let a = ast.lined_node(Op::Next, 3, Some(x), None);
        let b = ast.lined_node(Op::Next, 9, Some(x), None);
        assert_eq!(a, b);
        assert_eq!(a.line(), 3);
    }

    #[test]
    fn cons_iteration() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let elems = [ast.atom("a"), ast.atom("b"), ast.atom("c")];
        let list = ast.list(elems).unwrap();
        let collected: Vec<_> = list.iter_cons().collect();
        assert_eq!(collected, elems);
        assert_eq!(list.to_string(), "a, b, c");
    }

    #[test]
    fn display() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let x = ast.atom("x");
        let e = ast.binary(Op::Equal, ast.binary(Op::Plus, x, ast.number(1)), ast.number(0));
        assert_eq!(e.to_string(), "((x + 1) = 0)");
        let m = ast.dot(ast.atom("m"), ast.atom("y"));
        assert_eq!(m.to_string(), "m.y");
        assert_eq!(ast.next(x).to_string(), "next(x)");
        assert_eq!(ast.unsigned_word(4, 3).to_string(), "0ud4_3");
    }
}
