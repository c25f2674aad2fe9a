//! The interned type algebra.
//!
//! Every type handed around by the symbol table and the checker is a
//! [`Ty`]: a copyable handle to a canonical [`TyKind`] interned in the
//! caller's [`Arena`]. Pointer equality coincides with type equality, so
//! the conversion lattice and the checker compare and hash types as
//! addresses.
//!
//! Declared enum types keep their concrete constant list (duplicates
//! included, so well-formedness checking can still see them). The algebra
//! itself works on *abstract* types, where a concrete enum collapses to one
//! of three singletons by category; see [`TypeCtx::normalize`].

use smv_ast::{Arena, MAX_WORD_WIDTH, Node};
use smv_data_structures::{Interned, map::FxBuildHasher};
use std::fmt;

mod algebra;

type InternSet<T> = once_map::OnceMap<T, (), FxBuildHasher>;

/// What a declared enum ranges over.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EnumCategory {
    /// Only integer constants, e.g. `{0, 2, 4}`.
    PureInt,
    /// Only symbolic constants, e.g. `{idle, busy}`.
    PureSymbolic,
    /// A mix of both, e.g. `{0, busy}`.
    IntSymbolic,
}

/// The structural payload of a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TyKind<'a> {
    /// The artificial type of expressions with no type, e.g. a module
    /// instantiation.
    NoType,
    /// The type of assignments and other statements.
    Statement,
    /// `boolean`.
    Boolean,
    /// An enumeration over the given constants. The empty list denotes the
    /// abstract enum of that category used during inference.
    Enum(EnumCategory, &'a [Node<'a>]),
    /// Infinite-precision integers.
    Integer,
    /// Infinite-precision rationals.
    Real,
    /// Bit vectors with signed arithmetic.
    SignedWord(u32),
    /// Bit vectors with unsigned arithmetic.
    UnsignedWord(u32),
    /// A memory of `2^aw` words of `vw` bits: `(address width, value width)`.
    WordArray(u32, u32),
    /// A fixed-bounds array of a subtype.
    Array(Ty<'a>, i64, i64),
    /// String literals.
    String,
    /// A set of boolean values, produced by `union`.
    SetBool,
    /// A set of integer values.
    SetInt,
    /// A set of symbolic values.
    SetSymb,
    /// A set of integer and symbolic values.
    SetIntSymb,
    /// The type of expressions that violated the type system.
    Error,
}

/// An interned type. Copyable; equality and hashing are by address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ty<'a>(Interned<'a, TyKind<'a>>);

impl fmt::Debug for Ty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({self})")
    }
}

impl<'a> std::ops::Deref for Ty<'a> {
    type Target = TyKind<'a>;

    #[inline]
    fn deref(&self) -> &TyKind<'a> {
        self.0.0
    }
}

impl<'a> Ty<'a> {
    /// The structural payload.
    #[inline]
    pub fn kind(self) -> TyKind<'a> {
        *self.0.0
    }

    pub fn is_no_type(self) -> bool {
        matches!(self.kind(), TyKind::NoType)
    }

    pub fn is_statement(self) -> bool {
        matches!(self.kind(), TyKind::Statement)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self.kind(), TyKind::Boolean)
    }

    pub fn is_enum(self) -> bool {
        matches!(self.kind(), TyKind::Enum(..))
    }

    pub fn is_pure_int_enum(self) -> bool {
        matches!(self.kind(), TyKind::Enum(EnumCategory::PureInt, _))
    }

    pub fn is_pure_symbolic_enum(self) -> bool {
        matches!(self.kind(), TyKind::Enum(EnumCategory::PureSymbolic, _))
    }

    pub fn is_int_symbolic_enum(self) -> bool {
        matches!(self.kind(), TyKind::Enum(EnumCategory::IntSymbolic, _))
    }

    pub fn is_integer(self) -> bool {
        matches!(self.kind(), TyKind::Integer)
    }

    pub fn is_real(self) -> bool {
        matches!(self.kind(), TyKind::Real)
    }

    pub fn is_signed_word(self) -> bool {
        matches!(self.kind(), TyKind::SignedWord(_))
    }

    pub fn is_unsigned_word(self) -> bool {
        matches!(self.kind(), TyKind::UnsignedWord(_))
    }

    pub fn is_word(self) -> bool {
        matches!(self.kind(), TyKind::SignedWord(_) | TyKind::UnsignedWord(_))
    }

    /// Whether this is `word[1]`, signed or unsigned.
    pub fn is_word1(self) -> bool {
        matches!(self.kind(), TyKind::SignedWord(1) | TyKind::UnsignedWord(1))
    }

    pub fn is_wordarray(self) -> bool {
        matches!(self.kind(), TyKind::WordArray(..))
    }

    pub fn is_array(self) -> bool {
        matches!(self.kind(), TyKind::Array(..))
    }

    pub fn is_string(self) -> bool {
        matches!(self.kind(), TyKind::String)
    }

    pub fn is_set(self) -> bool {
        matches!(
            self.kind(),
            TyKind::SetBool | TyKind::SetInt | TyKind::SetSymb | TyKind::SetIntSymb
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self.kind(), TyKind::Error)
    }

    /// Whether the type has infinite precision, i.e. is `integer` or `real`.
    pub fn is_infinite_precision(self) -> bool {
        matches!(self.kind(), TyKind::Integer | TyKind::Real)
    }

    /// Whether the type predates the type system: boolean, enum or integer.
    /// Violations between such types can be demoted under backward
    /// compatibility.
    pub fn is_back_compat(self) -> bool {
        matches!(self.kind(), TyKind::Boolean | TyKind::Enum(..) | TyKind::Integer)
    }

    /// The width of a word type.
    ///
    /// # Panics
    ///
    /// Panics on non-word types.
    pub fn word_width(self) -> u32 {
        match self.kind() {
            TyKind::SignedWord(w) | TyKind::UnsignedWord(w) => w,
            k => panic!("word_width on non-word type {k:?}"),
        }
    }

    /// The `(address, value)` widths of a word-array type.
    ///
    /// # Panics
    ///
    /// Panics on non-word-array types.
    pub fn wordarray_widths(self) -> (u32, u32) {
        match self.kind() {
            TyKind::WordArray(aw, vw) => (aw, vw),
            k => panic!("wordarray_widths on non-word-array type {k:?}"),
        }
    }

    /// The subtype of an array type.
    ///
    /// # Panics
    ///
    /// Panics on non-array types.
    pub fn array_subtype(self) -> Ty<'a> {
        match self.kind() {
            TyKind::Array(sub, ..) => sub,
            k => panic!("array_subtype on non-array type {k:?}"),
        }
    }

    /// The `(lower, upper)` bounds of an array type.
    ///
    /// # Panics
    ///
    /// Panics on non-array types.
    pub fn array_bounds(self) -> (i64, i64) {
        match self.kind() {
            TyKind::Array(_, lo, hi) => (lo, hi),
            k => panic!("array_bounds on non-array type {k:?}"),
        }
    }

    /// The declared constants of an enum type. Empty for the abstract
    /// singletons.
    pub fn enum_values(self) -> &'a [Node<'a>] {
        match self.kind() {
            TyKind::Enum(_, values) => values,
            k => panic!("enum_values on non-enum type {k:?}"),
        }
    }

    /// The number of bits needed to encode a value of this type.
    ///
    /// # Panics
    ///
    /// Panics on types without a finite encoding.
    pub fn size_in_bits(self) -> u32 {
        match self.kind() {
            TyKind::Boolean => 1,
            TyKind::Enum(_, values) => {
                let n = values.len();
                // A one-value enum still takes one bit.
                if n <= 1 { 1 } else { u64::BITS - (n as u64 - 1).leading_zeros() }
            }
            TyKind::SignedWord(w) | TyKind::UnsignedWord(w) => w,
            k => panic!("size_in_bits on type {k:?} with no finite encoding"),
        }
    }
}

impl fmt::Display for Ty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TyKind::NoType => f.write_str("no-type"),
            TyKind::Statement => f.write_str("statement"),
            TyKind::Boolean => f.write_str("boolean"),
            TyKind::Enum(category, values) => {
                if values.is_empty() {
                    match category {
                        EnumCategory::PureInt => f.write_str("integer enum"),
                        EnumCategory::PureSymbolic => f.write_str("symbolic enum"),
                        EnumCategory::IntSymbolic => f.write_str("integer-and-symbolic enum"),
                    }
                } else {
                    f.write_str("{")?;
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{value}")?;
                    }
                    f.write_str("}")
                }
            }
            TyKind::Integer => f.write_str("integer"),
            TyKind::Real => f.write_str("real"),
            TyKind::SignedWord(w) => write!(f, "signed word[{w}]"),
            TyKind::UnsignedWord(w) => write!(f, "unsigned word[{w}]"),
            TyKind::WordArray(aw, vw) => write!(f, "array word[{aw}] of word[{vw}]"),
            TyKind::Array(sub, lo, hi) => write!(f, "array {lo}..{hi} of {sub}"),
            TyKind::String => f.write_str("string"),
            TyKind::SetBool => f.write_str("boolean set"),
            TyKind::SetInt => f.write_str("integer set"),
            TyKind::SetSymb => f.write_str("symbolic set"),
            TyKind::SetIntSymb => f.write_str("integer-symbolic set"),
            TyKind::Error => f.write_str("error"),
        }
    }
}

/// Pre-interned singletons for the payload-free types.
struct CommonTypes<'a> {
    no_type: Ty<'a>,
    statement: Ty<'a>,
    boolean: Ty<'a>,
    integer: Ty<'a>,
    real: Ty<'a>,
    string: Ty<'a>,
    set_bool: Ty<'a>,
    set_int: Ty<'a>,
    set_symb: Ty<'a>,
    set_int_symb: Ty<'a>,
    error: Ty<'a>,
    pure_symbolic_enum: Ty<'a>,
    int_symbolic_enum: Ty<'a>,
}

/// The type interner: builds canonical [`Ty`]s inside a borrowed [`Arena`].
///
/// Interned types live as long as the arena; a [`crate::SymbTable`] borrows
/// the context and never outlives them.
pub struct TypeCtx<'a> {
    arena: &'a Arena,
    types: InternSet<&'a TyKind<'a>>,
    common: CommonTypes<'a>,
}

impl<'a> TypeCtx<'a> {
    /// Creates a type interner over `arena`.
    pub fn new(arena: &'a Arena) -> Self {
        let types = InternSet::default();
        let mk = |kind| {
            Ty(Interned::new_unchecked(types.map_insert_ref(
                &kind,
                |kind| &*arena.alloc(*kind),
                |_| (),
                |ty, _| *ty,
            )))
        };
        let common = CommonTypes {
            no_type: mk(TyKind::NoType),
            statement: mk(TyKind::Statement),
            boolean: mk(TyKind::Boolean),
            integer: mk(TyKind::Integer),
            real: mk(TyKind::Real),
            string: mk(TyKind::String),
            set_bool: mk(TyKind::SetBool),
            set_int: mk(TyKind::SetInt),
            set_symb: mk(TyKind::SetSymb),
            set_int_symb: mk(TyKind::SetIntSymb),
            error: mk(TyKind::Error),
            pure_symbolic_enum: mk(TyKind::Enum(EnumCategory::PureSymbolic, &[])),
            int_symbolic_enum: mk(TyKind::Enum(EnumCategory::IntSymbolic, &[])),
        };
        Self { arena, types, common }
    }

    fn intern(&self, kind: TyKind<'a>) -> Ty<'a> {
        Ty(Interned::new_unchecked(self.types.map_insert_ref(
            &kind,
            |kind| &*self.arena.alloc(*kind),
            |_| (),
            |ty, _| *ty,
        )))
    }

    // ---------------- singletons ----------------

    pub fn no_type(&self) -> Ty<'a> {
        self.common.no_type
    }

    pub fn statement(&self) -> Ty<'a> {
        self.common.statement
    }

    pub fn boolean(&self) -> Ty<'a> {
        self.common.boolean
    }

    pub fn integer(&self) -> Ty<'a> {
        self.common.integer
    }

    pub fn real(&self) -> Ty<'a> {
        self.common.real
    }

    pub fn string(&self) -> Ty<'a> {
        self.common.string
    }

    pub fn set_bool(&self) -> Ty<'a> {
        self.common.set_bool
    }

    pub fn set_int(&self) -> Ty<'a> {
        self.common.set_int
    }

    pub fn set_symb(&self) -> Ty<'a> {
        self.common.set_symb
    }

    pub fn set_int_symb(&self) -> Ty<'a> {
        self.common.set_int_symb
    }

    pub fn error(&self) -> Ty<'a> {
        self.common.error
    }

    /// The abstract enum of symbolic constants; what inference assigns to
    /// symbolic-enum-typed expressions and to constants.
    pub fn pure_symbolic_enum(&self) -> Ty<'a> {
        self.common.pure_symbolic_enum
    }

    /// The abstract enum mixing integers and symbolic constants.
    pub fn int_symbolic_enum(&self) -> Ty<'a> {
        self.common.int_symbolic_enum
    }

    // ---------------- constructors ----------------

    /// The unsigned word type of the given width.
    ///
    /// Out-of-range widths are representable so that declared types can be
    /// interned before validation; the checker's well-formedness pass
    /// rejects them.
    pub fn unsigned_word(&self, width: u32) -> Ty<'a> {
        self.intern(TyKind::UnsignedWord(width))
    }

    /// The signed word type of the given width.
    pub fn signed_word(&self, width: u32) -> Ty<'a> {
        self.intern(TyKind::SignedWord(width))
    }

    /// The word-array type with the given address and value widths.
    pub fn wordarray(&self, awidth: u32, vwidth: u32) -> Ty<'a> {
        self.intern(TyKind::WordArray(awidth, vwidth))
    }

    /// The array type `array lower..upper of subtype`.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    pub fn array(&self, subtype: Ty<'a>, lower: i64, upper: i64) -> Ty<'a> {
        assert!(lower <= upper, "array bounds {lower}..{upper} are inverted");
        self.intern(TyKind::Array(subtype, lower, upper))
    }

    /// The enum type over `values`, categorised by their contents.
    /// Duplicates are kept so well-formedness checking can report them.
    pub fn enum_type(&self, values: &[Node<'a>]) -> Ty<'a> {
        let ints = values.iter().any(|v| v.op() == smv_ast::Op::Number);
        let symbs = values.iter().any(|v| v.op() != smv_ast::Op::Number);
        let category = match (ints, symbs) {
            (true, false) => EnumCategory::PureInt,
            (false, _) => EnumCategory::PureSymbolic,
            (true, true) => EnumCategory::IntSymbolic,
        };
        self.intern(TyKind::Enum(category, self.arena.alloc_slice(values)))
    }

    /// Collapses a type to its abstract counterpart: concrete enums become
    /// the category singleton, and a pure-integer enum becomes `integer`
    /// outright. Arrays normalise their subtype; everything else is already
    /// canonical.
    ///
    /// This is what inference stores, so all returned types compare by
    /// pointer.
    pub fn normalize(&self, ty: Ty<'a>) -> Ty<'a> {
        match ty.kind() {
            TyKind::Enum(EnumCategory::PureInt, _) => self.integer(),
            TyKind::Enum(EnumCategory::PureSymbolic, _) => self.pure_symbolic_enum(),
            TyKind::Enum(EnumCategory::IntSymbolic, _) => self.int_symbolic_enum(),
            TyKind::Array(sub, lo, hi) => self.array(self.normalize(sub), lo, hi),
            _ => ty,
        }
    }
}

/// Whether `width` is a representable word width.
pub fn valid_word_width(width: u32) -> bool {
    (1..=MAX_WORD_WIDTH).contains(&width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smv_ast::Ast;

    #[test]
    fn interning_is_canonical() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        assert_eq!(tcx.boolean(), tcx.boolean());
        assert_eq!(tcx.unsigned_word(4), tcx.unsigned_word(4));
        assert_ne!(tcx.unsigned_word(4), tcx.unsigned_word(5));
        assert_ne!(tcx.unsigned_word(4), tcx.signed_word(4));
        let a1 = tcx.array(tcx.boolean(), 0, 3);
        let a2 = tcx.array(tcx.boolean(), 0, 3);
        assert_eq!(a1, a2);
        assert_ne!(a1, tcx.array(tcx.boolean(), 0, 2));
    }

    #[test]
    fn enum_categories() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        let symbolic = tcx.enum_type(&[ast.atom("a"), ast.atom("b")]);
        assert!(symbolic.is_pure_symbolic_enum());
        let ints = tcx.enum_type(&[ast.number(0), ast.number(1)]);
        assert!(ints.is_pure_int_enum());
        let mixed = tcx.enum_type(&[ast.number(0), ast.atom("ok")]);
        assert!(mixed.is_int_symbolic_enum());

        assert_eq!(tcx.normalize(symbolic), tcx.pure_symbolic_enum());
        assert_eq!(tcx.normalize(ints), tcx.integer());
        assert_eq!(tcx.normalize(mixed), tcx.int_symbolic_enum());
    }

    #[test]
    fn sizes() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        assert_eq!(tcx.boolean().size_in_bits(), 1);
        assert_eq!(tcx.unsigned_word(7).size_in_bits(), 7);
        let one = tcx.enum_type(&[ast.atom("only")]);
        assert_eq!(one.size_in_bits(), 1);
        let five = tcx.enum_type(&[
            ast.atom("a"),
            ast.atom("b"),
            ast.atom("c"),
            ast.atom("d"),
            ast.atom("e"),
        ]);
        assert_eq!(five.size_in_bits(), 3);
        let four = tcx.enum_type(&[ast.atom("a"), ast.atom("b"), ast.atom("c"), ast.atom("d")]);
        assert_eq!(four.size_in_bits(), 2);
    }

    #[test]
    fn display() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let tcx = TypeCtx::new(&arena);
        assert_eq!(tcx.unsigned_word(4).to_string(), "unsigned word[4]");
        assert_eq!(tcx.signed_word(2).to_string(), "signed word[2]");
        assert_eq!(tcx.wordarray(3, 5).to_string(), "array word[3] of word[5]");
        assert_eq!(tcx.array(tcx.boolean(), 0, 3).to_string(), "array 0..3 of boolean");
        let e = tcx.enum_type(&[ast.atom("a"), ast.number(2)]);
        assert_eq!(e.to_string(), "{a, 2}");
    }

    #[test]
    fn single_cell_array() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        let a = tcx.array(tcx.boolean(), 0, 0);
        let (lo, hi) = a.array_bounds();
        assert_eq!(hi - lo + 1, 1);
        assert_eq!(a.array_subtype(), tcx.boolean());
    }

    #[test]
    fn out_of_range_widths_are_representable() {
        let arena = Arena::new();
        let tcx = TypeCtx::new(&arena);
        // Validation is the well-formedness pass's job.
        let wide = tcx.unsigned_word(MAX_WORD_WIDTH + 1);
        assert!(!valid_word_width(wide.word_width()));
    }
}
