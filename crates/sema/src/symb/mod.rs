//! The layered symbol registry: one central [`SymbCache`] holding every
//! record, [`SymbLayer`]s owning the names declared through them, and the
//! [`SymbTable`] facade tying both to the type checker.

use crate::ty::Ty;
use smv_ast::Node;
use std::cell::Cell;

mod cache;
pub use cache::{SymbCache, TriggerEvent, TriggerFn};

mod function;
pub use function::NFunction;

mod layer;
pub use layer::{BoolVarCounters, InsertPolicy, SymbLayer};

mod table;
pub use table::{LayerMut, LayerRef, SymbTable};

bitflags::bitflags! {
    /// The mutually exclusive kinds a declared symbol can have, as a mask
    /// for filtered iteration.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct SymbolKind: u16 {
        const STATE_VAR = 1 << 0;
        const FROZEN_VAR = 1 << 1;
        const INPUT_VAR = 1 << 2;
        const VARIABLE_ARRAY = 1 << 3;
        const CONSTANT = 1 << 4;
        const DEFINE = 1 << 5;
        const ARRAY_DEFINE = 1 << 6;
        const PARAMETER = 1 << 7;
        const FUNCTION = 1 << 8;

        /// Any of the three variable kinds.
        const VAR = Self::STATE_VAR.bits() | Self::FROZEN_VAR.bits() | Self::INPUT_VAR.bits();
        /// Every kind.
        const ANY = u16::MAX >> 7;
    }
}

/// What the cache knows about one declared symbol.
#[derive(Clone, Debug)]
pub(crate) enum SymbolRecord<'a> {
    StateVar(Ty<'a>),
    FrozenVar(Ty<'a>),
    InputVar(Ty<'a>),
    VariableArray(Ty<'a>),
    /// Constants are the only symbol kind shared across layers; the count
    /// tracks how many declarations are alive.
    Constant(u32),
    Define {
        ctx: Option<Node<'a>>,
        body: Node<'a>,
        flat: Cell<Option<Node<'a>>>,
    },
    ArrayDefine {
        ctx: Option<Node<'a>>,
        body: Node<'a>,
        flat: Cell<Option<Node<'a>>>,
    },
    Parameter {
        ctx: Option<Node<'a>>,
        actual: Node<'a>,
        flat: Cell<Option<Node<'a>>>,
    },
    Function {
        ctx: Option<Node<'a>>,
        fun: NFunction<'a>,
    },
}

impl SymbolRecord<'_> {
    pub(crate) fn kind(&self) -> SymbolKind {
        match self {
            Self::StateVar(_) => SymbolKind::STATE_VAR,
            Self::FrozenVar(_) => SymbolKind::FROZEN_VAR,
            Self::InputVar(_) => SymbolKind::INPUT_VAR,
            Self::VariableArray(_) => SymbolKind::VARIABLE_ARRAY,
            Self::Constant(_) => SymbolKind::CONSTANT,
            Self::Define { .. } => SymbolKind::DEFINE,
            Self::ArrayDefine { .. } => SymbolKind::ARRAY_DEFINE,
            Self::Parameter { .. } => SymbolKind::PARAMETER,
            Self::Function { .. } => SymbolKind::FUNCTION,
        }
    }
}

/// Per-kind declaration counters, kept by the cache globally and by each
/// layer for its own symbols.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SymbolCounters {
    pub state_vars: usize,
    pub frozen_vars: usize,
    pub input_vars: usize,
    pub variable_arrays: usize,
    pub constants: usize,
    pub defines: usize,
    pub array_defines: usize,
    pub parameters: usize,
    pub functions: usize,
}

impl SymbolCounters {
    pub(crate) fn add(&mut self, kind: SymbolKind) {
        *self.slot(kind) += 1;
    }

    pub(crate) fn sub(&mut self, kind: SymbolKind) {
        let slot = self.slot(kind);
        debug_assert!(*slot > 0, "counter underflow for {kind:?}");
        *slot -= 1;
    }

    fn slot(&mut self, kind: SymbolKind) -> &mut usize {
        match kind {
            SymbolKind::STATE_VAR => &mut self.state_vars,
            SymbolKind::FROZEN_VAR => &mut self.frozen_vars,
            SymbolKind::INPUT_VAR => &mut self.input_vars,
            SymbolKind::VARIABLE_ARRAY => &mut self.variable_arrays,
            SymbolKind::CONSTANT => &mut self.constants,
            SymbolKind::DEFINE => &mut self.defines,
            SymbolKind::ARRAY_DEFINE => &mut self.array_defines,
            SymbolKind::PARAMETER => &mut self.parameters,
            SymbolKind::FUNCTION => &mut self.functions,
            _ => panic!("not a single symbol kind: {kind:?}"),
        }
    }

    /// The total number of declared symbols.
    pub fn total(&self) -> usize {
        self.state_vars
            + self.frozen_vars
            + self.input_vars
            + self.variable_arrays
            + self.constants
            + self.defines
            + self.array_defines
            + self.parameters
            + self.functions
    }

    /// The number of variables of any kind.
    pub fn vars(&self) -> usize {
        self.state_vars + self.frozen_vars + self.input_vars
    }
}
