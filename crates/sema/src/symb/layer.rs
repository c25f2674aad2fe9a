use super::{SymbolCounters, SymbolKind};
use smv_ast::Node;
use smv_data_structures::map::FxHashMap;

/// Where a new layer lands in the table's layer stack.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum InsertPolicy {
    /// Same as `Bottom`.
    #[default]
    Default,
    /// Above every layer except a `ForceTop` one.
    Top,
    /// Below every layer except a `ForceBottom` one.
    Bottom,
    /// Always first. At most one layer per table may use this.
    ForceTop,
    /// Always last. At most one layer per table may use this.
    ForceBottom,
}

impl InsertPolicy {
    fn effective(self) -> Self {
        match self {
            Self::Default => Self::Bottom,
            other => other,
        }
    }
}

/// Boolean-variable counts, kept next to the per-kind counters so encoders
/// can size boolean state without walking the layer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct BoolVarCounters {
    pub state: usize,
    pub frozen: usize,
    pub input: usize,
}

/// A named, insertion-ordered bundle of symbol declarations.
///
/// The layer owns only the *names* declared through it; the records live in
/// the table's shared cache. A layer committed to one or more encoders
/// refuses structural changes until fully uncommitted.
pub struct SymbLayer<'a> {
    name: String,
    policy: InsertPolicy,
    committed: u32,
    symbols: Vec<Option<Node<'a>>>,
    index: FxHashMap<Node<'a>, u32>,
    counters: SymbolCounters,
    bool_counters: BoolVarCounters,
}

impl<'a> SymbLayer<'a> {
    pub(crate) fn new(name: String, policy: InsertPolicy) -> Self {
        debug!(layer = %name, ?policy, "created layer");
        Self {
            name,
            policy,
            committed: 0,
            symbols: Vec::new(),
            index: FxHashMap::default(),
            counters: SymbolCounters::default(),
            bool_counters: BoolVarCounters::default(),
        }
    }

    /// The layer's name, unique within its table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared insertion policy.
    pub fn insert_policy(&self) -> InsertPolicy {
        self.policy
    }

    /// How many encoders have committed this layer.
    pub fn commit_count(&self) -> u32 {
        self.committed
    }

    /// Whether any encoder is using this layer.
    pub fn is_committed(&self) -> bool {
        self.committed > 0
    }

    /// Part of the encoder registration protocol: notes one more encoder
    /// using this layer.
    pub fn commit(&mut self) {
        self.committed += 1;
        debug!(layer = %self.name, count = self.committed, "layer committed to encoder");
    }

    /// Releases one encoder's use of this layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer is not committed.
    pub fn uncommit(&mut self) {
        assert!(self.committed > 0, "layer {} is not committed", self.name);
        self.committed -= 1;
        debug!(layer = %self.name, count = self.committed, "layer released by encoder");
    }

    /// Whether `self` must precede `other` in the table, by policy.
    ///
    /// # Panics
    ///
    /// Two layers sharing a forced policy are a programming error.
    pub fn must_insert_before(&self, other: &Self) -> bool {
        let p1 = self.policy.effective();
        let p2 = other.policy.effective();
        assert!(
            p1 != p2 || (p1 != InsertPolicy::ForceTop && p1 != InsertPolicy::ForceBottom),
            "layers {} and {} share the forced policy {p1:?}",
            self.name,
            other.name,
        );
        match p1 {
            InsertPolicy::ForceTop => true,
            InsertPolicy::Top => p2 != InsertPolicy::ForceTop,
            InsertPolicy::Default | InsertPolicy::Bottom => p2 == InsertPolicy::ForceBottom,
            InsertPolicy::ForceBottom => false,
        }
    }

    /// Whether `name` was declared through this layer.
    pub fn contains(&self, name: Node<'a>) -> bool {
        self.index.contains_key(&name)
    }

    /// Iterates the layer's symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Node<'a>> + '_ {
        self.symbols.iter().filter_map(|slot| *slot)
    }

    /// The number of live declarations in the layer.
    pub fn len(&self) -> usize {
        self.counters.total()
    }

    /// Whether the layer declares nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The layer's per-kind counters.
    pub fn counters(&self) -> SymbolCounters {
        self.counters
    }

    /// The layer's boolean-variable counters.
    pub fn bool_counters(&self) -> BoolVarCounters {
        self.bool_counters
    }

    pub fn state_vars_num(&self) -> usize {
        self.counters.state_vars
    }

    pub fn frozen_vars_num(&self) -> usize {
        self.counters.frozen_vars
    }

    pub fn input_vars_num(&self) -> usize {
        self.counters.input_vars
    }

    pub fn constants_num(&self) -> usize {
        self.counters.constants
    }

    pub fn defines_num(&self) -> usize {
        self.counters.defines
    }

    pub fn bool_state_vars_num(&self) -> usize {
        self.bool_counters.state
    }

    pub fn bool_frozen_vars_num(&self) -> usize {
        self.bool_counters.frozen
    }

    pub fn bool_input_vars_num(&self) -> usize {
        self.bool_counters.input
    }

    // ---------------- crate-internal mutation ----------------

    pub(crate) fn add_symbol(&mut self, name: Node<'a>, kind: SymbolKind, is_bool: bool) {
        let position = u32::try_from(self.symbols.len()).expect("layer overflow");
        let prev = self.index.insert(name, position);
        assert!(prev.is_none(), "{name} is already in layer {}", self.name);
        self.symbols.push(Some(name));
        self.counters.add(kind);
        if is_bool {
            self.bump_bool(kind, 1);
        }
    }

    pub(crate) fn remove_symbol(&mut self, name: Node<'a>, kind: SymbolKind, is_bool: bool) {
        let position = self.index.remove(&name).unwrap_or_else(|| {
            panic!("{name} is not in layer {}", self.name);
        });
        debug_assert_eq!(self.symbols[position as usize], Some(name));
        self.symbols[position as usize] = None;
        self.counters.sub(kind);
        if is_bool {
            self.bump_bool(kind, -1);
        }
    }

    pub(crate) fn move_state_to_frozen(&mut self, is_bool: bool) {
        self.counters.sub(SymbolKind::STATE_VAR);
        self.counters.add(SymbolKind::FROZEN_VAR);
        if is_bool {
            self.bool_counters.state -= 1;
            self.bool_counters.frozen += 1;
        }
    }

    fn bump_bool(&mut self, kind: SymbolKind, delta: isize) {
        let slot = match kind {
            SymbolKind::STATE_VAR => &mut self.bool_counters.state,
            SymbolKind::FROZEN_VAR => &mut self.bool_counters.frozen,
            SymbolKind::INPUT_VAR => &mut self.bool_counters.input,
            _ => return,
        };
        *slot = slot.checked_add_signed(delta).expect("boolean counter underflow");
    }

    /// Checks that the counters agree with the live entries; test support.
    pub fn check_invariants(&self) {
        let live = self.symbols.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(self.counters.total(), live, "layer {} counters drifted", self.name);
    }
}
