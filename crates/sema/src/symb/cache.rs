use super::{NFunction, SymbolCounters, SymbolKind, SymbolRecord};
use crate::{symb::SymbTable, ty::Ty};
use smallvec::SmallVec;
use smv_ast::Node;
use smv_data_structures::map::FxHashMap;
use std::{cell::Cell, rc::Rc};

/// When a registered trigger fires.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TriggerEvent {
    /// A symbol was declared.
    Add,
    /// A symbol was removed. The symbol is already gone when the trigger
    /// runs.
    Remove,
    /// A declaration replaced a tombstone left by an earlier removal.
    Redeclare,
}

/// A trigger callback; state travels in the closure's captures.
pub type TriggerFn<'a> = dyn Fn(&SymbCache<'a>, Node<'a>, TriggerEvent) + 'a;

/// A dictionary slot: either a live record or the tombstone a removal left
/// behind, so redeclaration can be told apart from first declaration.
enum Slot<'a> {
    Declared(SymbolInfo<'a>),
    Tombstone,
}

struct SymbolInfo<'a> {
    record: SymbolRecord<'a>,
    /// Index into the dense insertion-order array.
    position: u32,
}

/// The central symbol dictionary shared by all layers of one table.
///
/// Owns every symbol record, keeps a dense append-only array for
/// insertion-ordered iteration (compacted when tombstones dominate), per-kind
/// counters, and the add/remove/redeclare trigger lists.
pub struct SymbCache<'a> {
    symbols: FxHashMap<Node<'a>, Slot<'a>>,
    order: Vec<Option<Node<'a>>>,
    tombstones: usize,
    counters: SymbolCounters,
    add_triggers: Vec<Rc<TriggerFn<'a>>>,
    remove_triggers: Vec<Rc<TriggerFn<'a>>>,
    redeclare_triggers: Vec<Rc<TriggerFn<'a>>>,
}

/// Compaction floor: below this many dense slots the array is left alone.
const ORDER_FLOOR: usize = 16;

impl<'a> SymbCache<'a> {
    pub(crate) fn new() -> Self {
        Self {
            symbols: FxHashMap::default(),
            order: Vec::new(),
            tombstones: 0,
            counters: SymbolCounters::default(),
            add_triggers: Vec::new(),
            remove_triggers: Vec::new(),
            redeclare_triggers: Vec::new(),
        }
    }

    // ---------------- declaration ----------------

    pub(crate) fn new_state_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        self.insert(name, SymbolRecord::StateVar(ty));
    }

    pub(crate) fn new_frozen_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        self.insert(name, SymbolRecord::FrozenVar(ty));
    }

    pub(crate) fn new_input_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        self.insert(name, SymbolRecord::InputVar(ty));
    }

    pub(crate) fn new_variable_array(&mut self, name: Node<'a>, ty: Ty<'a>) {
        self.insert(name, SymbolRecord::VariableArray(ty));
    }

    /// Declares a constant, or bumps its reference count when some other
    /// layer already declared it.
    pub(crate) fn new_constant(&mut self, name: Node<'a>) {
        if let Some(Slot::Declared(info)) = self.symbols.get_mut(&name) {
            match &mut info.record {
                SymbolRecord::Constant(count) => {
                    *count += 1;
                    return;
                }
                record => panic!("{name} is already declared as {:?}", record.kind()),
            }
        }
        self.insert(name, SymbolRecord::Constant(1));
    }

    pub(crate) fn new_define(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, body: Node<'a>) {
        self.insert(name, SymbolRecord::Define { ctx, body, flat: Cell::new(None) });
    }

    pub(crate) fn new_array_define(
        &mut self,
        name: Node<'a>,
        ctx: Option<Node<'a>>,
        body: Node<'a>,
    ) {
        self.insert(name, SymbolRecord::ArrayDefine { ctx, body, flat: Cell::new(None) });
    }

    pub(crate) fn new_parameter(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, actual: Node<'a>) {
        self.insert(name, SymbolRecord::Parameter { ctx, actual, flat: Cell::new(None) });
    }

    pub(crate) fn new_function(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, fun: NFunction<'a>) {
        self.insert(name, SymbolRecord::Function { ctx, fun });
    }

    fn insert(&mut self, name: Node<'a>, record: SymbolRecord<'a>) {
        let kind = record.kind();
        // A redeclared name gets a fresh dense slot; its former one stays a
        // hole until compaction.
        let redeclared = match self.symbols.get(&name) {
            None => false,
            Some(Slot::Tombstone) => true,
            Some(Slot::Declared(info)) => {
                panic!("{name} is already declared as {:?}", info.record.kind())
            }
        };
        let position = u32::try_from(self.order.len()).expect("symbol cache overflow");
        self.order.push(Some(name));
        self.symbols.insert(name, Slot::Declared(SymbolInfo { record, position }));
        self.counters.add(kind);
        trace!(symbol = %name, ?kind, redeclared, "declared symbol");
        self.fire(TriggerEvent::Add, name);
        if redeclared {
            self.fire(TriggerEvent::Redeclare, name);
        }
    }

    // ---------------- removal ----------------

    pub(crate) fn remove_var(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::VAR);
    }

    pub(crate) fn remove_define(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::DEFINE);
    }

    pub(crate) fn remove_array_define(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::ARRAY_DEFINE);
    }

    pub(crate) fn remove_parameter(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::PARAMETER);
    }

    pub(crate) fn remove_variable_array(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::VARIABLE_ARRAY);
    }

    pub(crate) fn remove_function(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::FUNCTION);
    }

    /// Drops one reference to a constant; the symbol disappears when the
    /// last declaring layer lets go.
    pub(crate) fn remove_constant(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::CONSTANT);
    }

    pub(crate) fn remove_symbol(&mut self, name: Node<'a>) {
        self.remove(name, SymbolKind::ANY);
    }

    fn remove(&mut self, name: Node<'a>, expected: SymbolKind) {
        let Some(Slot::Declared(info)) = self.symbols.get_mut(&name) else {
            panic!("{name} is not declared");
        };
        let kind = info.record.kind();
        assert!(expected.contains(kind), "{name} is a {kind:?}, expected {expected:?}");
        if let SymbolRecord::Constant(count) = &mut info.record {
            *count -= 1;
            if *count > 0 {
                return;
            }
        }
        let position = info.position as usize;
        self.symbols.insert(name, Slot::Tombstone);
        debug_assert_eq!(self.order[position], Some(name));
        self.order[position] = None;
        self.tombstones += 1;
        self.counters.sub(kind);
        trace!(symbol = %name, ?kind, "removed symbol");
        self.fire(TriggerEvent::Remove, name);
        self.maybe_compact();
    }

    /// Atomically re-kinds a state variable as frozen. Counters move; the
    /// dense position and the declared type stay.
    pub(crate) fn redeclare_state_as_frozen(&mut self, name: Node<'a>) {
        let Some(Slot::Declared(info)) = self.symbols.get_mut(&name) else {
            panic!("{name} is not declared");
        };
        let SymbolRecord::StateVar(ty) = &info.record else {
            panic!("{name} is not a state variable");
        };
        info.record = SymbolRecord::FrozenVar(*ty);
        self.counters.sub(SymbolKind::STATE_VAR);
        self.counters.add(SymbolKind::FROZEN_VAR);
        debug!(symbol = %name, "redeclared state variable as frozen");
    }

    // ---------------- queries ----------------

    fn info(&self, name: Node<'a>) -> Option<&SymbolInfo<'a>> {
        match self.symbols.get(&name) {
            Some(Slot::Declared(info)) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn record(&self, name: Node<'a>) -> Option<&SymbolRecord<'a>> {
        self.info(name).map(|info| &info.record)
    }

    /// Whether `name` is declared. Tombstoned names are not.
    pub fn is_declared(&self, name: Node<'a>) -> bool {
        self.info(name).is_some()
    }

    /// The kind of `name`, when declared.
    pub fn symbol_kind(&self, name: Node<'a>) -> Option<SymbolKind> {
        self.info(name).map(|info| info.record.kind())
    }

    fn is_kind(&self, name: Node<'a>, mask: SymbolKind) -> bool {
        self.symbol_kind(name).is_some_and(|kind| mask.contains(kind))
    }

    pub fn is_state_var(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::STATE_VAR)
    }

    pub fn is_frozen_var(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::FROZEN_VAR)
    }

    pub fn is_input_var(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::INPUT_VAR)
    }

    /// Whether `name` is a variable of any kind.
    pub fn is_var(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::VAR)
    }

    pub fn is_constant(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::CONSTANT)
    }

    pub fn is_define(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::DEFINE)
    }

    pub fn is_array_define(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::ARRAY_DEFINE)
    }

    pub fn is_parameter(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::PARAMETER)
    }

    pub fn is_variable_array(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::VARIABLE_ARRAY)
    }

    pub fn is_function(&self, name: Node<'a>) -> bool {
        self.is_kind(name, SymbolKind::FUNCTION)
    }

    /// The declared type of a variable.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a variable.
    pub fn get_var_type(&self, name: Node<'a>) -> Ty<'a> {
        match self.record(name) {
            Some(
                SymbolRecord::StateVar(ty)
                | SymbolRecord::FrozenVar(ty)
                | SymbolRecord::InputVar(ty),
            ) => *ty,
            _ => panic!("{name} is not a variable"),
        }
    }

    /// The body of a define.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a define.
    pub fn get_define_body(&self, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::Define { body, .. }) => *body,
            _ => panic!("{name} is not a define"),
        }
    }

    /// The declaration context of a define.
    pub fn get_define_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        match self.record(name) {
            Some(SymbolRecord::Define { ctx, .. }) => *ctx,
            _ => panic!("{name} is not a define"),
        }
    }

    /// The flattened body of a define, computing and memoising it on first
    /// use. The flattener's own cache is independent; this one belongs to
    /// the record and dies with it.
    pub fn get_flatten_define_body(&self, st: &SymbTable<'_, 'a>, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::Define { ctx, body, flat }) => {
                if let Some(cached) = flat.get() {
                    return cached;
                }
                let flattened = st.flattener().flatten(st, *body, *ctx);
                flat.set(Some(flattened));
                flattened
            }
            _ => panic!("{name} is not a define"),
        }
    }

    /// The body of an array define.
    pub fn get_array_define_body(&self, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::ArrayDefine { body, .. }) => *body,
            _ => panic!("{name} is not an array define"),
        }
    }

    /// The declaration context of an array define.
    pub fn get_array_define_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        match self.record(name) {
            Some(SymbolRecord::ArrayDefine { ctx, .. }) => *ctx,
            _ => panic!("{name} is not an array define"),
        }
    }

    /// The flattened body of an array define, memoised like
    /// [`get_flatten_define_body`](Self::get_flatten_define_body).
    pub fn get_flatten_array_define_body(&self, st: &SymbTable<'_, 'a>, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::ArrayDefine { ctx, body, flat }) => {
                if let Some(cached) = flat.get() {
                    return cached;
                }
                let flattened = st.flattener().flatten(st, *body, *ctx);
                flat.set(Some(flattened));
                flattened
            }
            _ => panic!("{name} is not an array define"),
        }
    }

    /// The actual expression a formal parameter is bound to.
    pub fn get_parameter_actual(&self, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::Parameter { actual, .. }) => *actual,
            _ => panic!("{name} is not a parameter"),
        }
    }

    /// The instantiation context of a formal parameter.
    pub fn get_parameter_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        match self.record(name) {
            Some(SymbolRecord::Parameter { ctx, .. }) => *ctx,
            _ => panic!("{name} is not a parameter"),
        }
    }

    /// The flattened actual of a formal parameter, memoised.
    pub fn get_flatten_parameter_actual(&self, st: &SymbTable<'_, 'a>, name: Node<'a>) -> Node<'a> {
        match self.record(name) {
            Some(SymbolRecord::Parameter { ctx, actual, flat }) => {
                if let Some(cached) = flat.get() {
                    return cached;
                }
                let flattened = st.flattener().flatten(st, *actual, *ctx);
                flat.set(Some(flattened));
                flattened
            }
            _ => panic!("{name} is not a parameter"),
        }
    }

    /// The declared type of a variable array.
    pub fn get_variable_array_type(&self, name: Node<'a>) -> Ty<'a> {
        match self.record(name) {
            Some(SymbolRecord::VariableArray(ty)) => *ty,
            _ => panic!("{name} is not a variable array"),
        }
    }

    /// The descriptor of a declared function.
    pub fn get_function(&self, name: Node<'a>) -> &NFunction<'a> {
        match self.record(name) {
            Some(SymbolRecord::Function { fun, .. }) => fun,
            _ => panic!("{name} is not a function"),
        }
    }

    /// The declaration context of a function.
    pub fn get_function_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        match self.record(name) {
            Some(SymbolRecord::Function { ctx, .. }) => *ctx,
            _ => panic!("{name} is not a function"),
        }
    }

    // ---------------- counters ----------------

    /// The cache-wide per-kind counters.
    pub fn counters(&self) -> SymbolCounters {
        self.counters
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

    pub fn array_defines_num(&self) -> usize {
        self.counters.array_defines
    }

    pub fn parameters_num(&self) -> usize {
        self.counters.parameters
    }

    pub fn variable_arrays_num(&self) -> usize {
        self.counters.variable_arrays
    }

    pub fn functions_num(&self) -> usize {
        self.counters.functions
    }

    // ---------------- iteration ----------------

    /// Iterates the declared symbols matching `mask`, in insertion order.
    pub fn iter(&self, mask: SymbolKind) -> impl Iterator<Item = Node<'a>> + '_ {
        self.order
            .iter()
            .filter_map(move |slot| slot.filter(|&name| self.is_kind(name, mask)))
    }

    /// Like [`iter`](Self::iter) with an additional predicate on the name.
    pub fn iter_filtered<'s, F>(
        &'s self,
        mask: SymbolKind,
        pred: F,
    ) -> impl Iterator<Item = Node<'a>> + 's
    where
        F: Fn(Node<'a>) -> bool + 's,
    {
        self.iter(mask).filter(move |&name| pred(name))
    }

    // ---------------- triggers ----------------

    /// Registers `trigger` for `event`. Triggers run synchronously at the
    /// end of the mutating call, in registration order.
    pub fn add_trigger(&mut self, event: TriggerEvent, trigger: Rc<TriggerFn<'a>>) {
        self.trigger_list(event).push(trigger);
    }

    /// Unregisters a trigger previously added for `event`, by identity.
    pub fn remove_trigger(&mut self, event: TriggerEvent, trigger: &Rc<TriggerFn<'a>>) {
        self.trigger_list(event).retain(|t| !Rc::ptr_eq(t, trigger));
    }

    fn trigger_list(&mut self, event: TriggerEvent) -> &mut Vec<Rc<TriggerFn<'a>>> {
        match event {
            TriggerEvent::Add => &mut self.add_triggers,
            TriggerEvent::Remove => &mut self.remove_triggers,
            TriggerEvent::Redeclare => &mut self.redeclare_triggers,
        }
    }

    fn fire(&self, event: TriggerEvent, name: Node<'a>) {
        let list = match event {
            TriggerEvent::Add => &self.add_triggers,
            TriggerEvent::Remove => &self.remove_triggers,
            TriggerEvent::Redeclare => &self.redeclare_triggers,
        };
        if list.is_empty() {
            return;
        }
        // Clone the list so handlers can observe the cache without aliasing
        // the registration storage.
        let snapshot: SmallVec<[Rc<TriggerFn<'a>>; 4]> = list.iter().cloned().collect();
        for trigger in snapshot {
            trigger(self, name, event);
        }
    }

    // ---------------- dense-array maintenance ----------------

    fn maybe_compact(&mut self) {
        let len = self.order.len();
        if len <= ORDER_FLOOR || (self.tombstones as f64) / (len as f64) <= 0.75 {
            return;
        }
        debug!(tombstones = self.tombstones, capacity = len, "compacting symbol order array");
        let mut compacted = Vec::with_capacity(len - self.tombstones);
        for slot in self.order.drain(..) {
            let Some(name) = slot else { continue };
            let position = u32::try_from(compacted.len()).unwrap();
            compacted.push(Some(name));
            match self.symbols.get_mut(&name) {
                Some(Slot::Declared(info)) => info.position = position,
                _ => unreachable!("dense array holds an undeclared name"),
            }
        }
        self.order = compacted;
        self.tombstones = 0;
    }

    /// Checks the structural invariants; test support.
    ///
    /// For every declared name, exactly one kind counter counts it, its
    /// position indexes the dense array, and that slot holds the name; the
    /// counter total equals the dense length minus the tombstones.
    pub fn check_invariants(&self) {
        let mut recount = SymbolCounters::default();
        for (name, slot) in &self.symbols {
            let Slot::Declared(info) = slot else { continue };
            recount.add(info.record.kind());
            assert_eq!(
                self.order.get(info.position as usize).copied().flatten(),
                Some(*name),
                "dense slot of {name} does not hold it"
            );
        }
        assert_eq!(recount, self.counters, "counters disagree with records");
        let live = self.order.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(self.counters.total(), live, "counter total disagrees with dense array");
        assert_eq!(self.order.len() - live, self.tombstones, "tombstone count drifted");
    }
}
