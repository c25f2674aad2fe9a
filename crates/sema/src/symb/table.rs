use super::{
    InsertPolicy, NFunction, SymbCache, SymbLayer, SymbolKind, TriggerEvent, TriggerFn,
};
use crate::{
    flatten::{ContextFlattener, Flatten},
    ty::{Ty, TypeCtx},
    typeck::TypeChecker,
};
use smv_ast::{Ast, Node};
use smv_data_structures::map::{FxHashMap, FxIndexMap};
use smv_interface::Session;
use std::{cell::RefCell, rc::Rc};

/// The symbol table: an ordered stack of [`SymbLayer`]s over one shared
/// [`SymbCache`], together with the type checker bound to it and the
/// name-resolution and flattening services.
pub struct SymbTable<'r, 'a>
where
    'r: 'a,
{
    ast: &'r Ast<'a>,
    tcx: &'r TypeCtx<'a>,
    sess: &'r Session,
    pub(crate) cache: SymbCache<'a>,
    layers: Vec<SymbLayer<'a>>,
    classes: FxIndexMap<String, Vec<String>>,
    default_class: Option<String>,
    checker: TypeChecker<'a>,
    flattener: Box<dyn Flatten<'a> + 'a>,
    /// Temporary defines visible to resolution but not declared in any
    /// layer; the PSL `forall` checker binds its iteration variable here.
    scoped_defines: RefCell<FxHashMap<Node<'a>, (Option<Node<'a>>, Node<'a>)>>,
    anon_layers: u32,
}

impl<'r, 'a> SymbTable<'r, 'a> {
    /// Creates an empty table. The checker is created along with it and
    /// installs the redeclare trigger that invalidates its memo.
    pub fn new(ast: &'r Ast<'a>, tcx: &'r TypeCtx<'a>, sess: &'r Session) -> Self {
        let mut cache = SymbCache::new();
        let checker = TypeChecker::new(tcx, sess);
        let memo = checker.memo_handle();
        cache.add_trigger(
            TriggerEvent::Redeclare,
            Rc::new(move |_, _, _| memo.borrow_mut().clear()),
        );
        Self {
            ast,
            tcx,
            sess,
            cache,
            layers: Vec::new(),
            classes: FxIndexMap::default(),
            default_class: None,
            checker,
            flattener: Box::new(ContextFlattener),
            scoped_defines: RefCell::new(FxHashMap::default()),
            anon_layers: 0,
        }
    }

    /// Replaces the flattening service.
    pub fn with_flattener(mut self, flattener: Box<dyn Flatten<'a> + 'a>) -> Self {
        self.flattener = flattener;
        self
    }

    pub fn ast(&self) -> &'r Ast<'a> {
        self.ast
    }

    pub fn tcx(&self) -> &'r TypeCtx<'a> {
        self.tcx
    }

    pub fn sess(&self) -> &'r Session {
        self.sess
    }

    pub(crate) fn flattener(&self) -> &dyn Flatten<'a> {
        &*self.flattener
    }

    /// The shared symbol cache.
    pub fn cache(&self) -> &SymbCache<'a> {
        &self.cache
    }

    /// The type checker bound to this table.
    pub fn type_checker(&self) -> &TypeChecker<'a> {
        &self.checker
    }

    // ---------------- layers ----------------

    /// Creates a layer and inserts it by `policy`; see
    /// [`SymbLayer::must_insert_before`]. Without a name, a unique
    /// temporary name is generated. Returns the layer's name.
    pub fn create_layer(&mut self, name: Option<&str>, policy: InsertPolicy) -> String {
        let name = match name {
            Some(name) => name.to_owned(),
            None => {
                self.anon_layers += 1;
                format!("#temp_layer_{}", self.anon_layers)
            }
        };
        assert!(!self.has_layer(&name), "layer {name} already exists");
        let layer = SymbLayer::new(name.clone(), policy);
        let position = self
            .layers
            .iter()
            .position(|existing| layer.must_insert_before(existing))
            .unwrap_or(self.layers.len());
        self.layers.insert(position, layer);
        name
    }

    /// Removes a layer, removing its symbols from the cache.
    ///
    /// # Panics
    ///
    /// Panics if the layer does not exist or is still committed to an
    /// encoder.
    pub fn remove_layer(&mut self, name: &str) {
        let position = self
            .layers
            .iter()
            .position(|layer| layer.name() == name)
            .unwrap_or_else(|| panic!("no layer named {name}"));
        assert!(
            !self.layers[position].is_committed(),
            "cannot remove layer {name} while committed to an encoder"
        );
        let symbols: Vec<_> = self.layers[position].iter().collect();
        for symbol in symbols {
            self.cache.remove_symbol(symbol);
        }
        self.layers.remove(position);
        for layers in self.classes.values_mut() {
            layers.retain(|layer| layer != name);
        }
        debug!(layer = %name, "removed layer");
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    /// The layer names in stack order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(SymbLayer::name)
    }

    /// The layers in stack order.
    pub fn layers(&self) -> impl Iterator<Item = &SymbLayer<'a>> {
        self.layers.iter()
    }

    /// A read view of a layer paired with the cache.
    pub fn layer(&self, name: &str) -> Option<LayerRef<'_, 'a>> {
        let layer = self.layers.iter().find(|layer| layer.name() == name)?;
        Some(LayerRef { layer, cache: &self.cache })
    }

    /// A declaration view of a layer paired with the cache.
    ///
    /// # Panics
    ///
    /// Panics if the layer does not exist.
    pub fn layer_mut(&mut self, name: &str) -> LayerMut<'_, 'a> {
        let position = self
            .layers
            .iter()
            .position(|layer| layer.name() == name)
            .unwrap_or_else(|| panic!("no layer named {name}"));
        LayerMut { layer: &mut self.layers[position], cache: &mut self.cache }
    }

    // ---------------- layer classes ----------------

    /// Declares a (possibly empty) class of layers.
    pub fn create_layer_class(&mut self, class: &str) {
        self.classes.entry(class.to_owned()).or_default();
    }

    /// Adds a layer name to a class, creating the class on first use.
    /// Without a class name, the default class is used.
    ///
    /// # Panics
    ///
    /// Panics if no class is given and no default class is set.
    pub fn add_layer_to_class(&mut self, layer: &str, class: Option<&str>) {
        let class = class
            .or(self.default_class.as_deref())
            .expect("no class given and no default layer class set")
            .to_owned();
        let layers = self.classes.entry(class).or_default();
        if !layers.iter().any(|name| name == layer) {
            layers.push(layer.to_owned());
        }
    }

    /// The layer names of a class, in insertion order.
    pub fn layer_class(&self, class: &str) -> &[String] {
        self.classes.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sets the class encoders use when none is named.
    pub fn set_default_layer_class(&mut self, class: &str) {
        self.create_layer_class(class);
        self.default_class = Some(class.to_owned());
    }

    pub fn default_layer_class(&self) -> Option<&str> {
        self.default_class.as_deref()
    }

    // ---------------- commit protocol ----------------

    /// Part of the encoder registration protocol.
    pub fn commit_layer(&mut self, name: &str) {
        self.layer_mut(name).layer.commit();
    }

    /// Part of the encoder registration protocol.
    pub fn uncommit_layer(&mut self, name: &str) {
        self.layer_mut(name).layer.uncommit();
    }

    // ---------------- triggers ----------------

    /// Registers a cache trigger; see [`SymbCache::add_trigger`].
    pub fn add_trigger(&mut self, event: TriggerEvent, trigger: Rc<TriggerFn<'a>>) {
        self.cache.add_trigger(event, trigger);
    }

    /// Unregisters a cache trigger by identity.
    pub fn remove_trigger(&mut self, event: TriggerEvent, trigger: &Rc<TriggerFn<'a>>) {
        self.cache.remove_trigger(event, trigger);
    }

    // ---------------- symbol queries (cache delegation) ----------------

    pub fn is_symbol_declared(&self, name: Node<'a>) -> bool {
        self.cache.is_declared(name) || self.scoped_define(name).is_some()
    }

    pub fn is_state_var(&self, name: Node<'a>) -> bool {
        self.cache.is_state_var(name)
    }

    pub fn is_frozen_var(&self, name: Node<'a>) -> bool {
        self.cache.is_frozen_var(name)
    }

    pub fn is_input_var(&self, name: Node<'a>) -> bool {
        self.cache.is_input_var(name)
    }

    pub fn is_var(&self, name: Node<'a>) -> bool {
        self.cache.is_var(name)
    }

    pub fn is_constant(&self, name: Node<'a>) -> bool {
        self.cache.is_constant(name)
    }

    pub fn is_define(&self, name: Node<'a>) -> bool {
        self.scoped_define(name).is_some() || self.cache.is_define(name)
    }

    pub fn is_array_define(&self, name: Node<'a>) -> bool {
        self.cache.is_array_define(name)
    }

    pub fn is_parameter(&self, name: Node<'a>) -> bool {
        self.cache.is_parameter(name)
    }

    pub fn is_variable_array(&self, name: Node<'a>) -> bool {
        self.cache.is_variable_array(name)
    }

    pub fn is_function(&self, name: Node<'a>) -> bool {
        self.cache.is_function(name)
    }

    pub fn var_type(&self, name: Node<'a>) -> Ty<'a> {
        self.cache.get_var_type(name)
    }

    /// The body of a define; scoped defines shadow declared ones.
    pub fn define_body(&self, name: Node<'a>) -> Node<'a> {
        match self.scoped_define(name) {
            Some((_, body)) => body,
            None => self.cache.get_define_body(name),
        }
    }

    /// The declaration context of a define.
    pub fn define_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        match self.scoped_define(name) {
            Some((ctx, _)) => ctx,
            None => self.cache.get_define_context(name),
        }
    }

    /// The flattened body of a define, memoised in its record.
    pub fn flatten_define_body(&self, name: Node<'a>) -> Node<'a> {
        match self.scoped_define(name) {
            Some((ctx, body)) => self.flattener.flatten(self, body, ctx),
            None => self.cache.get_flatten_define_body(self, name),
        }
    }

    pub fn array_define_body(&self, name: Node<'a>) -> Node<'a> {
        self.cache.get_array_define_body(name)
    }

    pub fn array_define_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        self.cache.get_array_define_context(name)
    }

    pub fn parameter_actual(&self, name: Node<'a>) -> Node<'a> {
        self.cache.get_parameter_actual(name)
    }

    pub fn parameter_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        self.cache.get_parameter_context(name)
    }

    /// The flattened actual of a formal parameter, memoised in its record.
    pub fn flatten_parameter_actual(&self, name: Node<'a>) -> Node<'a> {
        self.cache.get_flatten_parameter_actual(self, name)
    }

    pub fn variable_array_type(&self, name: Node<'a>) -> Ty<'a> {
        self.cache.get_variable_array_type(name)
    }

    pub fn function(&self, name: Node<'a>) -> &NFunction<'a> {
        self.cache.get_function(name)
    }

    pub fn function_context(&self, name: Node<'a>) -> Option<Node<'a>> {
        self.cache.get_function_context(name)
    }

    /// Iterates declared symbols matching `mask` in insertion order.
    pub fn iter_symbols(&self, mask: SymbolKind) -> impl Iterator<Item = Node<'a>> + '_ {
        self.cache.iter(mask)
    }

    // ---------------- type checking (checker delegation) ----------------

    /// Infers and memoises the type of `expr` under `ctx`.
    pub fn expr_type(&self, expr: Node<'a>, ctx: Option<Node<'a>>) -> Ty<'a> {
        self.checker.expr_type(self, expr, ctx)
    }

    /// Whether `expr` type-checks under `ctx`.
    pub fn expr_is_well_formed(&self, expr: Node<'a>, ctx: Option<Node<'a>>) -> bool {
        self.checker.expr_is_well_formed(self, expr, ctx)
    }

    /// Type-checks every declaration of a layer; see
    /// [`TypeChecker::check_layer`].
    pub fn check_layer(&self, layer: &str) -> bool {
        self.checker.check_layer(self, layer)
    }

    // ---------------- scoped defines ----------------

    pub(crate) fn scoped_define(&self, name: Node<'a>) -> Option<(Option<Node<'a>>, Node<'a>)> {
        self.scoped_defines.borrow().get(&name).copied()
    }

    /// Binds a temporary define visible to resolution only. Returns `false`
    /// when the name is already bound.
    pub(crate) fn push_scoped_define(
        &self,
        name: Node<'a>,
        ctx: Option<Node<'a>>,
        body: Node<'a>,
    ) -> bool {
        let mut scoped = self.scoped_defines.borrow_mut();
        if scoped.contains_key(&name) {
            return false;
        }
        scoped.insert(name, (ctx, body));
        true
    }

    /// Drops a temporary define bound by
    /// [`push_scoped_define`](Self::push_scoped_define).
    pub(crate) fn pop_scoped_define(&self, name: Node<'a>) {
        let removed = self.scoped_defines.borrow_mut().remove(&name);
        debug_assert!(removed.is_some(), "{name} was not scoped");
    }

    /// Checks the cache and layer invariants; test support.
    pub fn check_invariants(&self) {
        self.cache.check_invariants();
        for layer in &self.layers {
            layer.check_invariants();
        }
    }
}

/// A read view pairing a layer with the shared cache, so per-layer
/// iteration can filter by symbol kind.
pub struct LayerRef<'b, 'a> {
    layer: &'b SymbLayer<'a>,
    cache: &'b SymbCache<'a>,
}

impl<'b, 'a> LayerRef<'b, 'a> {
    /// The underlying layer.
    pub fn layer(&self) -> &'b SymbLayer<'a> {
        self.layer
    }

    /// Iterates the layer's symbols of the given kinds, in declaration
    /// order.
    pub fn iter(&self, mask: SymbolKind) -> impl Iterator<Item = Node<'a>> + 'b {
        let cache = self.cache;
        self.layer
            .iter()
            .filter(move |&name| cache.symbol_kind(name).is_some_and(|kind| mask.contains(kind)))
    }
}

/// A declaration view pairing a layer with the shared cache.
///
/// Declaration is always permitted, also on committed layers; removal and
/// re-kinding trap while any encoder holds a commit.
pub struct LayerMut<'b, 'a> {
    pub(crate) layer: &'b mut SymbLayer<'a>,
    cache: &'b mut SymbCache<'a>,
}

impl<'a> LayerMut<'_, 'a> {
    /// The layer's name.
    pub fn name(&self) -> &str {
        self.layer.name()
    }

    // ---------------- preconditions ----------------

    /// Whether `name` can be declared as a variable (or any non-constant
    /// symbol) through this layer.
    pub fn can_declare_var(&self, name: Node<'a>) -> bool {
        !self.cache.is_declared(name) && !self.layer.contains(name)
    }

    /// Constants may be re-declared by other layers, but not twice by the
    /// same one.
    pub fn can_declare_constant(&self, name: Node<'a>) -> bool {
        (!self.cache.is_declared(name) || self.cache.is_constant(name))
            && !self.layer.contains(name)
    }

    pub fn can_declare_define(&self, name: Node<'a>) -> bool {
        self.can_declare_var(name)
    }

    pub fn can_declare_parameter(&self, name: Node<'a>) -> bool {
        self.can_declare_var(name)
    }

    pub fn can_declare_function(&self, name: Node<'a>) -> bool {
        self.can_declare_var(name)
    }

    // ---------------- declaration ----------------

    /// Declares a state variable of the given (interned) type.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken; probe with
    /// [`can_declare_var`](Self::can_declare_var) first.
    pub fn declare_state_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        assert!(self.can_declare_var(name), "cannot declare state variable {name}");
        self.cache.new_state_var(name, ty);
        self.layer.add_symbol(name, SymbolKind::STATE_VAR, ty.is_boolean());
        debug!(layer = %self.layer.name(), %name, %ty, "declared new state variable");
    }

    /// Declares a frozen variable: one that keeps its initial value.
    pub fn declare_frozen_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        assert!(self.can_declare_var(name), "cannot declare frozen variable {name}");
        self.cache.new_frozen_var(name, ty);
        self.layer.add_symbol(name, SymbolKind::FROZEN_VAR, ty.is_boolean());
        debug!(layer = %self.layer.name(), %name, %ty, "declared new frozen variable");
    }

    /// Declares an input variable.
    pub fn declare_input_var(&mut self, name: Node<'a>, ty: Ty<'a>) {
        assert!(self.can_declare_var(name), "cannot declare input variable {name}");
        self.cache.new_input_var(name, ty);
        self.layer.add_symbol(name, SymbolKind::INPUT_VAR, ty.is_boolean());
        debug!(layer = %self.layer.name(), %name, %ty, "declared new input variable");
    }

    /// Declares a variable array of the given (interned) array type.
    pub fn declare_variable_array(&mut self, name: Node<'a>, ty: Ty<'a>) {
        assert!(ty.is_array(), "variable array {name} needs an array type");
        assert!(self.can_declare_var(name), "cannot declare variable array {name}");
        self.cache.new_variable_array(name, ty);
        self.layer.add_symbol(name, SymbolKind::VARIABLE_ARRAY, false);
        debug!(layer = %self.layer.name(), %name, %ty, "declared new variable array");
    }

    /// Declares a constant; the cache reference-counts declarations across
    /// layers.
    pub fn declare_constant(&mut self, name: Node<'a>) {
        assert!(self.can_declare_constant(name), "cannot declare constant {name}");
        self.cache.new_constant(name);
        self.layer.add_symbol(name, SymbolKind::CONSTANT, false);
        debug!(layer = %self.layer.name(), %name, "declared new constant");
    }

    /// Declares a define with its body and declaration context.
    pub fn declare_define(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, body: Node<'a>) {
        assert!(self.can_declare_define(name), "cannot declare define {name}");
        self.cache.new_define(name, ctx, body);
        self.layer.add_symbol(name, SymbolKind::DEFINE, false);
        debug!(layer = %self.layer.name(), %name, "declared new define");
    }

    /// Declares an array define.
    pub fn declare_array_define(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, body: Node<'a>) {
        assert!(self.can_declare_define(name), "cannot declare array define {name}");
        self.cache.new_array_define(name, ctx, body);
        self.layer.add_symbol(name, SymbolKind::ARRAY_DEFINE, false);
        debug!(layer = %self.layer.name(), %name, "declared new array define");
    }

    /// Declares a formal parameter bound to its actual expression.
    pub fn declare_parameter(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, actual: Node<'a>) {
        assert!(self.can_declare_parameter(name), "cannot declare parameter {name}");
        self.cache.new_parameter(name, ctx, actual);
        self.layer.add_symbol(name, SymbolKind::PARAMETER, false);
        debug!(layer = %self.layer.name(), %name, "declared new parameter");
    }

    /// Declares an uninterpreted or interpreted function.
    pub fn declare_function(&mut self, name: Node<'a>, ctx: Option<Node<'a>>, fun: NFunction<'a>) {
        assert!(self.can_declare_function(name), "cannot declare function {name}");
        self.cache.new_function(name, ctx, fun);
        self.layer.add_symbol(name, SymbolKind::FUNCTION, false);
        debug!(layer = %self.layer.name(), %name, "declared new function");
    }

    // ---------------- removal ----------------

    fn assert_removable(&self, name: Node<'a>) {
        assert!(
            !self.layer.is_committed(),
            "cannot remove {name}: layer {} is committed to an encoder",
            self.layer.name()
        );
        assert!(self.layer.contains(name), "{name} is not in layer {}", self.layer.name());
    }

    /// Removes a variable declared through this layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer is committed or does not own `name`.
    pub fn remove_var(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        let kind = self.cache.symbol_kind(name).unwrap_or_else(|| panic!("{name} not declared"));
        assert!(SymbolKind::VAR.contains(kind), "{name} is not a variable");
        let is_bool = self.cache.get_var_type(name).is_boolean();
        self.cache.remove_var(name);
        self.layer.remove_symbol(name, kind, is_bool);
    }

    /// Removes a define declared through this layer.
    pub fn remove_define(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_define(name);
        self.layer.remove_symbol(name, SymbolKind::DEFINE, false);
    }

    /// Removes an array define declared through this layer.
    pub fn remove_array_define(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_array_define(name);
        self.layer.remove_symbol(name, SymbolKind::ARRAY_DEFINE, false);
    }

    /// Drops this layer's declaration of a constant; the symbol survives in
    /// the cache while other layers still declare it.
    pub fn remove_constant(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_constant(name);
        self.layer.remove_symbol(name, SymbolKind::CONSTANT, false);
    }

    /// Removes a formal parameter declared through this layer.
    pub fn remove_parameter(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_parameter(name);
        self.layer.remove_symbol(name, SymbolKind::PARAMETER, false);
    }

    /// Removes a variable array declared through this layer.
    pub fn remove_variable_array(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_variable_array(name);
        self.layer.remove_symbol(name, SymbolKind::VARIABLE_ARRAY, false);
    }

    /// Removes a function declared through this layer.
    pub fn remove_function(&mut self, name: Node<'a>) {
        self.assert_removable(name);
        self.cache.remove_function(name);
        self.layer.remove_symbol(name, SymbolKind::FUNCTION, false);
    }

    /// Atomically re-kinds a state variable as frozen; both the cache and
    /// the layer recount, including the boolean counters.
    pub fn redeclare_state_as_frozen(&mut self, name: Node<'a>) {
        assert!(
            !self.layer.is_committed(),
            "cannot re-kind {name}: layer {} is committed to an encoder",
            self.layer.name()
        );
        assert!(self.layer.contains(name), "{name} is not in layer {}", self.layer.name());
        let is_bool = self.cache.get_var_type(name).is_boolean();
        self.cache.redeclare_state_as_frozen(name);
        self.layer.move_state_to_frozen(is_bool);
    }

    // ---------------- commit protocol ----------------

    /// Part of the encoder registration protocol.
    pub fn commit(&mut self) {
        self.layer.commit();
    }

    /// Part of the encoder registration protocol.
    pub fn uncommit(&mut self) {
        self.layer.uncommit();
    }
}
