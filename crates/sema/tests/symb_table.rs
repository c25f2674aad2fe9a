//! End-to-end checks of the layered symbol registry: commit protocol,
//! triggers, re-kinding, compaction and the ordering-group pipeline.

use smv_ast::{Arena, Ast};
use smv_interface::{Opts, Session};
use smv_parse::ParserOrd;
use smv_sema::{
    InsertPolicy, OrdGroups, SymbTable, SymbolKind, TriggerEvent, TypeCtx,
};
use std::{cell::Cell, rc::Rc};

macro_rules! fixture {
    ($ast:ident, $tcx:ident, $sess:ident, $st:ident) => {
        let arena = Arena::new();
        let $ast = Ast::new(&arena);
        let $tcx = TypeCtx::new(&arena);
        let $sess = Session::with_buffer_emitter(Opts::default());
        #[allow(unused_mut)]
        let mut $st = SymbTable::new(&$ast, &$tcx, &$sess);
    };
}

#[test]
fn redeclare_state_as_frozen_moves_counters() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("M"), InsertPolicy::Default);
    let s = ast.atom("s");
    st.layer_mut("M").declare_state_var(s, tcx.boolean());

    assert_eq!(st.cache().state_vars_num(), 1);
    assert_eq!(st.cache().frozen_vars_num(), 0);
    {
        let view = st.layer("M").unwrap();
        assert_eq!(view.layer().state_vars_num(), 1);
        assert_eq!(view.layer().bool_state_vars_num(), 1);
    }

    st.layer_mut("M").redeclare_state_as_frozen(s);

    assert_eq!(st.cache().state_vars_num(), 0);
    assert_eq!(st.cache().frozen_vars_num(), 1);
    assert!(st.is_frozen_var(s));
    {
        let view = st.layer("M").unwrap();
        assert_eq!(view.layer().state_vars_num(), 0);
        assert_eq!(view.layer().frozen_vars_num(), 1);
        assert_eq!(view.layer().bool_state_vars_num(), 0);
        assert_eq!(view.layer().bool_frozen_vars_num(), 1);
    }
    st.check_invariants();
}

#[test]
fn committed_layers_refuse_removal() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("L"), InsertPolicy::Default);
    let v = ast.atom("v");
    st.layer_mut("L").declare_state_var(v, tcx.boolean());

    st.commit_layer("L");
    assert!(st.layer("L").unwrap().layer().is_committed());
    {
        // Declaration stays permitted while committed.
        let w = ast.atom("w");
        st.layer_mut("L").declare_state_var(w, tcx.boolean());
    }
    let trapped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        st.layer_mut("L").remove_var(v);
    }));
    assert!(trapped.is_err(), "removal must trap on a committed layer");

    st.uncommit_layer("L");

    let removals = Rc::new(Cell::new(0));
    let observed = removals.clone();
    st.add_trigger(
        TriggerEvent::Remove,
        Rc::new(move |cache, name, event| {
            assert_eq!(event, TriggerEvent::Remove);
            // The symbol is already gone when the trigger runs.
            assert!(!cache.is_declared(name));
            observed.set(observed.get() + 1);
        }),
    );

    st.layer_mut("L").remove_var(v);
    assert_eq!(removals.get(), 1);
    assert!(!st.is_symbol_declared(v));
    st.check_invariants();

    // The tombstone allows redeclaration.
    st.layer_mut("L").declare_input_var(v, tcx.integer());
    assert!(st.is_input_var(v));
    st.check_invariants();
}

#[test]
fn redeclaration_invalidates_the_memo() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("M"), InsertPolicy::Default);
    let d = ast.atom("d");
    st.layer_mut("M").declare_define(d, None, ast.true_());
    assert_eq!(st.expr_type(d, None), tcx.boolean());

    st.layer_mut("M").remove_define(d);
    st.layer_mut("M").declare_define(d, None, ast.number(7));

    // The redeclare trigger flushed the cached boolean.
    assert_eq!(st.expr_type(d, None), tcx.integer());
}

#[test]
fn layer_stack_ordering() {
    fixture!(_ast, _tcx, _sess, st);
    st.create_layer(Some("fb"), InsertPolicy::ForceBottom);
    st.create_layer(Some("d1"), InsertPolicy::Default);
    st.create_layer(Some("t1"), InsertPolicy::Top);
    st.create_layer(Some("ft"), InsertPolicy::ForceTop);
    st.create_layer(Some("b1"), InsertPolicy::Bottom);

    let names: Vec<_> = st.layer_names().collect();
    assert_eq!(names, ["ft", "t1", "d1", "b1", "fb"]);
}

#[test]
fn duplicate_forced_policies_trap() {
    fixture!(_ast, _tcx, _sess, st);
    st.create_layer(Some("a"), InsertPolicy::ForceTop);
    let trapped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        st.create_layer(Some("b"), InsertPolicy::ForceTop);
    }));
    assert!(trapped.is_err());
}

#[test]
fn constants_are_shared_across_layers() {
    fixture!(ast, _tcx, _sess, st);
    st.create_layer(Some("A"), InsertPolicy::Default);
    st.create_layer(Some("B"), InsertPolicy::Default);
    let c = ast.atom("c");

    st.layer_mut("A").declare_constant(c);
    st.layer_mut("B").declare_constant(c);
    assert_eq!(st.cache().constants_num(), 1);

    st.layer_mut("A").remove_constant(c);
    assert!(st.is_constant(c), "the other layer still declares it");

    st.layer_mut("B").remove_constant(c);
    assert!(!st.is_constant(c));
    st.check_invariants();
}

#[test]
fn removing_a_layer_drops_its_symbols() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("tmp"), InsertPolicy::Default);
    st.create_layer(Some("keep"), InsertPolicy::Default);
    let a = ast.atom("a");
    let b = ast.atom("b");
    st.layer_mut("tmp").declare_state_var(a, tcx.boolean());
    st.layer_mut("keep").declare_state_var(b, tcx.boolean());

    st.remove_layer("tmp");
    assert!(!st.has_layer("tmp"));
    assert!(!st.is_symbol_declared(a));
    assert!(st.is_state_var(b));
    st.check_invariants();
}

#[test]
fn dense_array_compacts_preserving_order() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("M"), InsertPolicy::Default);
    let names: Vec<_> = (0..20).map(|i| ast.atom(&format!("v{i}"))).collect();
    for &name in &names {
        st.layer_mut("M").declare_state_var(name, tcx.boolean());
    }
    for &name in &names[..16] {
        st.layer_mut("M").remove_var(name);
    }
    // More than three quarters of the slots were tombstones, so the dense
    // array was rebuilt; survivors keep their relative order.
    let survivors: Vec<_> = st.iter_symbols(SymbolKind::VAR).collect();
    assert_eq!(survivors, &names[16..]);
    st.check_invariants();

    // Positions were refreshed: removal after compaction still works.
    st.layer_mut("M").remove_var(names[16]);
    let survivors: Vec<_> = st.iter_symbols(SymbolKind::VAR).collect();
    assert_eq!(survivors, &names[17..]);
    st.check_invariants();
}

#[test]
fn filtered_iteration() {
    fixture!(ast, tcx, _sess, st);
    st.create_layer(Some("M"), InsertPolicy::Default);
    let v = ast.atom("v");
    let c = ast.atom("c");
    let d = ast.atom("d");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(v, tcx.boolean());
        layer.declare_constant(c);
        layer.declare_define(d, None, ast.true_());
    }
    let vars: Vec<_> = st.iter_symbols(SymbolKind::VAR).collect();
    assert_eq!(vars, [v]);
    let named: Vec<_> = st
        .cache()
        .iter_filtered(SymbolKind::ANY, |name| name.atom() == Some(d.atom().unwrap()))
        .collect();
    assert_eq!(named, [d]);
    let layer_defines: Vec<_> =
        st.layer("M").unwrap().iter(SymbolKind::DEFINE | SymbolKind::CONSTANT).collect();
    assert_eq!(layer_defines, [c, d]);
}

#[test]
fn layer_classes() {
    fixture!(_ast, _tcx, _sess, st);
    st.create_layer(Some("model"), InsertPolicy::Default);
    st.create_layer(Some("boolean"), InsertPolicy::Bottom);
    st.set_default_layer_class("model class");
    st.add_layer_to_class("model", None);
    st.add_layer_to_class("boolean", Some("model class"));
    st.add_layer_to_class("boolean", Some("model class"));

    assert_eq!(st.default_layer_class(), Some("model class"));
    assert_eq!(st.layer_class("model class"), ["model", "boolean"]);

    st.remove_layer("boolean");
    assert_eq!(st.layer_class("model class"), ["model"]);
}

#[test]
fn ordering_file_to_groups() {
    fixture!(ast, tcx, sess, st);
    st.create_layer(Some("M"), InsertPolicy::Default);
    let b0 = ast.atom("b0");
    let b1 = ast.atom("b1");
    let w = ast.atom("w");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(b0, tcx.boolean());
        layer.declare_state_var(b1, tcx.boolean());
        layer.declare_state_var(w, tcx.unsigned_word(4));
    }

    let mut parser = ParserOrd::new(st.ast(), &sess);
    parser.parse_str("b1 unknown w b0 b1");
    // One duplicate warning from the parser.
    assert_eq!(sess.dcx().warn_count(), 1);

    let groups = OrdGroups::from_ordering(&st, parser.vars_list());
    // `unknown` and the non-boolean `w` were warned about and skipped.
    assert_eq!(sess.dcx().warn_count(), 3);
    assert_eq!(groups.size(), 2);
    let g1 = groups.group_of(b1).unwrap();
    let g0 = groups.group_of(b0).unwrap();
    assert_ne!(g0, g1);
    assert_eq!(groups.vars_in_group(g1), [b1]);
    assert_eq!(groups.vars_in_group(g0), [b0]);
    assert_eq!(groups.group_of(w), None);
}
