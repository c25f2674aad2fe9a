//! End-to-end checks driving the symbol table and the type checker
//! together, the way the compilation pipeline does.

use smv_ast::{Arena, Ast, Op};
use smv_interface::{Opts, Session};
use smv_sema::{
    InsertPolicy, NFunction, PropertyKind, SymbTable, TypeCtx,
};

macro_rules! fixture {
    ($ast:ident, $tcx:ident, $sess:ident, $st:ident) => {
        fixture!($ast, $tcx, $sess, $st, Opts::default());
    };
    ($ast:ident, $tcx:ident, $sess:ident, $st:ident, $opts:expr) => {
        let arena = Arena::new();
        let $ast = Ast::new(&arena);
        let $tcx = TypeCtx::new(&arena);
        let $sess = Session::with_buffer_emitter($opts);
        #[allow(unused_mut)]
        let mut $st = SymbTable::new(&$ast, &$tcx, &$sess);
        $st.create_layer(Some("M"), InsertPolicy::Default);
    };
}

#[test]
fn word_arithmetic_with_constant_promotion() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    st.layer_mut("M").declare_state_var(x, tcx.unsigned_word(4));

    let sum = ast.binary(Op::Plus, x, ast.number(1));
    let expr = ast.binary(Op::Equal, sum, ast.number(0));
    assert_eq!(st.expr_type(expr, None), tcx.boolean());

    // The sub-expressions were memoised along the way: the constants keep
    // their own integer type, the sum takes the word type.
    assert_eq!(st.expr_type(x, None), tcx.unsigned_word(4));
    assert_eq!(st.expr_type(ast.number(1), None), tcx.integer());
    assert_eq!(st.expr_type(ast.number(0), None), tcx.integer());
    assert_eq!(st.expr_type(sum, None), tcx.unsigned_word(4));

    // Idempotent.
    assert_eq!(st.expr_type(expr, None), tcx.boolean());
    assert!(sess.dcx().emitted().is_empty());
}

#[test]
fn duplicate_enum_constants() {
    fixture!(ast, tcx, sess, st);
    let ty = ast.atom("c");
    let dup = tcx.enum_type(&[ast.atom("a"), ast.atom("b"), ast.atom("a")]);

    assert!(!st.type_checker().type_is_well_formed(&st, dup, ty));
    assert_eq!(sess.dcx().err_count(), 1);

    // Demoted to a warning under backward compatibility.
    fixture!(ast2, tcx2, sess2, st2, Opts::default().with_backward_compat());
    let dup = tcx2.enum_type(&[ast2.atom("a"), ast2.atom("b"), ast2.atom("a")]);
    assert!(st2.type_checker().type_is_well_formed(&st2, dup, ast2.atom("c")));
    assert_eq!(sess2.dcx().err_count(), 0);
    assert_eq!(sess2.dcx().warn_count(), 1);
}

#[test]
fn define_body_types_through_resolution() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    let d = ast.atom("d");
    st.layer_mut("M").declare_state_var(x, tcx.integer());

    let body = ast.case(
        ast.colon(ast.binary(Op::Equal, x, ast.number(0)), ast.true_()),
        ast.case(ast.colon(ast.true_(), ast.false_()), ast.failure()),
    );
    st.layer_mut("M").declare_define(d, None, body);

    assert_eq!(st.expr_type(d, None), tcx.boolean());
    assert!(sess.dcx().emitted().is_empty());
    assert!(st.check_layer("M"));
}

#[test]
#[should_panic = "cannot declare define"]
fn redeclaring_a_define_traps() {
    fixture!(ast, tcx, _sess, st);
    let d = ast.atom("d");
    st.layer_mut("M").declare_define(d, None, ast.true_());
    st.layer_mut("M").declare_define(d, None, ast.false_());
}

#[test]
fn function_family_rules() {
    fixture!(ast, tcx, sess, st);
    let f = ast.atom("f");
    st.layer_mut("M").declare_function(
        f,
        None,
        NFunction::uninterpreted(vec![tcx.real(), tcx.unsigned_word(8)], tcx.real()),
    );
    let call = ast.binary(
        Op::NFunction,
        f,
        ast.list([ast.real("1.0"), ast.unsigned_word(8, 5)]).unwrap(),
    );
    assert!(st.expr_type(call, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
    let diag = &sess.dcx().emitted()[0];
    assert!(diag.msg.contains("bit-vector"), "unexpected message: {}", diag.msg);

    // A homogeneous signature accepts promoted integer constants.
    fixture!(ast2, tcx2, sess2, st2);
    let g = ast2.atom("g");
    st2.layer_mut("M").declare_function(
        g,
        None,
        NFunction::uninterpreted(vec![tcx2.real(), tcx2.real()], tcx2.real()),
    );
    let call = ast2.binary(
        Op::NFunction,
        g,
        ast2.list([ast2.number(1), ast2.number(2)]).unwrap(),
    );
    assert_eq!(st2.expr_type(call, None), tcx2.real());
    assert!(sess2.dcx().emitted().is_empty());
}

#[test]
fn wrong_argument_counts_are_violations() {
    fixture!(ast, tcx, sess, st);
    let f = ast.atom("f");
    st.layer_mut("M").declare_function(
        f,
        None,
        NFunction::uninterpreted(vec![tcx.boolean(), tcx.boolean()], tcx.boolean()),
    );
    let call = ast.binary(Op::NFunction, f, ast.list([ast.true_()]).unwrap());
    assert!(st.expr_type(call, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
}

#[test]
fn undefined_and_ambiguous_identifiers() {
    fixture!(ast, tcx, sess, st);
    assert!(st.expr_type(ast.atom("ghost"), None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);

    // `m.x` declared and `x` a constant: `x` under context `m` has two
    // readings.
    let m = ast.atom("m");
    let x = ast.atom("x");
    let m_x = ast.dot(m, x);
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(m_x, tcx.boolean());
        layer.declare_constant(x);
    }
    assert!(st.expr_type(x, Some(m)).is_error());
    assert_eq!(sess.dcx().err_count(), 2);
}

#[test]
fn constraints_and_properties() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    let y = ast.atom("y");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(x, tcx.boolean());
        layer.declare_state_var(y, tcx.unsigned_word(2));
    }
    let ck = st.type_checker();

    let init = ast.cons(x, Some(ast.binary(Op::Equal, y, ast.unsigned_word(2, 0))));
    let trans = ast.binary(Op::Implies, x, ast.next(x));
    let assign = ast.eqdef(ast.small_init(y), ast.unsigned_word(2, 1));
    assert!(ck.check_constraints(&st, Some(init), Some(trans), None, Some(assign), Some(x), None));

    assert!(ck.check_property(&st, PropertyKind::Ctl, ast.wrap(Op::Ag, x)));
    assert!(ck.check_property(&st, PropertyKind::Ltl, ast.wrap(Op::OpGlobal, x)));
    assert!(ck.check_property(
        &st,
        PropertyKind::Compute,
        ast.binary(Op::Minu, x, x),
    ));
    assert!(sess.dcx().emitted().is_empty());

    // An ill-typed section reports and fails.
    assert!(!ck.check_constraints(&st, Some(y), None, None, None, None, None));
    assert!(sess.dcx().has_errors());
}

#[test]
fn attime_restrictions() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    let y = ast.atom("y");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(x, tcx.boolean());
        layer.declare_state_var(y, tcx.boolean());
    }

    // Nesting is rejected; the inner node has not been seen before, so the
    // memo cannot short-circuit the check.
    let nested = ast.binary(Op::Attime, ast.binary(Op::Attime, y, ast.number(3)), ast.number(4));
    assert!(st.expr_type(nested, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);

    let timed = ast.binary(Op::Attime, x, ast.number(3));
    assert_eq!(st.expr_type(timed, None), tcx.boolean());

    let bad_time = ast.binary(Op::Attime, x, x);
    assert!(st.expr_type(bad_time, None).is_error());
    assert_eq!(sess.dcx().err_count(), 2);
}

#[test]
fn casts_and_word_structure() {
    fixture!(ast, tcx, sess, st);
    let w = ast.atom("w");
    let b = ast.atom("b");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(w, tcx.unsigned_word(4));
        layer.declare_state_var(b, tcx.boolean());
    }

    // bool and word1 round-trip.
    let w1 = ast.wrap(Op::CastWord1, b);
    assert_eq!(st.expr_type(w1, None), tcx.unsigned_word(1));
    assert_eq!(st.expr_type(ast.wrap(Op::CastBool, w1), None), tcx.boolean());

    assert_eq!(st.expr_type(ast.wrap(Op::CastSigned, w), None), tcx.signed_word(4));
    assert_eq!(st.expr_type(ast.wrap(Op::Wsizeof, w), None), tcx.integer());
    assert_eq!(st.expr_type(ast.wrap(Op::CastToInt, w), None), tcx.integer());

    // Concatenation always yields an unsigned word.
    let concat = ast.binary(Op::Concatenation, w, ast.wrap(Op::CastSigned, w));
    assert_eq!(st.expr_type(concat, None), tcx.unsigned_word(8));

    // Bit selection with l = h = 0.
    let select = ast.binary(Op::BitSelection, w, ast.colon(ast.number(0), ast.number(0)));
    assert_eq!(st.expr_type(select, None), tcx.unsigned_word(1));

    // extend by 0 is the identity on the type.
    let extended = ast.binary(Op::Extend, w, ast.number(0));
    assert_eq!(st.expr_type(extended, None), tcx.unsigned_word(4));

    // Out-of-range selection is a violation.
    let oob = ast.binary(Op::BitSelection, w, ast.colon(ast.number(4), ast.number(0)));
    assert!(st.expr_type(oob, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
}

#[test]
fn word_arrays() {
    fixture!(ast, tcx, sess, st);
    let mem = ast.atom("mem");
    st.layer_mut("M").declare_state_var(mem, tcx.wordarray(3, 5));

    let addr = ast.unsigned_word(3, 1);
    let value = ast.unsigned_word(5, 7);
    let write = ast.binary(Op::WaWrite, mem, ast.binary(Op::WaWrite, addr, value));
    assert_eq!(st.expr_type(write, None), tcx.wordarray(3, 5));

    let read = ast.binary(Op::WaRead, mem, addr);
    assert_eq!(st.expr_type(read, None), tcx.unsigned_word(5));

    // Mismatched address width.
    let bad = ast.binary(Op::WaRead, mem, ast.unsigned_word(4, 1));
    assert!(st.expr_type(bad, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
}

#[test]
fn sets_and_case_lifting() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    st.layer_mut("M").declare_state_var(x, tcx.integer());

    let range = ast.twodots(ast.number(0), ast.number(3));
    let membership = ast.binary(Op::SetIn, x, range);
    assert_eq!(st.expr_type(membership, None), tcx.boolean());

    let union = ast.binary(Op::Union, ast.number(1), ast.number(2));
    assert_eq!(st.expr_type(union, None), tcx.set_int());

    // A set branch lifts the other branch in a case expression.
    let cases = ast.case(
        ast.colon(ast.binary(Op::Equal, x, ast.number(0)), range),
        ast.case(ast.colon(ast.true_(), ast.number(7)), ast.failure()),
    );
    assert_eq!(st.expr_type(cases, None), tcx.set_int());

    // Words have no set counterpart.
    let w = ast.atom("w");
    st.layer_mut("M").declare_state_var(w, tcx.unsigned_word(4));
    let bad = ast.binary(Op::SetIn, w, range);
    assert!(st.expr_type(bad, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
}

#[test]
fn backward_compat_demotes_legacy_violations() {
    // An enum operand in a boolean AND is an error by default...
    fixture!(ast, tcx, sess, st);
    let e = ast.atom("e");
    let vals = [ast.atom("lo"), ast.atom("hi")];
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(e, tcx.enum_type(&vals));
        layer.declare_constant(vals[0]);
        layer.declare_constant(vals[1]);
    }
    let bad = ast.binary(Op::And, e, ast.true_());
    assert!(st.expr_type(bad, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);

    // ...and a warning with a best-effort type under backward
    // compatibility, since both operands predate the type system.
    fixture!(ast2, tcx2, sess2, st2, Opts::default().with_backward_compat());
    let e = ast2.atom("e");
    let vals = [ast2.atom("lo"), ast2.atom("hi")];
    {
        let mut layer = st2.layer_mut("M");
        layer.declare_state_var(e, tcx2.enum_type(&vals));
        layer.declare_constant(vals[0]);
        layer.declare_constant(vals[1]);
    }
    let bad = ast2.binary(Op::And, e, ast2.true_());
    assert_eq!(st2.expr_type(bad, None), tcx2.pure_symbolic_enum());
    assert_eq!(sess2.dcx().err_count(), 0);
    assert_eq!(sess2.dcx().warn_count(), 1);
}

#[test]
fn parameters_resolve_to_actuals() {
    fixture!(ast, tcx, sess, st);
    let m = ast.atom("m");
    let x = ast.atom("x");
    let p = ast.dot(m, ast.atom("p"));
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(x, tcx.unsigned_word(4));
        layer.declare_parameter(p, None, x);
    }
    assert_eq!(st.expr_type(ast.atom("p"), Some(m)), tcx.unsigned_word(4));
    assert!(sess.dcx().emitted().is_empty());
}

#[test]
fn variable_arrays_and_indexing() {
    fixture!(ast, tcx, sess, st);
    let a = ast.atom("a");
    let i = ast.atom("i");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_variable_array(a, tcx.array(tcx.boolean(), 0, 3));
        layer.declare_state_var(i, tcx.integer());
    }
    assert_eq!(st.expr_type(a, None), tcx.array(tcx.boolean(), 0, 3));
    let access = ast.array_index(a, i);
    assert_eq!(st.expr_type(access, None), tcx.boolean());
    assert!(sess.dcx().emitted().is_empty());
}

#[test]
fn psl_forall_rechecks_under_each_binding() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    let a = ast.atom("a");
    let b = ast.atom("b");
    {
        let mut layer = st.layer_mut("M");
        layer.declare_state_var(x, tcx.enum_type(&[a, b]));
        layer.declare_constant(a);
        layer.declare_constant(b);
    }

    let i = ast.atom("i");
    let replicator = ast.cons(i, ast.list([a, b]));
    let property = ast.wrap(Op::PslAlways, ast.binary(Op::Equal, x, i));
    let forall = ast.binary(Op::PslReplProp, replicator, property);

    assert!(st.type_checker().check_property(&st, PropertyKind::Psl, forall));
    assert!(sess.dcx().emitted().is_empty());
    // The temporary binding does not survive the check.
    assert!(!st.is_symbol_declared(i));
}

#[test]
fn psl_bounded_operators_validate_ranges() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    st.layer_mut("M").declare_state_var(x, tcx.boolean());

    let good = ast.binary(Op::PslNextABang, x, ast.twodots(ast.number(0), ast.number(3)));
    assert_eq!(st.expr_type(good, None), tcx.boolean());

    let bad = ast.binary(Op::PslNextABang, x, ast.twodots(ast.number(3), ast.number(1)));
    assert!(st.expr_type(bad, None).is_error());
    assert_eq!(sess.dcx().err_count(), 1);
}

#[test]
fn memo_flushes_on_error_then_recovers() {
    fixture!(ast, tcx, sess, st);
    let x = ast.atom("x");
    let before = ast.binary(Op::And, x, ast.true_());
    assert!(st.expr_type(before, None).is_error());
    assert!(sess.dcx().has_errors());

    // After declaring the missing variable the same expression checks
    // cleanly: the failed intermediate results were not cached.
    st.layer_mut("M").declare_state_var(x, tcx.boolean());
    assert_eq!(st.expr_type(before, None), tcx.boolean());
}
