//! Chain execution tests: result threading, overload selection, the error
//! taxonomy, and cache behavior.

use std::any::Any;

use spyglass_core::{
    ChainError, ChainErrorKind, Engine, HostObject, InvokeError, MethodDesc, TypeKey, TypeSchema,
    TypeShape, Value, keys,
};

// ─── Fixture ─────────────────────────────────────────────────────────────────

const WIDGET: TypeKey = TypeKey("widget");
const GADGET: TypeKey = TypeKey("gadget");
const DEVICE: TypeKey = TypeKey("device");
const MEASURABLE: TypeKey = TypeKey("measurable");
const ORPHAN: TypeKey = TypeKey("orphan");

struct Widget;
struct Gadget;
struct Orphan;

impl HostObject for Widget {
    fn type_key(&self) -> TypeKey {
        WIDGET
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for Gadget {
    fn type_key(&self) -> TypeKey {
        GADGET
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for Orphan {
    fn type_key(&self) -> TypeKey {
        ORPHAN
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn widget_schema() -> TypeSchema {
    TypeSchema {
        key: WIDGET,
        parent: None,
        interfaces: vec![MEASURABLE],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getX",
                params: vec![],
                call: |recv, _args| {
                    recv.receiver::<Widget>("widget")?;
                    Ok(Value::object(Gadget))
                },
            },
            MethodDesc {
                name: "foo",
                params: vec![keys::I32],
                call: |_recv, _args| Ok(Value::Str("int".into())),
            },
            MethodDesc {
                name: "foo",
                params: vec![keys::STRING],
                call: |_recv, _args| Ok(Value::Str("str".into())),
            },
            MethodDesc {
                name: "pair",
                params: vec![keys::I32, keys::I32],
                call: |_recv, args| {
                    let (Value::I32(a), Value::I32(b)) = (&args[0], &args[1]) else {
                        unreachable!()
                    };
                    Ok(Value::I32(a + b))
                },
            },
            MethodDesc {
                name: "getNothing",
                params: vec![],
                call: |_recv, _args| Ok(Value::Null),
            },
            MethodDesc {
                name: "explode",
                params: vec![],
                call: |_recv, _args| Err(InvokeError::new("boom")),
            },
        ],
    }
}

fn device_schema() -> TypeSchema {
    TypeSchema {
        key: DEVICE,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![MethodDesc {
            name: "getSerial",
            params: vec![],
            call: |_recv, _args| Ok(Value::Str("device-serial".into())),
        }],
    }
}

fn gadget_schema() -> TypeSchema {
    TypeSchema {
        key: GADGET,
        parent: Some(DEVICE),
        interfaces: vec![MEASURABLE],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getY",
                params: vec![keys::I32],
                call: |recv, args| {
                    recv.receiver::<Gadget>("gadget")?;
                    let Value::I32(n) = &args[0] else { unreachable!() };
                    Ok(Value::I64(i64::from(*n) * 2))
                },
            },
            // Same signature as the device method — the override counts once.
            MethodDesc {
                name: "getSerial",
                params: vec![],
                call: |_recv, _args| Ok(Value::Str("gadget-serial".into())),
            },
        ],
    }
}

fn measurable_schema() -> TypeSchema {
    TypeSchema {
        key: MEASURABLE,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![MethodDesc {
            name: "size",
            params: vec![],
            call: |recv, _args| {
                recv.receiver::<Widget>("widget")?;
                Ok(Value::F64(1.0))
            },
        }],
    }
}

fn orphan_schema() -> TypeSchema {
    TypeSchema {
        key: ORPHAN,
        // Never registered; the index builder skips it.
        parent: Some(TypeKey("ghost")),
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![MethodDesc {
            name: "ping",
            params: vec![],
            call: |_recv, _args| Ok(Value::Str("pong".into())),
        }],
    }
}

fn engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_type(widget_schema()).unwrap();
    engine.register_type(gadget_schema()).unwrap();
    engine.register_type(device_schema()).unwrap();
    engine.register_type(measurable_schema()).unwrap();
    engine.register_type(orphan_schema()).unwrap();
    engine
}

fn run(engine: &Engine, tokens: &[&str], receiver: Value) -> spyglass_core::ChainOutcome {
    engine
        .run_chain(tokens, receiver, None)
        .unwrap_or_else(|e| panic!("chain failed: {e}"))
}

fn run_err(engine: &Engine, tokens: &[&str], receiver: Value) -> ChainError {
    engine.run_chain(tokens, receiver, None).expect_err("expected chain to fail")
}

// ─── Threading ───────────────────────────────────────────────────────────────

#[test]
fn chain_threads_each_result_into_the_next_receiver() {
    let engine = engine();
    let outcome = run(&engine, &["getX", "getY", "5"], Value::object(Widget));
    assert_eq!(outcome.frames.len(), 2);
    assert_eq!(outcome.frames[0].operation, "getX");
    assert_eq!(outcome.frames[0].receiver.type_key(), WIDGET);
    assert_eq!(outcome.frames[1].operation, "getY");
    assert_eq!(outcome.frames[1].receiver.type_key(), GADGET);
    assert_eq!(outcome.value, Value::I64(10));
    assert_eq!(outcome.rendered, "10");
}

#[test]
fn empty_token_stream_returns_the_receiver() {
    let engine = engine();
    let outcome = run(&engine, &[], Value::object(Widget));
    assert!(outcome.frames.is_empty());
    assert_eq!(outcome.value.type_key(), WIDGET);
}

#[test]
fn frame_records_the_consumed_argument_tokens() {
    let engine = engine();
    let outcome = run(&engine, &["pair", "2", "3"], Value::object(Widget));
    assert_eq!(outcome.value, Value::I32(5));
    assert_eq!(outcome.frames[0].arg_tokens, vec!["2", "3"]);
    assert_eq!(outcome.frames[0].params, vec![keys::I32, keys::I32]);
}

// ─── Overload selection ──────────────────────────────────────────────────────

#[test]
fn same_arity_overloads_resolve_by_declaration_order() {
    let engine = engine();
    // "5" decodes as i32, so the earlier i32 overload wins even though the
    // string overload would also accept it.
    let outcome = run(&engine, &["foo", "5"], Value::object(Widget));
    assert_eq!(outcome.value, Value::Str("int".into()));
}

#[test]
fn later_overload_wins_when_the_first_rejects_the_token() {
    let engine = engine();
    let outcome = run(&engine, &["foo", "bar"], Value::object(Widget));
    assert_eq!(outcome.value, Value::Str("str".into()));
}

#[test]
fn inherited_method_resolves_through_the_parent() {
    let engine = engine();
    let outcome = run(&engine, &["getX", "getSerial"], Value::object(Widget));
    // The gadget override shadows the device declaration.
    assert_eq!(outcome.value, Value::Str("gadget-serial".into()));
}

#[test]
fn interface_method_runs_on_a_matching_receiver() {
    let engine = engine();
    let outcome = run(&engine, &["size"], Value::object(Widget));
    assert_eq!(outcome.value, Value::F64(1.0));
}

#[test]
fn missing_ancestor_schema_degrades_to_a_partial_index() {
    let engine = engine();
    let outcome = run(&engine, &["ping"], Value::object(Orphan));
    assert_eq!(outcome.value, Value::Str("pong".into()));
}

// ─── Error taxonomy ──────────────────────────────────────────────────────────

#[test]
fn unknown_operation_names_the_receiver_and_alternatives() {
    let engine = engine();
    let err = run_err(&engine, &["frobnicate"], Value::object(Widget));
    assert_eq!(err.step, 0);
    match err.kind {
        ChainErrorKind::UnknownOperation { receiver, name, available } => {
            assert_eq!(receiver, WIDGET);
            assert_eq!(name, "frobnicate");
            assert!(available.contains(&"getX".to_string()));
            assert!(available.contains(&"size".to_string()));
        }
        other => panic!("unexpected kind: {other}"),
    }
}

#[test]
fn failing_step_index_is_zero_based() {
    let engine = engine();
    let err = run_err(&engine, &["getX", "frobnicate"], Value::object(Widget));
    assert_eq!(err.step, 1);
    assert!(matches!(err.kind, ChainErrorKind::UnknownOperation { .. }));
}

#[test]
fn arity_mismatch_when_no_overload_fits_the_remaining_tokens() {
    let engine = engine();
    let err = run_err(&engine, &["pair", "1"], Value::object(Widget));
    assert_eq!(err.step, 0);
    assert!(
        matches!(err.kind, ChainErrorKind::ArityMismatch { ref name, supplied } if name.as_str() == "pair" && supplied == 1)
    );
}

#[test]
fn overload_resolution_failure_carries_the_last_decode_error() {
    let engine = engine();
    let err = run_err(&engine, &["getX", "getY", "zap"], Value::object(Widget));
    assert_eq!(err.step, 1);
    match err.kind {
        ChainErrorKind::OverloadResolution { name, cause } => {
            assert_eq!(name, "getY");
            assert_eq!(cause.target, keys::I32);
            assert_eq!(cause.token, "zap");
        }
        other => panic!("unexpected kind: {other}"),
    }
}

#[test]
fn interface_method_on_the_wrong_concrete_type_is_a_receiver_mismatch() {
    let engine = engine();
    let err = run_err(&engine, &["size"], Value::object(Gadget));
    assert_eq!(err.step, 0);
    match err.kind {
        ChainErrorKind::ReceiverTypeMismatch { name, expected, actual } => {
            assert_eq!(name, "size");
            assert_eq!(expected, MEASURABLE);
            assert_eq!(actual, GADGET);
        }
        other => panic!("unexpected kind: {other}"),
    }
}

#[test]
fn invocation_failure_surfaces_with_its_step() {
    let engine = engine();
    let err = run_err(&engine, &["explode"], Value::object(Widget));
    assert_eq!(err.step, 0);
    match err.kind {
        ChainErrorKind::Invoke { name, cause } => {
            assert_eq!(name, "explode");
            assert_eq!(cause.message, "boom");
        }
        other => panic!("unexpected kind: {other}"),
    }
}

// ─── Null termination ────────────────────────────────────────────────────────

#[test]
fn null_result_ends_the_chain_successfully() {
    let engine = engine();
    let outcome = run(&engine, &["getNothing"], Value::object(Widget));
    assert_eq!(outcome.frames.len(), 1);
    assert!(outcome.value.is_null());
    assert_eq!(outcome.rendered, "null");
}

#[test]
fn tokens_after_a_null_result_are_a_terminal_error() {
    let engine = engine();
    let err = run_err(&engine, &["getNothing", "getX"], Value::object(Widget));
    assert_eq!(err.step, 1);
    assert!(matches!(err.kind, ChainErrorKind::TerminatedEarly));
}

#[test]
fn null_initial_receiver_cannot_start_a_chain() {
    let engine = engine();
    let err = run_err(&engine, &["getX"], Value::Null);
    assert_eq!(err.step, 0);
    assert!(matches!(err.kind, ChainErrorKind::TerminatedEarly));
}

// ─── Cache behavior ──────────────────────────────────────────────────────────

#[test]
fn clearing_the_cache_never_loses_operations() {
    let engine = engine();
    let before = engine.index_of(WIDGET);
    assert!(engine.cached_types().contains(&WIDGET));

    engine.clear_cache();
    assert!(engine.cached_types().is_empty());

    let after = engine.index_of(WIDGET);
    assert_eq!(before.operation_names(), after.operation_names());
    let arities = |index: &spyglass_core::MethodIndex| -> Vec<usize> {
        index.get("foo").unwrap().iter().map(|o| o.params.len()).collect()
    };
    assert_eq!(arities(&before), arities(&after));
}

#[test]
fn index_lookup_is_idempotent() {
    let engine = engine();
    let first = engine.index_of(WIDGET);
    let second = engine.index_of(WIDGET);
    assert_eq!(first.operation_names(), second.operation_names());
    assert_eq!(engine.cached_types(), vec![WIDGET]);
}

#[test]
fn snapshots_are_not_views_of_the_cache() {
    let engine = engine();
    engine.index_of(WIDGET);
    engine.index_of(GADGET);
    let snapshot = engine.indices();
    assert_eq!(snapshot.len(), 2);

    engine.clear_cache();
    assert_eq!(snapshot.len(), 2);
    assert!(engine.indices().is_empty());
}

#[test]
fn concurrent_chains_share_one_engine() {
    let engine = engine();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let outcome = engine
                        .run_chain(&["getX", "getY", "7"], Value::object(Widget), None)
                        .unwrap();
                    assert_eq!(outcome.value, Value::I64(14));
                }
            });
        }
        // A racing clear is at worst a rebuild, never a failure.
        scope.spawn(|| {
            for _ in 0..20 {
                engine.clear_cache();
            }
        });
    });
}
