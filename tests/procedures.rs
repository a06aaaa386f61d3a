mod common;

use chrono::NaiveDate;
use common::{engine, open_uow, Order};
use purser::{PersistenceError, Record, ScalarType, SessionError, UnitOfWork, Value};
use rust_decimal::Decimal;

fn register_describe(engine: &purser::MemoryEngine) {
    engine
        .register_procedure("sp_describe", |call| {
            Ok(call
                .params
                .iter()
                .map(|p| {
                    Record::new()
                        .with("parameter", p.name.clone())
                        .with("type", p.ty.to_string())
                })
                .collect())
        })
        .unwrap();
}

#[test]
fn parameterless_calls_scope_their_own_session() {
    let engine = engine();
    engine
        .register_procedure("sp_ping", |_call| {
            Ok(vec![Record::new().with("pong", true)])
        })
        .unwrap();

    // The unit of work is never opened; procedures bring their own session.
    let uow = UnitOfWork::new(engine.clone());
    let rows = uow.call_procedure("sp_ping").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("pong"), Some(&Value::Bool(true)));

    // And it was released again.
    assert_eq!(engine.open_sessions(), 0);
    assert!(!uow.is_open());
}

#[test]
fn single_parameter_calls_carry_an_explicit_type() {
    let engine = engine();
    register_describe(&engine);
    let uow = UnitOfWork::new(engine.clone());

    let rows = uow
        .call_procedure_with("sp_describe", "who", ScalarType::Text, "bob")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("parameter"), Some(&Value::Text("who".into())));
    assert_eq!(rows[0].get("type"), Some(&Value::Text("text".into())));
}

#[test]
fn map_calls_resolve_every_whitelisted_scalar() {
    let engine = engine();
    register_describe(&engine);
    let uow = UnitOfWork::new(engine.clone());

    let rows = uow
        .call_procedure_map(
            "sp_describe",
            vec![
                ("label", Value::Text("invoice".into())),
                ("amount", Value::Decimal(Decimal::new(12345, 2))),
                ("count", Value::Int(3)),
                ("rate", Value::Double(0.21)),
                ("population", Value::BigInt(8_000_000)),
                (
                    "day",
                    Value::Date(NaiveDate::from_ymd_opt(2026, 8, 25).expect("valid date")),
                ),
                ("active", Value::Bool(true)),
            ],
        )
        .unwrap();

    let described: Vec<(String, String)> = rows
        .iter()
        .map(|r| {
            (
                r.try_get::<String>("parameter").unwrap(),
                r.try_get::<String>("type").unwrap(),
            )
        })
        .collect();
    assert_eq!(
        described,
        vec![
            ("label".into(), "text".into()),
            ("amount".into(), "numeric".into()),
            ("count".into(), "integer".into()),
            ("rate".into(), "double".into()),
            ("population".into(), "bigint".into()),
            ("day".into(), "date".into()),
            ("active".into(), "boolean".into()),
        ]
    );
}

#[test]
fn values_outside_the_whitelist_refuse_the_call() {
    let engine = engine();
    register_describe(&engine);
    let uow = UnitOfWork::new(engine.clone());

    let err = uow
        .call_procedure_map(
            "sp_import",
            vec![
                ("amount", Value::Double(12.5)),
                ("payload", Value::Json(serde_json::json!({"a": 1}))),
            ],
        )
        .unwrap_err();
    match &err {
        PersistenceError::UnresolvedParameter {
            procedure,
            parameter,
            value,
        } => {
            assert_eq!(procedure, "sp_import");
            assert_eq!(parameter, "payload");
            assert_eq!(value.kind(), "json");
        }
        other => panic!("expected UnresolvedParameter, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("sp_import"), "got: {}", message);
    assert!(message.contains("\"payload\""), "got: {}", message);

    // Refused before any session was opened.
    assert_eq!(engine.open_sessions(), 0);

    // Null is just as unresolvable: there is no type to infer from it.
    let err = uow
        .call_procedure_map("sp_import", vec![("missing", Value::Null)])
        .unwrap_err();
    assert!(matches!(err, PersistenceError::UnresolvedParameter { .. }));
}

#[test]
fn procedure_calls_leave_the_open_session_alone() {
    let engine = engine();
    engine
        .register_procedure("sp_totals", |_call| {
            Ok(vec![Record::new().with("total", 42i64)])
        })
        .unwrap();

    let uow = open_uow(&engine);
    uow.create(&Order::new("OPEN", 10.0)).unwrap();
    assert_eq!(engine.open_sessions(), 1);

    let rows = uow.call_procedure("sp_totals").unwrap();
    assert_eq!(rows[0].get("total"), Some(&Value::BigInt(42)));

    // The scoped session is gone; the unit of work's is untouched.
    assert_eq!(engine.open_sessions(), 1);
    assert!(uow.is_open());
    assert_eq!(uow.find_all::<Order>().unwrap().len(), 1);
}

#[test]
fn unknown_procedures_surface_a_backend_error() {
    let engine = engine();
    let uow = UnitOfWork::new(engine.clone());

    let err = uow.call_procedure("sp_nope").unwrap_err();
    match err {
        PersistenceError::Session(SessionError::Backend(message)) => {
            assert!(message.contains("sp_nope"), "got: {}", message)
        }
        other => panic!("expected Session(Backend), got {:?}", other),
    }
}
