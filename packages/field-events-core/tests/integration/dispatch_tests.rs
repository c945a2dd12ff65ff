//! Change computation and dispatch over plain snapshots.

use ntest::timeout;
use serde_json::json;

use field_events_core::{
    ChangeDispatcher, DispatchError, HandlerCall, HandlerError, HandlerRegistry, Phase,
};

use super::helpers::{new_log, snapshot, Invocation, Log};

fn recorder(log: &Log) -> impl Fn(&HandlerCall<'_, (), ()>) -> Result<(), HandlerError> {
    let log = log.clone();
    move |call| {
        log.lock().unwrap().push(Invocation {
            phase: call.phase,
            field: call.field.to_string(),
            old_value: call.old_value.clone(),
            value: call.value.clone(),
            insert: call.insert,
        });
        Ok(())
    }
}

#[timeout(1000)]
#[test]
fn test_update_example_invokes_status_handler_once() -> anyhow::Result<()> {
    let log = new_log();
    let dispatcher: ChangeDispatcher<()> = ChangeDispatcher::new();
    dispatcher.register_handler(Phase::AfterUpdate, "status", recorder(&log));

    let old = snapshot(json!({"status": "pending", "name": "A"}))?;
    let new = snapshot(json!({"status": "done", "name": "A"}))?;
    let changes = dispatcher.compute_changes(Some(&old), Some(&new))?;

    assert_eq!(changes.len(), 1);
    let change = changes.get("status").unwrap();
    assert_eq!(change.old_value, json!("pending"));
    assert_eq!(change.new_value, json!("done"));

    let result = dispatcher.dispatch(Phase::AfterUpdate, changes, &(), &());
    assert_eq!(result.invoked, 1);
    assert!(result.is_success());
    assert_eq!(
        *log.lock().unwrap(),
        vec![Invocation {
            phase: Phase::AfterUpdate,
            field: "status".to_string(),
            old_value: json!("pending"),
            value: json!("done"),
            insert: false,
        }]
    );
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_insert_example_invokes_on_insert_status() -> anyhow::Result<()> {
    let log = new_log();
    let registry = HandlerRegistry::builder()
        .named("onInsertStatus", recorder(&log))?
        .build();
    let dispatcher = ChangeDispatcher::with_registry(registry, Default::default());

    let old = snapshot(json!({}))?;
    let new = snapshot(json!({"status": "new"}))?;
    let changes = dispatcher.compute_changes(Some(&old), Some(&new))?;
    assert_eq!(changes.get("status").unwrap().old_value, json!(null));

    let result = dispatcher.after_insert(&(), &(), &new);
    assert_eq!(result.invoked, 1);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].field, "status");
    assert_eq!(log[0].old_value, json!(null));
    assert_eq!(log[0].value, json!("new"));
    assert!(log[0].insert);
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_no_differences_invokes_nothing() -> anyhow::Result<()> {
    let log = new_log();
    let dispatcher: ChangeDispatcher<()> = ChangeDispatcher::new();
    for phase in Phase::ALL {
        for field in ["status", "name", "tags"] {
            dispatcher.register_handler(phase, field, recorder(&log));
        }
    }

    let s = snapshot(json!({"status": "done", "name": "A", "tags": ["x", {"y": 1}]}))?;
    let changes = dispatcher.compute_changes(Some(&s), Some(&s))?;
    assert!(changes.is_empty());

    let result = dispatcher.dispatch(Phase::AfterUpdate, changes, &(), &());
    assert_eq!(result.invoked, 0);
    let result = dispatcher.before_update(&(), &(), &s, &s);
    assert_eq!(result.invoked, 0);
    assert!(log.lock().unwrap().is_empty());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_failing_handler_does_not_stop_others() -> anyhow::Result<()> {
    let log = new_log();
    let dispatcher: ChangeDispatcher<()> = ChangeDispatcher::new();
    dispatcher.register_handler(Phase::AfterUpdate, "name", |_| {
        Err(HandlerError::failed("name is locked"))
    });
    dispatcher.register_handler(Phase::AfterUpdate, "status", recorder(&log));

    let old = snapshot(json!({"name": "A", "status": "pending"}))?;
    let new = snapshot(json!({"name": "B", "status": "done"}))?;
    let result = dispatcher.after_update(&(), &(), &old, &new);

    assert_eq!(result.invoked, 2);
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].field, "name");
    assert_eq!(result.failures[0].handler, "onChangeName");
    assert_eq!(result.failures[0].error.to_string(), "name is locked");

    match result.into_result() {
        Err(DispatchError::HandlersFailed { phase, failures }) => {
            assert_eq!(phase, Phase::AfterUpdate);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected HandlersFailed, got {:?}", other),
    }
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_handler_sees_whole_change_set() -> anyhow::Result<()> {
    let dispatcher: ChangeDispatcher<()> = ChangeDispatcher::new();
    dispatcher.register_handler(Phase::AfterUpdate, "status", |call| {
        let old = call.changes.old_values();
        if old.get("total") != Some(&json!(5)) || call.changes.len() != 2 {
            return Err(HandlerError::failed("unexpected change set"));
        }
        Ok(())
    });

    let old = snapshot(json!({"status": "pending", "total": 5}))?;
    let new = snapshot(json!({"status": "done", "total": 6}))?;
    let result = dispatcher.after_update(&(), &(), &old, &new);
    assert!(result.is_success());
    assert_eq!(result.skipped, 1);
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_absent_snapshot_is_rejected() {
    let dispatcher: ChangeDispatcher<()> = ChangeDispatcher::new();
    let err = dispatcher.compute_changes(None, None).unwrap_err();
    assert_eq!(err.to_string(), "Invalid old snapshot: snapshot is absent");
}
