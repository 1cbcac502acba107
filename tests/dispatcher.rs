mod common;

use common::{call_log, recording_handler};
use flux_store::flux::{Action, ActionType, DispatchError, Dispatcher};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_handlers_run_in_registration_order() {
    let dispatcher = Dispatcher::new();
    let log = call_log();
    recording_handler(&dispatcher, "add", "H1", &log);
    recording_handler(&dispatcher, "add", "H2", &log);
    recording_handler(&dispatcher, "remove", "H3", &log);

    dispatcher.dispatch(&Action::new("add")).unwrap();

    assert_eq!(*log.borrow(), vec!["H1", "H2"]);
}

#[test]
fn test_each_handler_runs_exactly_once_per_dispatch() {
    let dispatcher = Dispatcher::new();
    let log = call_log();
    recording_handler(&dispatcher, "add", "H1", &log);

    dispatcher.dispatch(&Action::new("add")).unwrap();
    dispatcher.dispatch(&Action::new("add")).unwrap();

    assert_eq!(*log.borrow(), vec!["H1", "H1"]);
}

#[test]
fn test_dispatch_without_handlers_is_noop() {
    let dispatcher = Dispatcher::new();
    assert!(dispatcher.dispatch(&Action::new("nobody-listens")).is_ok());
    assert!(!dispatcher.is_dispatching());
}

#[test]
fn test_handler_receives_the_action() {
    let dispatcher = Dispatcher::new();
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    dispatcher
        .register("set", "Setter", move |action| {
            *s.borrow_mut() = Some(action.payload_as::<u32>()?);
            Ok(())
        })
        .unwrap();

    dispatcher
        .dispatch(&Action::with_payload("set", serde_json::json!(42)))
        .unwrap();

    assert_eq!(*seen.borrow(), Some(42));
}

#[test]
fn test_failing_handler_does_not_block_others() {
    let dispatcher = Dispatcher::new();
    let log = call_log();
    recording_handler(&dispatcher, "add", "H1", &log);
    dispatcher
        .register("add", "Boom", |_| Err(anyhow::anyhow!("boom")))
        .unwrap();
    recording_handler(&dispatcher, "add", "H3", &log);

    let err = dispatcher.dispatch(&Action::new("add")).unwrap_err();

    assert_eq!(*log.borrow(), vec!["H1", "H3"]);
    let aggregated = match err {
        DispatchError::HandlerExecution(aggregated) => aggregated,
        other => panic!("expected HandlerExecution, got {other:?}"),
    };
    assert_eq!(aggregated.action_type, ActionType::from("add"));
    assert_eq!(aggregated.handled, 3);
    assert_eq!(aggregated.failures.len(), 1);
    assert_eq!(aggregated.failures[0].owner, "Boom");
    assert_eq!(aggregated.failures[0].error.to_string(), "boom");
}

#[test]
fn test_reentrant_dispatch_fails_and_round_continues() {
    let dispatcher = Dispatcher::new();
    let log = call_log();
    let inner_result = Rc::new(RefCell::new(None));

    let d = dispatcher.clone();
    let r = inner_result.clone();
    dispatcher
        .register("add", "Cascader", move |_| {
            *r.borrow_mut() = Some(d.dispatch(&Action::new("other")));
            Ok(())
        })
        .unwrap();
    recording_handler(&dispatcher, "add", "After", &log);
    recording_handler(&dispatcher, "other", "Other", &log);

    dispatcher.dispatch(&Action::new("add")).unwrap();

    let inner = inner_result.borrow_mut().take().unwrap();
    match inner {
        Err(DispatchError::Reentrant {
            action_type,
            in_flight,
        }) => {
            assert_eq!(action_type.as_str(), "other");
            assert_eq!(in_flight.as_str(), "add");
        }
        other => panic!("expected Reentrant, got {other:?}"),
    }
    assert_eq!(*log.borrow(), vec!["After"]);
}

#[test]
fn test_reentrant_error_propagated_by_handler_is_aggregated() {
    let dispatcher = Dispatcher::new();
    let d = dispatcher.clone();
    dispatcher
        .register("add", "Cascader", move |_| {
            d.dispatch(&Action::new("add"))?;
            Ok(())
        })
        .unwrap();

    let err = dispatcher.dispatch(&Action::new("add")).unwrap_err();
    let DispatchError::HandlerExecution(aggregated) = err else {
        panic!("expected HandlerExecution");
    };
    let original = aggregated.failures[0]
        .error
        .downcast_ref::<DispatchError>()
        .expect("original error kept");
    assert!(matches!(original, DispatchError::Reentrant { .. }));
}

#[test]
fn test_dispatching_again_after_round_is_allowed() {
    let dispatcher = Dispatcher::new();
    let log = call_log();
    recording_handler(&dispatcher, "add", "H1", &log);

    let d = dispatcher.clone();
    let result = Rc::new(RefCell::new(None));
    let r = result.clone();
    dispatcher
        .register("outer", "Outer", move |_| {
            *r.borrow_mut() = Some(d.is_dispatching());
            Ok(())
        })
        .unwrap();

    dispatcher.dispatch(&Action::new("outer")).unwrap();
    assert_eq!(*result.borrow(), Some(true));
    assert!(dispatcher.dispatch(&Action::new("add")).is_ok());
    assert_eq!(log.borrow().len(), 1);
}
