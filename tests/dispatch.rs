//! Integration tests for call-site dispatch ordering, replacement
//! composition and snapshot isolation under concurrent registration changes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use callweave::prelude::*;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn recording(log: &Log, name: &'static str) -> BeforeFn<u32> {
    let log = Arc::clone(log);
    Arc::new(move |_| {
        log.lock().map_err(|e| e.to_string())?.push(name);
        Ok(())
    })
}

#[test]
fn before_observers_run_in_documented_order() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0010);
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    // b1 at order 0, b2 at order 1; expected recorded order [b1, b2, core].
    registry
        .attach_before_ordered(target, recording(&log, "b1"), 0)
        .unwrap();
    registry
        .attach_before_ordered(target, recording(&log, "b2"), 1)
        .unwrap();

    let core_log = Arc::clone(&log);
    registry
        .invoke(target, &mut 0, move |_| {
            core_log.lock().map_err(|e| e.to_string())?.push("core");
            Ok(0)
        })
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["b1", "b2", "core"]);
}

#[test]
fn order_keys_dominate_registration_order() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0011);
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    // Registered out of key order on purpose.
    for (name, order) in [("third", 7), ("first", -2), ("second", 0), ("tie", 0)] {
        registry
            .attach_before_ordered(target, recording(&log, name), order)
            .unwrap();
    }

    registry.invoke(target, &mut 0, |_| Ok(0)).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first", "second", "tie", "third"]
    );
}

#[test]
fn replace_without_passthrough_suppresses_original() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0012);
    let core_runs = Arc::new(AtomicU32::new(0));

    registry
        .attach_replace(target, Arc::new(|_, _| Ok(7)))
        .unwrap();

    let runs = Arc::clone(&core_runs);
    let result = registry
        .invoke(target, &mut 0, move |_| {
            runs.fetch_add(1, Ordering::Relaxed);
            Ok(1)
        })
        .unwrap();

    assert_eq!(result, 7);
    assert_eq!(core_runs.load(Ordering::Relaxed), 0);
}

#[test]
fn replace_chain_composes_latest_outermost() {
    let registry: HookRegistry<u32, String> = HookRegistry::new();
    let target = TargetId::new(0x0600_0013);

    registry
        .attach_replace(
            target,
            Arc::new(|args, core| Ok(format!("inner({})", core(args)?))),
        )
        .unwrap();
    registry
        .attach_replace(
            target,
            Arc::new(|args, core| Ok(format!("outer({})", core(args)?))),
        )
        .unwrap();

    let result = registry
        .invoke(target, &mut 0, |_| Ok("core".to_string()))
        .unwrap();
    assert_eq!(result, "outer(inner(core))");
}

#[test]
fn detach_during_foreign_invocation_keeps_snapshot() {
    let registry: Arc<HookRegistry<u32, u32>> = Arc::new(HookRegistry::new());
    let target = TargetId::new(0x0600_0014);
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    // Two rendezvous points: invocation-started and detach-finished.
    let barrier = Arc::new(Barrier::new(2));

    let gate = Arc::clone(&barrier);
    let pause: BeforeFn<u32> = Arc::new(move |_| {
        gate.wait();
        gate.wait();
        Ok(())
    });
    registry.attach_before_ordered(target, pause, 0).unwrap();
    let late = registry
        .attach_before_ordered(target, recording(&log, "late"), 1)
        .unwrap();

    let worker_registry = Arc::clone(&registry);
    let worker = thread::spawn(move || {
        worker_registry
            .invoke(target, &mut 0, |_| Ok(0))
            .unwrap();
    });

    // The invocation snapshotted its observers before reaching the pause.
    barrier.wait();
    registry.detach(late).unwrap();
    barrier.wait();
    worker.join().unwrap();

    // The in-flight invocation still ran the detached observer.
    assert_eq!(*log.lock().unwrap(), vec!["late"]);

    // The next invocation no longer sees it; use a thread so the pause
    // observer's barrier has a peer.
    let worker_registry = Arc::clone(&registry);
    let worker = thread::spawn(move || {
        worker_registry
            .invoke(target, &mut 0, |_| Ok(0))
            .unwrap();
    });
    barrier.wait();
    barrier.wait();
    worker.join().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["late"]);
}

#[test]
fn concurrent_invocations_of_one_target_do_not_serialize_registrations() {
    let registry: Arc<HookRegistry<u32, u32>> = Arc::new(HookRegistry::new());
    let target = TargetId::new(0x0600_0015);
    let invocations = Arc::new(AtomicU32::new(0));

    let count = Arc::clone(&invocations);
    registry
        .attach_before(
            target,
            Arc::new(move |_| {
                count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }),
        )
        .unwrap();

    let mut workers = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        workers.push(thread::spawn(move || {
            for _ in 0..100 {
                registry.invoke(target, &mut 0, |args| Ok(*args)).unwrap();
            }
        }));
    }
    // Churn registrations while the invocations run.
    for _ in 0..50 {
        let churn: BeforeFn<u32> = Arc::new(|_| Ok(()));
        let handle = registry.attach_before_ordered(target, churn, 5).unwrap();
        registry.detach(handle).unwrap();
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(invocations.load(Ordering::Relaxed), 800);
    assert_eq!(registry.observer_count(target).unwrap(), 1);
}

#[test]
fn reattach_after_full_detach_resets_position() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0016);
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let movable = recording(&log, "movable");
    let handle = registry
        .attach_before(target, movable.clone())
        .unwrap();
    registry
        .attach_before(target, recording(&log, "anchor"))
        .unwrap();

    registry.invoke(target, &mut 0, |_| Ok(0)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["movable", "anchor"]);

    log.lock().unwrap().clear();
    registry.detach(handle).unwrap();
    registry.attach_before(target, movable).unwrap();

    registry.invoke(target, &mut 0, |_| Ok(0)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["anchor", "movable"]);
}

#[test]
fn replace_observer_errors_carry_target_and_kind_context() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0018);
    let core_runs = Arc::new(AtomicU32::new(0));

    registry
        .attach_replace(target, Arc::new(|_, _| Err("replacement refused".into())))
        .unwrap();

    let runs = Arc::clone(&core_runs);
    let err = registry
        .invoke(target, &mut 0, move |_| {
            runs.fetch_add(1, Ordering::Relaxed);
            Ok(0)
        })
        .unwrap_err();

    assert!(err.to_string().contains("replacement refused"));
    match err {
        Error::Observer {
            target: t, kind, ..
        } => {
            assert_eq!(t, target);
            assert_eq!(kind, HookKind::Replace);
        }
        other => panic!("expected Observer error, got {other:?}"),
    }
    // The failing replacement never called through to the original.
    assert_eq!(core_runs.load(Ordering::Relaxed), 0);
}

#[test]
fn observer_errors_carry_target_and_kind_context() {
    let registry: HookRegistry<u32, u32> = HookRegistry::new();
    let target = TargetId::new(0x0600_0017);

    registry
        .attach_after(target, Arc::new(|_, _| Err("postcondition violated".into())))
        .unwrap();

    let err = registry.invoke(target, &mut 0, |_| Ok(0)).unwrap_err();
    assert!(err.to_string().contains("postcondition violated"));
    match err {
        Error::Observer {
            target: t, kind, ..
        } => {
            assert_eq!(t, target);
            assert_eq!(kind, HookKind::After);
        }
        other => panic!("expected Observer error, got {other:?}"),
    }
}
