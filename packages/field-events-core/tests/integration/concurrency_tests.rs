//! Concurrent dispatch against a registry that keeps changing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ntest::timeout;
use field_events_core::{ChangeDispatcher, Phase, Snapshot};

#[timeout(5000)]
#[test]
fn test_dispatch_while_registering() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher: Arc<ChangeDispatcher<()>> = Arc::new(ChangeDispatcher::new());
    let counter = calls.clone();
    dispatcher.register_handler(Phase::AfterUpdate, "status", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let old = Snapshot::new().with("status", "pending");
    let new = Snapshot::new().with("status", "done");

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let (old, new) = (old.clone(), new.clone());
            thread::spawn(move || {
                for _ in 0..100 {
                    let result = dispatcher.after_update(&(), &(), &old, &new);
                    assert_eq!(result.invoked, 1);
                }
            })
        })
        .collect();

    let writer = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            for i in 0..100 {
                dispatcher.register_handler(Phase::AfterUpdate, &format!("field_{}", i), |_| Ok(()));
            }
        })
    };

    for handle in readers {
        handle.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 400);
    assert_eq!(dispatcher.registry().len(), 101);
    assert!(dispatcher.registry().contains(Phase::AfterUpdate, "status"));
}
