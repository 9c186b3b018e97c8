//! Reference-Counting Lifecycle Tests
//!
//! Validates the manual retain/release contract: creation starts the count
//! at one, N retains followed by N releases return to baseline without
//! destroying the object, the final release tears it down exactly once, and
//! counts on one object stay exact under concurrent retain/release traffic.

use sable_runtime::{
    class_create_instance, get_class, init_symtab, release, retain, retain_count, ClassDef, Id,
    Symtab,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// `RcCounted` is only ever allocated by the baseline test below, so its
// finalizer count cannot be disturbed by concurrently running tests.
static COUNTED_FINALIZED: AtomicUsize = AtomicUsize::new(0);

fn count_finalize(_obj: Id) {
    COUNTED_FINALIZED.fetch_add(1, Ordering::AcqRel);
}

static FINALIZE_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn base_finalize(_obj: Id) {
    FINALIZE_ORDER.lock().expect("order lock").push("base");
}

fn derived_finalize(_obj: Id) {
    FINALIZE_ORDER.lock().expect("order lock").push("derived");
}

static CLASSES: [ClassDef; 4] = [
    ClassDef::new("RcPlain", 8),
    ClassDef {
        finalize: Some(count_finalize),
        ..ClassDef::new("RcCounted", 8)
    },
    ClassDef {
        finalize: Some(base_finalize),
        ..ClassDef::new("RcBase", 8)
    },
    ClassDef {
        superclass: Some("RcBase"),
        finalize: Some(derived_finalize),
        ..ClassDef::new("RcDerived", 8)
    },
];

static TABLE: Symtab = Symtab::new(&[], &[], &CLASSES, &[]);

fn bootstrap() {
    init_symtab(&TABLE);
}

#[test]
fn test_creation_count_is_one() {
    bootstrap();
    let class = get_class("RcPlain").expect("class must be registered");
    let obj = class_create_instance(class);
    assert_eq!(retain_count(obj), 1);
    release(obj);
}

#[test]
fn test_retain_returns_receiver_and_increments() {
    bootstrap();
    let class = get_class("RcPlain").expect("class must be registered");
    let obj = class_create_instance(class);

    let chained = retain(retain(obj));
    assert_eq!(chained, obj);
    assert_eq!(retain_count(obj), 3);

    release(obj);
    release(obj);
    release(obj);
}

#[test]
fn test_n_retains_n_releases_keeps_object_alive() {
    bootstrap();
    let class = get_class("RcCounted").expect("class must be registered");
    let obj = class_create_instance(class);

    const N: usize = 100;
    for _ in 0..N {
        retain(obj);
    }
    assert_eq!(retain_count(obj), N + 1);
    for _ in 0..N {
        release(obj);
    }

    // Back at baseline, still alive.
    assert_eq!(retain_count(obj), 1);
    assert_eq!(COUNTED_FINALIZED.load(Ordering::Acquire), 0);

    // The (N+1)-th release tears the object down.
    release(obj);
    assert_eq!(COUNTED_FINALIZED.load(Ordering::Acquire), 1);
}

#[test]
fn test_finalizers_run_most_derived_first() {
    bootstrap();
    let class = get_class("RcDerived").expect("class must be registered");
    // Derived layout includes the superclass's.
    assert_eq!(class.instance_size(), 16);

    let obj = class_create_instance(class);
    release(obj);

    let order = FINALIZE_ORDER.lock().expect("order lock");
    assert_eq!(order.as_slice(), &["derived", "base"]);
}

#[test]
fn test_distinct_objects_are_independent() {
    bootstrap();
    let class = get_class("RcPlain").expect("class must be registered");

    let first = class_create_instance(class);
    let second = class_create_instance(class);
    retain(second);

    // Destroying one object leaves the other's count untouched.
    release(first);
    assert_eq!(retain_count(second), 2);

    release(second);
    release(second);
}

#[test]
fn test_nil_retain_release_are_no_ops() {
    bootstrap();
    let nil = Id::nil();
    assert!(retain(nil).is_nil());
    release(nil);
    assert_eq!(retain_count(nil), 0);
}

#[test]
fn test_concurrent_retain_release_loses_no_updates() {
    bootstrap();
    let class = get_class("RcPlain").expect("class must be registered");
    let obj = class_create_instance(class);

    const THREADS: usize = 8;
    const ROUNDS: usize = 10_000;

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    retain(obj);
                    release(obj);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker must not panic");
    }

    // Every retain found its release; the creation reference remains.
    assert_eq!(retain_count(obj), 1);
    release(obj);
}

#[test]
fn test_concurrent_hold_and_release() {
    bootstrap();
    let class = get_class("RcPlain").expect("class must be registered");
    let obj = class_create_instance(class);

    const THREADS: usize = 8;

    // Each thread takes its own reference up front...
    for _ in 0..THREADS {
        retain(obj);
    }
    // ...and drops it from its own thread.
    let workers: Vec<_> = (0..THREADS)
        .map(|_| std::thread::spawn(move || release(obj)))
        .collect();
    for worker in workers {
        worker.join().expect("worker must not panic");
    }

    assert_eq!(retain_count(obj), 1);
    release(obj);
}
