//! Accessor Cache Concurrency Tests
//!
//! Single-flight synthesis, identity under concurrent access, failure
//! propagation to waiters, and expiry driven by a manual clock.
//!
//! # Running Tests
//! ```bash
//! cargo test --test cache_concurrency_tests
//! ```

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::{broken_class, init_tracing, person_class, Person};
use mirror_engine::{
    CacheOptions, ManualClock, ReflectError, Reflector, ReflectorOptions, TypeDispatcher,
};
use mirror_types::{ClassBuilder, Object, Value};

const THREADS: usize = 16;

fn reflector_with_clock(cache: CacheOptions) -> (Arc<Reflector>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let reflector = Reflector::with_options_and_clock(ReflectorOptions::with_cache(cache), clock.clone());
    (Arc::new(reflector), clock)
}

// ===== Single-Flight Tests =====

#[test]
fn test_concurrent_first_access_synthesizes_once() {
    init_tracing();
    let (reflector, _) = reflector_with_clock(CacheOptions::default());
    let person = person_class();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let reflector = reflector.clone();
            let person = person.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                reflector.accessor(&person).unwrap()
            })
        })
        .collect();
    let dispatchers: Vec<Arc<TypeDispatcher>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    for dispatcher in &dispatchers[1..] {
        assert!(Arc::ptr_eq(&dispatchers[0], dispatcher));
    }
    let stats = reflector.cache().stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(reflector.cache().synthesizer().compilations(), 1);
    assert_eq!(stats.hits + stats.misses, THREADS as u64);
}

#[test]
fn test_slow_build_is_shared_by_waiters() {
    let (reflector, _) = reflector_with_clock(CacheOptions::default());
    let person = person_class();
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let reflector = reflector.clone();
            let person = person.clone();
            let builds = builds.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                reflector.cache().get_or_insert_with(&person, || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    reflector.cache().synthesizer().compile(&person)
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    let first = results[0].as_ref().unwrap();
    assert!(results
        .iter()
        .all(|r| Arc::ptr_eq(first, r.as_ref().unwrap())));
}

#[test]
fn test_failure_reaches_every_waiter_and_is_retried() {
    let (reflector, _) = reflector_with_clock(CacheOptions::default());
    let class = broken_class("demo.Broken");
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let reflector = reflector.clone();
            let class = class.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                reflector.accessor(&class).map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        match handle.join().unwrap() {
            Err(err @ ReflectError::AccessorBuildFailed { .. }) => {
                assert!(matches!(err.root_cause(), ReflectError::MalformedType { .. }));
            }
            other => panic!("expected AccessorBuildFailed, got {:?}", other),
        }
    }
    assert!(reflector.cache().is_empty());

    // No negative caching: the next access synthesizes again
    let failures = reflector.cache().stats().failures;
    assert!(reflector.accessor(&class).is_err());
    assert_eq!(reflector.cache().stats().failures, failures + 1);
}

#[test]
fn test_distinct_types_build_independently() {
    let (reflector, _) = reflector_with_clock(CacheOptions::default());
    let classes: Vec<_> = (0..8)
        .map(|i| {
            ClassBuilder::<Person>::new(&format!("demo.Type{}", i))
                .getter("getAge", |p| p.age)
                .build()
        })
        .collect();

    let handles: Vec<_> = classes
        .iter()
        .cloned()
        .map(|class| {
            let reflector = reflector.clone();
            thread::spawn(move || {
                let obj = Object::new(class.clone(), Person { name: None, age: 11 });
                for _ in 0..100 {
                    assert_eq!(
                        reflector.get_field_value(&obj, "age").unwrap(),
                        Some(Value::Int(11))
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(reflector.cache().len(), 8);
    assert_eq!(reflector.cache().stats().builds, 8);
}

// ===== Expiry and Eviction Tests =====

#[test]
fn test_eviction_rebuilds_equivalent_dispatcher() {
    let (reflector, clock) =
        reflector_with_clock(CacheOptions::with_idle_timeout(Duration::from_secs(30 * 60)));
    let person = person_class();
    let obj = Object::new(person.clone(), Person::default());

    let before = reflector.accessor(&person).unwrap();
    reflector.set_field_value(&obj, "age", Value::Int(5)).unwrap();

    clock.advance(Duration::from_secs(30 * 60));
    let after = reflector.accessor(&person).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before.field_names(), after.field_names());
    assert_eq!(
        reflector.get_field_value(&obj, "age").unwrap(),
        Some(Value::Int(5))
    );
    assert_eq!(reflector.cache().stats().evictions, 1);
}

#[test]
fn test_options_loaded_from_json_bound_the_cache() {
    let options: ReflectorOptions =
        serde_json::from_str(r#"{"cache": {"max_capacity": 1, "idle_timeout": 5}}"#).unwrap();
    assert_eq!(options.cache.idle_timeout, Duration::from_secs(5));
    assert_eq!(options.cache.initial_capacity, 64);

    let clock = Arc::new(ManualClock::new());
    let reflector = Reflector::with_options_and_clock(options, clock.clone());
    let a = person_class();
    let b = ClassBuilder::<Person>::new("demo.Other")
        .getter("getAge", |p| p.age)
        .build();

    reflector.accessor(&a).unwrap();
    clock.advance(Duration::from_secs(1));
    reflector.accessor(&b).unwrap();
    assert_eq!(reflector.cache().len(), 1);
    assert!(reflector.cache().get_if_present(&a).is_none());
    assert!(reflector.cache().get_if_present(&b).is_some());

    clock.advance(Duration::from_secs(5));
    assert_eq!(reflector.cache().purge_expired(), 1);
}
