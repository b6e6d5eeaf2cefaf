//! Isolation Domain Tests
//!
//! Where dispatch tables are realized, how sealed boundaries degrade to
//! public-only dispatch, and how domains follow the lifetime of their
//! boundary.
//!
//! # Running Tests
//! ```bash
//! cargo test --test domain_isolation_tests
//! ```

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{init_tracing, Person};
use mirror_engine::{
    dispatcher_name, Access, DomainRegistry, ManualClock, Reflector, ReflectorOptions,
};
use mirror_types::{Boundary, ClassBuilder, ClassRef};

fn widget_in(boundary: &Arc<Boundary>, name: &str) -> ClassRef {
    ClassBuilder::<Person>::new(name)
        .in_boundary(boundary)
        .getter("getAge", |p| p.age)
        .build()
}

fn reflector_with(domains: Arc<DomainRegistry>) -> Reflector {
    Reflector::from_parts(
        ReflectorOptions::default(),
        domains,
        Arc::new(ManualClock::new()),
    )
}

// ===== Realization Tests =====

#[test]
fn test_open_boundary_hosts_full_access_table() {
    init_tracing();
    let reflector = Reflector::new();
    let plugins = Boundary::new("plugins");
    let class = widget_in(&plugins, "plugins.Widget");

    let dispatcher = reflector.accessor(&class).unwrap();
    assert_eq!(dispatcher.access(), Access::NonPrivate);
    assert_eq!(dispatcher.domain().boundary_id(), plugins.id());
    assert!(plugins.artifact(&dispatcher_name(&class)).is_some());
    assert!(dispatcher.domain().has_produced(&dispatcher_name(&class)));
}

#[test]
fn test_sealed_boundary_keeps_table_in_domain() {
    let reflector = Reflector::new();
    let vendor = Boundary::sealed("vendor");
    let class = widget_in(&vendor, "vendor.Widget");

    let dispatcher = reflector.accessor(&class).unwrap();
    assert_eq!(dispatcher.access(), Access::PublicOnly);
    assert_eq!(vendor.artifact_count(), 0);
    assert!(dispatcher.domain().has_produced(&dispatcher_name(&class)));
}

#[test]
fn test_classes_of_one_boundary_share_a_domain() {
    let reflector = Reflector::new();
    let app = Boundary::new("app");
    let a = reflector.accessor(&widget_in(&app, "app.A")).unwrap();
    let b = reflector.accessor(&widget_in(&app, "app.B")).unwrap();
    assert!(Arc::ptr_eq(a.domain(), b.domain()));
    assert_eq!(a.domain().produced_count(), 2);

    let other = reflector
        .accessor(&widget_in(&Boundary::new("other"), "other.A"))
        .unwrap();
    assert!(!Arc::ptr_eq(a.domain(), other.domain()));
}

#[test]
fn test_concurrent_domain_creation_yields_one_domain() {
    let registry = Arc::new(DomainRegistry::new());
    let boundary = Boundary::new("cold");
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let boundary = boundary.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.domain_for(&boundary)
            })
        })
        .collect();
    let domains: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for domain in &domains[1..] {
        assert!(Arc::ptr_eq(&domains[0], domain));
    }
    assert_eq!(registry.live_domains(), 1);
}

// ===== Lifetime Tests =====

#[test]
fn test_registry_does_not_keep_boundaries_alive() {
    let registry = Arc::new(DomainRegistry::new());
    let reflector = reflector_with(registry.clone());

    let boundary = Boundary::new("transient");
    let weak = Arc::downgrade(&boundary);
    let class = widget_in(&boundary, "transient.Widget");
    reflector.accessor(&class).unwrap();
    assert_eq!(registry.live_domains(), 1);

    // The cached dispatcher holds the class, which holds the boundary
    reflector.cache().invalidate_all();
    drop(class);
    drop(boundary);

    assert!(weak.upgrade().is_none());
    assert_eq!(registry.live_domains(), 0);
    assert_eq!(registry.prune(), 1);
}

#[test]
fn test_release_forgets_domain() {
    let registry = Arc::new(DomainRegistry::new());
    let reflector = reflector_with(registry.clone());
    let boundary = Boundary::new("released");
    let class = widget_in(&boundary, "released.Widget");

    let first = reflector.accessor(&class).unwrap();
    assert!(registry.release(boundary.id()));

    reflector.cache().invalidate(&class);
    let second = reflector.accessor(&class).unwrap();
    assert!(!Arc::ptr_eq(first.domain(), second.domain()));
    // The table defined in the boundary is still found by the new domain
    assert!(Arc::ptr_eq(first.table(), second.table()));
}

#[test]
fn test_dropped_classes_leave_no_tables_behind() {
    // The home boundary plays the part of the system boundary here
    let home = Boundary::new("home");
    let registry = Arc::new(DomainRegistry::with_home(home.clone()));
    let reflector = reflector_with(registry.clone());
    let guest = Boundary::new("guest");
    let baseline = (home.artifact_count(), guest.artifact_count());

    for i in 0..200 {
        let boundary = if i % 2 == 0 { &home } else { &guest };
        let class = widget_in(boundary, &format!("churn.Widget{}", i));
        let dispatcher = reflector.accessor(&class).unwrap();
        assert_eq!(dispatcher.access(), Access::NonPrivate);
        drop(dispatcher);
        reflector.cache().invalidate(&class);
    }

    assert!(reflector.cache().is_empty());
    assert_eq!((home.artifact_count(), guest.artifact_count()), baseline);
    assert_eq!(registry.live_domains(), 0);
}

#[test]
fn test_live_dispatcher_keeps_its_table_reachable() {
    let registry = Arc::new(DomainRegistry::new());
    let reflector = reflector_with(registry.clone());
    let boundary = Boundary::new("kept");
    let class = widget_in(&boundary, "kept.Widget");

    let held = reflector.accessor(&class).unwrap();
    reflector.cache().invalidate(&class);
    let again = reflector.accessor(&class).unwrap();
    assert!(!Arc::ptr_eq(&held, &again));
    assert!(Arc::ptr_eq(held.table(), again.table()));
    assert_eq!(boundary.artifact_count(), 1);

    drop(held);
    drop(again);
    assert_eq!(boundary.artifact_count(), 0);
}
