//! Isolation domains
//!
//! A domain realizes dispatch tables for the classes of one boundary. It first
//! offers the full-access table to the boundary itself, so the table may call
//! the boundary's non-public operations. A sealed boundary refuses, and the
//! domain keeps a public-only table of its own instead.
//!
//! The registry holds domains and boundaries weakly. Dispatchers keep their
//! domain alive; a boundary is kept alive by its classes.
//!
//! Realized tables are owned by the dispatchers built on them. Neither the
//! boundary nor the domain keeps a table alive, so a table goes away with the
//! last dispatcher of its class and is realized afresh on the next request.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mirror_types::{Artifact, Boundary, BoundaryId};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use super::synthesizer::{Access, DispatchTable};
use crate::error::ReflectResult;

/// Code-loading scope for the dispatch tables of one boundary
pub struct IsolationDomain {
    boundary: Weak<Boundary>,
    boundary_id: BoundaryId,
    boundary_name: String,
    /// Names of tables this domain has realized
    produced: Mutex<FxHashSet<String>>,
    /// Public-only tables realized outside the boundary
    local: RwLock<FxHashMap<String, Weak<DispatchTable>>>,
    /// Serializes realization within this domain
    define_lock: Mutex<()>,
}

impl IsolationDomain {
    fn new(boundary: &Arc<Boundary>) -> Self {
        Self {
            boundary: Arc::downgrade(boundary),
            boundary_id: boundary.id(),
            boundary_name: boundary.name().to_string(),
            produced: Mutex::new(FxHashSet::default()),
            local: RwLock::new(FxHashMap::default()),
            define_lock: Mutex::new(()),
        }
    }

    /// The served boundary, if it is still alive
    pub fn boundary(&self) -> Option<Arc<Boundary>> {
        self.boundary.upgrade()
    }

    /// ID of the served boundary
    pub fn boundary_id(&self) -> BoundaryId {
        self.boundary_id
    }

    /// Name of the served boundary
    pub fn boundary_name(&self) -> &str {
        &self.boundary_name
    }

    /// Whether this domain has realized `name`
    pub fn has_produced(&self, name: &str) -> bool {
        self.produced.lock().contains(name)
    }

    /// Number of tables this domain has realized
    pub fn produced_count(&self) -> usize {
        self.produced.lock().len()
    }

    /// Find an already realized table that is still alive
    pub fn load(&self, name: &str) -> Option<Arc<DispatchTable>> {
        if self.has_produced(name) {
            if let Some(table) = self.local.read().get(name).and_then(Weak::upgrade) {
                return Some(table);
            }
        }
        let artifact = self.boundary.upgrade()?.artifact(name)?;
        artifact.downcast::<DispatchTable>().ok()
    }

    /// Forget tables that no dispatcher holds anymore
    ///
    /// Must be called with `define_lock` held.
    fn forget_dead(&self) {
        self.local
            .write()
            .retain(|_, table| table.strong_count() > 0);
        let local = self.local.read();
        let boundary = self.boundary.upgrade();
        self.produced.lock().retain(|name| {
            local.contains_key(name)
                || boundary
                    .as_ref()
                    .map_or(false, |b| b.artifact(name).is_some())
        });
    }

    /// Return the table called `name`, building it on first request
    ///
    /// `build` is called with the access level the table will run under.
    pub fn realize<F>(&self, name: &str, build: F) -> ReflectResult<Arc<DispatchTable>>
    where
        F: Fn(Access) -> ReflectResult<DispatchTable>,
    {
        if let Some(table) = self.load(name) {
            return Ok(table);
        }

        let _guard = self.define_lock.lock();
        if let Some(table) = self.load(name) {
            return Ok(table);
        }
        self.forget_dead();

        if let Some(boundary) = self.boundary.upgrade() {
            let table = Arc::new(build(Access::NonPrivate)?);
            let artifact: Artifact = table.clone();
            match boundary.define_artifact(name, &artifact) {
                Ok(()) => {
                    self.produced.lock().insert(name.to_string());
                    return Ok(table);
                }
                Err(refused) => {
                    tracing::debug!(
                        boundary = %refused.boundary,
                        table = name,
                        "boundary refused definition, realizing public-only table"
                    );
                }
            }
        }

        let table = Arc::new(build(Access::PublicOnly)?);
        self.local
            .write()
            .insert(name.to_string(), Arc::downgrade(&table));
        self.produced.lock().insert(name.to_string());
        Ok(table)
    }
}

impl fmt::Debug for IsolationDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolationDomain")
            .field("boundary", &self.boundary_name)
            .field("produced", &self.produced_count())
            .field("local", &self.local.read().len())
            .finish()
    }
}

struct DomainSlot {
    boundary: Weak<Boundary>,
    domain: Weak<IsolationDomain>,
}

impl DomainSlot {
    fn live(&self) -> Option<Arc<IsolationDomain>> {
        if self.boundary.strong_count() == 0 {
            return None;
        }
        self.domain.upgrade()
    }
}

/// Registry of isolation domains, one per boundary
pub struct DomainRegistry {
    home: Arc<Boundary>,
    home_domain: Arc<IsolationDomain>,
    domains: DashMap<BoundaryId, DomainSlot>,
}

impl DomainRegistry {
    /// Create a registry whose home is the system boundary
    pub fn new() -> Self {
        Self::with_home(Boundary::system())
    }

    /// Create a registry with a specific home boundary
    pub fn with_home(home: Arc<Boundary>) -> Self {
        let home_domain = Arc::new(IsolationDomain::new(&home));
        Self {
            home,
            home_domain,
            domains: DashMap::new(),
        }
    }

    /// The boundary served by the fast-path domain
    pub fn home(&self) -> &Arc<Boundary> {
        &self.home
    }

    /// Domain for `boundary`, creating it on first use
    pub fn domain_for(&self, boundary: &Arc<Boundary>) -> Arc<IsolationDomain> {
        if Arc::ptr_eq(boundary, &self.home) {
            return self.home_domain.clone();
        }

        let id = boundary.id();
        if let Some(slot) = self.domains.get(&id) {
            if let Some(domain) = slot.live() {
                return domain;
            }
        }

        // The entry holds the shard lock, so only one caller creates the domain
        match self.domains.entry(id) {
            Entry::Occupied(mut entry) => {
                if let Some(domain) = entry.get().live() {
                    return domain;
                }
                let domain = Arc::new(IsolationDomain::new(boundary));
                entry.insert(DomainSlot {
                    boundary: Arc::downgrade(boundary),
                    domain: Arc::downgrade(&domain),
                });
                tracing::debug!(boundary = boundary.name(), "recreated isolation domain");
                domain
            }
            Entry::Vacant(entry) => {
                let domain = Arc::new(IsolationDomain::new(boundary));
                entry.insert(DomainSlot {
                    boundary: Arc::downgrade(boundary),
                    domain: Arc::downgrade(&domain),
                });
                tracing::debug!(boundary = boundary.name(), "created isolation domain");
                domain
            }
        }
    }

    /// Forget the domain of a boundary
    pub fn release(&self, id: BoundaryId) -> bool {
        self.domains.remove(&id).is_some()
    }

    /// Drop entries whose boundary or domain has been reclaimed
    pub fn prune(&self) -> usize {
        let before = self.domains.len();
        self.domains.retain(|_, slot| slot.live().is_some());
        before.saturating_sub(self.domains.len())
    }

    /// Number of registered domains still alive (the home domain excluded)
    pub fn live_domains(&self) -> usize {
        self.domains
            .iter()
            .filter(|entry| entry.value().live().is_some())
            .count()
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("home", &self.home.name())
            .field("domains", &self.domains.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::catalog::discover;
    use crate::reflect::synthesizer::build_table;
    use mirror_types::{ClassBuilder, ClassRef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Widget;

    fn widget_in(boundary: &Arc<Boundary>) -> ClassRef {
        ClassBuilder::<Widget>::new("ui.Widget")
            .in_boundary(boundary)
            .getter("getId", |_| 1i32)
            .build()
    }

    fn realize(
        domain: &IsolationDomain,
        class: &ClassRef,
        builds: &AtomicUsize,
    ) -> Arc<DispatchTable> {
        let catalog = discover(class).unwrap();
        domain
            .realize("ui.Widget$Dispatcher", |access| {
                builds.fetch_add(1, Ordering::SeqCst);
                build_table(class, &catalog, "ui.Widget$Dispatcher", access, "test")
            })
            .unwrap()
    }

    #[test]
    fn test_home_fast_path() {
        let registry = DomainRegistry::new();
        let a = registry.domain_for(&Boundary::system());
        let b = registry.domain_for(&Boundary::system());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.live_domains(), 0);
    }

    #[test]
    fn test_one_domain_per_boundary() {
        let registry = DomainRegistry::new();
        let plugins = Boundary::new("plugins");
        let a = registry.domain_for(&plugins);
        let b = registry.domain_for(&plugins);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.boundary_id(), plugins.id());

        let other = registry.domain_for(&Boundary::new("other"));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_realize_defines_in_open_boundary() {
        let registry = DomainRegistry::new();
        let boundary = Boundary::new("app");
        let class = widget_in(&boundary);
        let domain = registry.domain_for(&boundary);
        let builds = AtomicUsize::new(0);

        let first = realize(&domain, &class, &builds);
        let second = realize(&domain, &class, &builds);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(first.access(), Access::NonPrivate);
        assert!(domain.has_produced("ui.Widget$Dispatcher"));
        assert_eq!(boundary.artifact_count(), 1);
    }

    #[test]
    fn test_sealed_boundary_falls_back_to_public_only() {
        let registry = DomainRegistry::new();
        let boundary = Boundary::sealed("vendor");
        let class = widget_in(&boundary);
        let domain = registry.domain_for(&boundary);
        let builds = AtomicUsize::new(0);

        let table = realize(&domain, &class, &builds);
        assert_eq!(table.access(), Access::PublicOnly);
        assert_eq!(boundary.artifact_count(), 0);
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        let again = realize(&domain, &class, &builds);
        assert!(Arc::ptr_eq(&table, &again));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_table_lives_only_as_long_as_its_holders() {
        let registry = DomainRegistry::new();
        let boundary = Boundary::new("app");
        let class = widget_in(&boundary);
        let domain = registry.domain_for(&boundary);
        let builds = AtomicUsize::new(0);

        let table = realize(&domain, &class, &builds);
        let weak = Arc::downgrade(&table);
        drop(table);
        assert!(weak.upgrade().is_none());
        assert_eq!(boundary.artifact_count(), 0);
        assert!(domain.load("ui.Widget$Dispatcher").is_none());

        let rebuilt = realize(&domain, &class, &builds);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(rebuilt.access(), Access::NonPrivate);
        assert_eq!(domain.produced_count(), 1);
    }

    #[test]
    fn test_sealed_local_table_is_not_retained() {
        let registry = DomainRegistry::new();
        let boundary = Boundary::sealed("vendor");
        let class = widget_in(&boundary);
        let domain = registry.domain_for(&boundary);
        let builds = AtomicUsize::new(0);

        drop(realize(&domain, &class, &builds));
        assert!(domain.load("ui.Widget$Dispatcher").is_none());

        let table = realize(&domain, &class, &builds);
        assert_eq!(table.access(), Access::PublicOnly);
        assert_eq!(builds.load(Ordering::SeqCst), 4);
        assert_eq!(domain.local.read().len(), 1);
        assert_eq!(domain.produced_count(), 1);
    }

    #[test]
    fn test_dropped_domain_is_pruned() {
        let registry = DomainRegistry::new();
        let boundary = Boundary::new("short-lived");
        let domain = registry.domain_for(&boundary);
        assert_eq!(registry.live_domains(), 1);

        drop(domain);
        assert_eq!(registry.live_domains(), 0);
        assert_eq!(registry.prune(), 1);

        let fresh = registry.domain_for(&boundary);
        assert_eq!(fresh.produced_count(), 0);
        assert!(registry.release(boundary.id()));
        assert!(!registry.release(boundary.id()));
    }
}
