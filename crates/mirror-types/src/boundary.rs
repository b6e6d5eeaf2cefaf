//! Code-loading boundaries
//!
//! A [`Boundary`] is the scope that owns a group of classes, comparable to a
//! module or a class loader. Dispatch artifacts compiled for a class are
//! defined inside the class's boundary when it accepts foreign definitions,
//! which grants them access to the boundary's non-public operations.
//!
//! A boundary only holds its artifacts weakly. Whoever defines an artifact
//! keeps it alive; once the last strong reference goes, the entry is dead and
//! lookups no longer see it.
//!
//! Two boundaries always exist:
//! - [`Boundary::system()`]: owns the accessor engine itself and, by default,
//!   every class a host builds
//! - [`Boundary::bootstrap()`]: sealed, owns the builtin classes

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Artifact stored in a boundary's definition table
pub type Artifact = Arc<dyn Any + Send + Sync>;

type WeakArtifact = Weak<dyn Any + Send + Sync>;

/// Unique identifier for a Boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryId(u64);

impl BoundaryId {
    /// Create a new unique boundary ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        BoundaryId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for BoundaryId {
    fn default() -> Self {
        Self::new()
    }
}

/// A sealed boundary refused a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineRefused {
    /// Name of the refusing boundary
    pub boundary: String,
    /// Name of the artifact that was refused
    pub artifact: String,
}

impl fmt::Display for DefineRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "boundary '{}' refused definition of '{}'",
            self.boundary, self.artifact
        )
    }
}

static SYSTEM: Lazy<Arc<Boundary>> = Lazy::new(|| Arc::new(Boundary::new_inner("system", false)));
static BOOTSTRAP: Lazy<Arc<Boundary>> =
    Lazy::new(|| Arc::new(Boundary::new_inner("bootstrap", true)));

/// A code-loading boundary
pub struct Boundary {
    id: BoundaryId,
    name: String,
    sealed: bool,
    /// Artifacts defined inside this boundary, by name
    artifacts: RwLock<FxHashMap<String, WeakArtifact>>,
}

impl Boundary {
    fn new_inner(name: &str, sealed: bool) -> Self {
        Self {
            id: BoundaryId::new(),
            name: name.to_string(),
            sealed,
            artifacts: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a new open boundary
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::new_inner(name, false))
    }

    /// Create a boundary that refuses foreign definitions
    pub fn sealed(name: &str) -> Arc<Self> {
        Arc::new(Self::new_inner(name, true))
    }

    /// The boundary that owns the accessor engine
    pub fn system() -> Arc<Self> {
        SYSTEM.clone()
    }

    /// The sealed boundary that owns the builtin classes
    pub fn bootstrap() -> Arc<Self> {
        BOOTSTRAP.clone()
    }

    /// Get the boundary ID
    pub fn id(&self) -> BoundaryId {
        self.id
    }

    /// Get the boundary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this boundary refuses foreign definitions
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Define an artifact inside this boundary
    ///
    /// The boundary keeps only a weak reference: the artifact stays visible
    /// for as long as the caller (or anyone it hands the `Arc` to) holds it.
    /// An existing artifact with the same name is replaced, and entries whose
    /// artifact has been dropped are pruned.
    pub fn define_artifact(&self, name: &str, artifact: &Artifact) -> Result<(), DefineRefused> {
        if self.sealed {
            return Err(DefineRefused {
                boundary: self.name.clone(),
                artifact: name.to_string(),
            });
        }
        let mut artifacts = self.artifacts.write();
        artifacts.retain(|_, weak| weak.strong_count() > 0);
        artifacts.insert(name.to_string(), Arc::downgrade(artifact));
        Ok(())
    }

    /// Look up a previously defined artifact that is still alive
    pub fn artifact(&self, name: &str) -> Option<Artifact> {
        self.artifacts.read().get(name).and_then(Weak::upgrade)
    }

    /// Number of live artifacts defined in this boundary
    pub fn artifact_count(&self) -> usize {
        self.artifacts
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Forget every artifact defined in this boundary
    ///
    /// Returns how many of them were still alive.
    pub fn unload(&self) -> usize {
        let mut artifacts = self.artifacts.write();
        let count = artifacts
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count();
        artifacts.clear();
        count
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sealed", &self.sealed)
            .field("artifacts", &self.artifact_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_id_uniqueness() {
        let id1 = BoundaryId::new();
        let id2 = BoundaryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_system_boundary_is_singleton() {
        let a = Boundary::system();
        let b = Boundary::system();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_sealed());
        assert!(Boundary::bootstrap().is_sealed());
    }

    #[test]
    fn test_define_and_lookup_artifact() {
        let boundary = Boundary::new("plugins");
        let artifact: Artifact = Arc::new(42u32);
        boundary.define_artifact("answer", &artifact).unwrap();

        let found = boundary.artifact("answer").unwrap();
        assert_eq!(found.downcast_ref::<u32>(), Some(&42));
        assert!(boundary.artifact("missing").is_none());
    }

    #[test]
    fn test_sealed_boundary_refuses() {
        let boundary = Boundary::sealed("vendor");
        let err = boundary
            .define_artifact("thing", &(Arc::new(()) as Artifact))
            .unwrap_err();
        assert_eq!(err.boundary, "vendor");
        assert_eq!(boundary.artifact_count(), 0);
    }

    #[test]
    fn test_unload_clears_artifacts() {
        let boundary = Boundary::new("temp");
        let a: Artifact = Arc::new(1u8);
        let b: Artifact = Arc::new(2u8);
        boundary.define_artifact("a", &a).unwrap();
        boundary.define_artifact("b", &b).unwrap();
        assert_eq!(boundary.unload(), 2);
        assert_eq!(boundary.artifact_count(), 0);
        assert!(boundary.artifact("a").is_none());
    }

    #[test]
    fn test_dropped_artifact_is_forgotten() {
        let boundary = Boundary::new("weak");
        let kept: Artifact = Arc::new(1u8);
        boundary.define_artifact("kept", &kept).unwrap();
        for i in 0..10 {
            let transient: Artifact = Arc::new(i);
            boundary
                .define_artifact(&format!("transient{}", i), &transient)
                .unwrap();
        }
        assert_eq!(boundary.artifact_count(), 1);
        assert!(boundary.artifact("transient3").is_none());
        assert!(boundary.artifact("kept").is_some());

        // Dead entries are pruned on the next definition
        let next: Artifact = Arc::new(2u8);
        boundary.define_artifact("next", &next).unwrap();
        assert_eq!(boundary.artifacts.read().len(), 2);

        drop(kept);
        assert_eq!(boundary.artifact_count(), 1);
    }
}
