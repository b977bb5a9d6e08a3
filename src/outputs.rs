//! Registry of output archive names shared by jobs and collectors.
//!
//! Every output file name has one lock. A job holds it while moving its
//! archive into place; a collector holds it from reading an output until
//! deleting it. Names a running job is still producing are tracked as
//! in flight, so a second job with the same name is given an output name
//! tagged with its own id instead of overwriting the first.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Registry {
    locks: HashMap<String, Arc<Mutex<()>>>,
    in_flight: HashSet<String>,
}

/// Per-name locks and in-flight claims for the processed directory
#[derive(Debug, Default)]
pub struct OutputLocks {
    registry: Mutex<Registry>,
}

impl OutputLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock guarding the output file `name`
    pub fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.registry().locks.entry(name.to_string()).or_default())
    }

    /// Drop locks nobody holds a handle to
    pub fn prune(&self) {
        self.registry()
            .locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.registry().in_flight.contains(name)
    }

    /// Number of lock entries currently kept
    pub fn len(&self) -> usize {
        self.registry().locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `preferred` for a job, or `fallback` when another job is still
    /// producing `preferred`. The claim is released when dropped.
    pub fn claim(self: &Arc<Self>, preferred: String, fallback: String) -> OutputClaim {
        let mut registry = self.registry();
        let name = if registry.in_flight.contains(&preferred) {
            tracing::info!("Output {} is in flight, using {}", preferred, fallback);
            fallback
        } else {
            preferred
        };
        registry.in_flight.insert(name.clone());
        OutputClaim {
            locks: Arc::clone(self),
            name,
        }
    }
}

/// A job's exclusive claim on an output name
#[derive(Debug)]
pub struct OutputClaim {
    locks: Arc<OutputLocks>,
    name: String,
}

impl OutputClaim {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock(&self) -> Arc<Mutex<()>> {
        self.locks.lock_for(&self.name)
    }
}

impl Drop for OutputClaim {
    fn drop(&mut self) {
        self.locks.registry().in_flight.remove(&self.name);
        self.locks.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_gets_fallback() {
        let locks = Arc::new(OutputLocks::new());

        let first = locks.claim("a.zip".into(), "a_1.zip".into());
        let second = locks.claim("a.zip".into(), "a_2.zip".into());
        assert_eq!(first.name(), "a.zip");
        assert_eq!(second.name(), "a_2.zip");
        assert!(locks.is_in_flight("a.zip"));

        drop(first);
        assert!(!locks.is_in_flight("a.zip"));
        let third = locks.claim("a.zip".into(), "a_3.zip".into());
        assert_eq!(third.name(), "a.zip");
    }

    #[test]
    fn test_released_claims_leave_no_locks() {
        let locks = Arc::new(OutputLocks::new());
        let claim = locks.claim("a.zip".into(), "b.zip".into());
        let lock = claim.lock();
        drop(lock.lock().unwrap());
        drop(lock);
        drop(claim);
        assert!(locks.is_empty());
    }
}
