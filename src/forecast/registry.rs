use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use super::slot::TrainedModel;

// ---

/// Resident model of one city; `None` until trained or loaded.
pub(crate) type CitySlot = Arc<AsyncMutex<Option<Arc<TrainedModel>>>>;

/// In-memory models keyed by lowercased city name.
///
/// Each city has its own async lock. Train, load and predict for one city
/// run under that lock; different cities never contend.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    slots: Mutex<HashMap<String, CitySlot>>,
}

impl ModelRegistry {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `city`, created on first use.
    pub(crate) fn slot(&self, city: &str) -> CitySlot {
        // ---
        let mut slots = self.slots.lock().expect("model registry lock poisoned");
        slots.entry(city.to_lowercase()).or_default().clone()
    }

    /// The resident model for `city`, waiting for any in-flight training.
    pub async fn resident(&self, city: &str) -> Option<Arc<TrainedModel>> {
        // ---
        let slot = self.slot(city);
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Drop the resident model for `city`; the persisted slot is untouched.
    pub async fn evict(&self, city: &str) -> bool {
        // ---
        let slot = self.slot(city);
        let mut guard = slot.lock().await;
        guard.take().is_some()
    }

    /// Lowercased names of cities with a resident model.
    pub async fn resident_cities(&self) -> Vec<String> {
        // ---
        let entries: Vec<(String, CitySlot)> = {
            let slots = self.slots.lock().expect("model registry lock poisoned");
            slots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut names = Vec::new();
        for (name, slot) in entries {
            if slot.lock().await.is_some() {
                names.push(name);
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_slots_are_case_insensitive() {
        // ---
        let registry = ModelRegistry::new();
        let a = registry.slot("Delhi");
        let b = registry.slot("DELHI");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.slot("Mumbai")));
    }

    #[tokio::test]
    async fn test_empty_registry_has_no_residents() {
        // ---
        let registry = ModelRegistry::new();
        assert!(registry.resident("Delhi").await.is_none());
        assert!(!registry.evict("Delhi").await);
        assert!(registry.resident_cities().await.is_empty());
    }
}
