// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::fleet_dataset::VehiclePosition;
use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest known position per vehicle. The handle is clone-cheap; writers
/// are the dispatcher and the snapshot fetcher, readers get owned copies.
/// Entries are only ever removed by a full replacement.
#[derive(Clone, Default)]
pub struct PositionStore {
    positions: Arc<RwLock<AHashMap<String, VehiclePosition>>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full replace: afterwards the store holds exactly the given list.
    pub async fn replace_all(&self, positions: Vec<VehiclePosition>) {
        let mut map = self.positions.write().await;
        map.clear();
        for position in positions {
            map.insert(position.vehicle_id.clone(), position);
        }
    }

    /// Insert-or-replace by vehicle id, whole entries only.
    pub async fn upsert(&self, position: VehiclePosition) {
        let mut map = self.positions.write().await;
        map.insert(position.vehicle_id.clone(), position);
    }

    pub async fn get(&self, vehicle_id: &str) -> Option<VehiclePosition> {
        self.positions.read().await.get(vehicle_id).cloned()
    }

    pub async fn snapshot(&self) -> AHashMap<String, VehiclePosition> {
        self.positions.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.positions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(vehicle_id: &str, latitude: f64) -> VehiclePosition {
        VehiclePosition {
            vehicle_id: vehicle_id.to_string(),
            latitude,
            longitude: -118.0,
            heading: None,
            speed: None,
            timestamp: "2025-06-01T17:00:00Z".to_string(),
            status: "in_service".to_string(),
            route_id: None,
            current_stop: None,
            moving: false,
            fuel_level: None,
            battery_level: None,
        }
    }

    #[tokio::test]
    async fn replace_all_discards_prior_entries() {
        let store = PositionStore::new();
        store.replace_all(vec![position("T1", 1.0), position("T2", 2.0)]).await;
        assert_eq!(store.len().await, 2);

        store.replace_all(vec![position("T3", 3.0)]).await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("T3"));
        assert!(!snapshot.contains_key("T1"));
    }

    #[tokio::test]
    async fn upsert_inserts_unseen_and_replaces_known() {
        let store = PositionStore::new();
        store.upsert(position("T1", 1.0)).await;
        assert_eq!(store.len().await, 1);

        store.upsert(position("T2", 2.0)).await;
        assert_eq!(store.len().await, 2);

        store.upsert(position("T1", 9.0)).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("T1").await.unwrap().latitude, 9.0);
    }

    #[tokio::test]
    async fn last_update_wins_regardless_of_count() {
        let store = PositionStore::new();
        for step in 0..50 {
            store.upsert(position("T1", step as f64)).await;
        }
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("T1").await.unwrap().latitude, 49.0);
    }

    #[tokio::test]
    async fn reapplying_an_identical_update_is_idempotent() {
        let store = PositionStore::new();
        store.upsert(position("T1", 1.0)).await;
        let before = store.snapshot().await;
        store.upsert(position("T1", 1.0)).await;
        assert_eq!(store.snapshot().await, before);
    }
}
