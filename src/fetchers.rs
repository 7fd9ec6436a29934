// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::errors::TrackingError;
use crate::fleet_dataset::{VehiclePosition, VehicleStats};
use crate::position_store::PositionStore;
use crate::shutdown::ShutdownSignal;
use ahash::AHashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// Pulls a full or filtered position snapshot over plain request/response,
/// independent of the streaming channel. Success replaces the store
/// wholesale; any failure leaves the last known good positions visible.
pub struct SnapshotFetcher {
    http: reqwest::Client,
    api_base: String,
    store: PositionStore,
    shutdown: ShutdownSignal,
    last_error: RwLock<Option<String>>,
}

impl SnapshotFetcher {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        store: PositionStore,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            store,
            shutdown,
            last_error: RwLock::new(None),
        }
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// One attempt, no retry; the caller decides whether to re-invoke.
    /// Returns the number of vehicles in the replacement set.
    pub async fn fetch_snapshot(
        &self,
        vehicle_ids: Option<&[String]>,
        route_id: Option<&str>,
    ) -> Result<usize, TrackingError> {
        let url = format!("{}/positions/live", self.api_base);
        let mut request = self.http.get(&url);
        if let Some(vehicle_ids) = vehicle_ids {
            let params: Vec<(&str, &str)> = vehicle_ids
                .iter()
                .map(|vehicle_id| ("vehicle_ids", vehicle_id.as_str()))
                .collect();
            request = request.query(&params);
        }
        if let Some(route_id) = route_id {
            request = request.query(&[("route_id", route_id)]);
        }

        let positions = match fetch_positions(request, &url).await {
            Ok(positions) => positions,
            Err(e) => {
                *self.last_error.write().await = Some(e.to_string());
                return Err(e);
            }
        };

        //a response that lands after teardown must not touch the store
        if self.shutdown.is_tripped() {
            return Err(TrackingError::query(
                &url,
                "client torn down while the request was in flight",
            ));
        }

        let count = positions.len();
        self.store.replace_all(positions).await;
        Ok(count)
    }
}

/// Read cache of aggregate per-vehicle records. Entries are refreshed only
/// on explicit request and never expire.
pub struct StatsFetcher {
    http: reqwest::Client,
    api_base: String,
    cache: RwLock<AHashMap<String, VehicleStats>>,
}

impl StatsFetcher {
    pub fn new(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            cache: RwLock::new(AHashMap::new()),
        }
    }

    pub async fn fetch_stats(&self, vehicle_id: &str) -> Result<VehicleStats, TrackingError> {
        let url = format!("{}/vehicles/{}/stats", self.api_base, vehicle_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TrackingError::query(&url, e))?;
        let stats = response
            .json::<VehicleStats>()
            .await
            .map_err(|e| TrackingError::query(&url, e))?;
        self.cache
            .write()
            .await
            .insert(vehicle_id.to_string(), stats.clone());
        Ok(stats)
    }

    pub async fn cached_stats(&self, vehicle_id: &str) -> Option<VehicleStats> {
        self.cache.read().await.get(vehicle_id).cloned()
    }
}

/// Past positions for one vehicle, newest window first per the backend's
/// ordering. Failures are swallowed into an empty sequence.
pub struct HistoryFetcher {
    http: reqwest::Client,
    api_base: String,
}

impl HistoryFetcher {
    pub fn new(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_history(&self, vehicle_id: &str, hours: u32) -> Vec<VehiclePosition> {
        let url = format!("{}/vehicles/{}/history", self.api_base, vehicle_id);
        let request = self.http.get(&url).query(&[("hours", hours)]);
        match fetch_positions(request, &url).await {
            Ok(positions) => positions,
            Err(e) => {
                warn!("history fetch failed, returning empty: {}", e);
                Vec::new()
            }
        }
    }
}

async fn fetch_positions(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<Vec<VehiclePosition>, TrackingError> {
    let response = request
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| TrackingError::query(url, e))?;
    response
        .json::<Vec<VehiclePosition>>()
        .await
        .map_err(|e| TrackingError::query(url, e))
}
