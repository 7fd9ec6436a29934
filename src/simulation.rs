use crate::errors::TrackingError;
use crate::fleet_dataset::{RoutePoint, VehiclePosition};

/// Out-of-band commands against the planner backend: synthetic movement
/// for a named vehicle, and one-off telemetry injection. Unlike the read
/// paths, failures here are returned to the caller. Successful commands
/// eventually show up as `update` frames on the stream; nothing here
/// touches the position store directly.
pub struct SimulationController {
    http: reqwest::Client,
    api_base: String,
}

impl SimulationController {
    pub fn new(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Asks the backend to start generating movement for `vehicle_id`,
    /// optionally along the given waypoints. The ack payload is opaque to
    /// this client and handed back as raw JSON.
    pub async fn start_simulation(
        &self,
        vehicle_id: &str,
        waypoints: Option<&[RoutePoint]>,
    ) -> Result<serde_json::Value, TrackingError> {
        let url = format!("{}/vehicles/{}/simulate", self.api_base, vehicle_id);
        let body = match waypoints {
            Some(route_points) => serde_json::json!({ "route_points": route_points }),
            None => serde_json::json!({}),
        };
        self.post_command(&url, &body).await
    }

    /// Injects one telemetry record, used to feed test vehicles into the
    /// backend.
    pub async fn inject_position(
        &self,
        position: &VehiclePosition,
    ) -> Result<serde_json::Value, TrackingError> {
        let url = format!("{}/positions", self.api_base);
        let body = serde_json::to_value(position)?;
        self.post_command(&url, &body).await
    }

    async fn post_command(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TrackingError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TrackingError::command(url, e))?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TrackingError::command(url, e))
    }
}
