// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//Posts one synthetic telemetry record to the backend, which then fans it
//back out over the stream as a normal update frame.

use clap::Parser;
use larkspur::config::LiveConfig;
use larkspur::fleet_dataset::VehiclePosition;
use larkspur::simulation::SimulationController;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    vehicle_id: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long, allow_hyphen_values = true)]
    heading: Option<f64>,
    #[arg(long)]
    speed: Option<f64>,
    #[arg(long, default_value = "test_injection")]
    status: String,
    #[arg(long)]
    route_id: Option<String>,
    #[arg(long)]
    moving: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = LiveConfig::from_env();
    let controller = SimulationController::new(reqwest::Client::new(), &config.api_base);

    let position = VehiclePosition {
        vehicle_id: args.vehicle_id,
        latitude: args.lat,
        longitude: args.lon,
        heading: args.heading,
        speed: args.speed,
        timestamp: chrono::Utc::now().to_rfc3339(),
        status: args.status,
        route_id: args.route_id,
        current_stop: None,
        moving: args.moving,
        fuel_level: None,
        battery_level: None,
    };

    let ack = controller.inject_position(&position).await?;
    println!("{}", serde_json::to_string_pretty(&ack)?);
    Ok(())
}
