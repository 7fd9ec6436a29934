// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use clap::Parser;
use larkspur::config::LiveConfig;
use larkspur::connection::ConnectionManager;
use larkspur::fetchers::SnapshotFetcher;
use larkspur::position_store::PositionStore;
use larkspur::shutdown::ShutdownSignal;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Restrict the initial snapshot to these vehicles (repeatable)
    #[arg(long)]
    vehicle_id: Vec<String>,
    /// Restrict the initial snapshot to one route
    #[arg(long)]
    route_id: Option<String>,
    /// Console refresh cadence in seconds
    #[arg(long, default_value_t = 5)]
    refresh_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    let args = Args::parse();
    let config = LiveConfig::from_env();

    let store = PositionStore::new();
    let shutdown = ShutdownSignal::new();
    let manager = ConnectionManager::new(config.clone(), store.clone(), shutdown.clone());
    let snapshots = SnapshotFetcher::new(
        reqwest::Client::new(),
        &config.api_base,
        store.clone(),
        shutdown.clone(),
    );

    //prime the table before the stream settles
    let vehicle_filter = match args.vehicle_id.is_empty() {
        true => None,
        false => Some(args.vehicle_id.as_slice()),
    };
    match snapshots
        .fetch_snapshot(vehicle_filter, args.route_id.as_deref())
        .await
    {
        Ok(count) => println!("initial snapshot: {} vehicles", count),
        Err(e) => println!("initial snapshot unavailable, stream will fill in: {}", e),
    }

    manager.connect().await;
    println!(
        "streaming from {}, refresh every {}s, ctrl-c to exit",
        config.stream_url, args.refresh_secs
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => render(&store, &manager).await,
        }
    }

    manager.teardown().await;
    Ok(())
}

async fn render(store: &PositionStore, manager: &ConnectionManager) {
    let positions = store.snapshot().await;
    println!(
        "---- {} vehicles, stream {:?}, {} ms since epoch ----",
        positions.len(),
        manager.state().await,
        larkspur::duration_since_unix_epoch().as_millis()
    );
    let mut rows: Vec<_> = positions.values().collect();
    rows.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));
    for position in rows {
        println!(
            "{:>12} ({:>10.5}, {:>11.5}) {:>8} {} {}",
            position.vehicle_id,
            position.latitude,
            position.longitude,
            if position.moving { "moving" } else { "stopped" },
            position.status,
            position.timestamp
        );
    }
    if let Some(error) = manager.last_error().await {
        println!("last stream error: {}", error);
    }
}
