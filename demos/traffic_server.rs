//! Traffic update server example
//!
//! Run with: cargo run --example traffic_server [BIND_ADDR] [--simulate]
//!
//! Examples:
//!   cargo run --example traffic_server                      # binds to TF_SERVER_ADDR or 0.0.0.0:8080
//!   cargo run --example traffic_server localhost            # binds to 127.0.0.1:8080
//!   cargo run --example traffic_server 127.0.0.1:9000       # binds to 127.0.0.1:9000
//!   cargo run --example traffic_server -- --simulate        # also records fake sensor data
//!
//! Settings are read from `TF_*` environment variables, optionally loaded
//! from a `.env` file in the working directory.
//!
//! ## Subscribing
//!
//! With websocat:
//!   websocat ws://localhost:8080/ws/traffic
//!
//! ## Recording
//!
//!   curl -X POST localhost:8080/traffic-flow/traffic/record \
//!     -H 'content-type: application/json' \
//!     -d '{"sensor_id":1,"traffic_volume":120,"average_speed":42.5,"congestion_level":"moderate"}'

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use traffic_fanout::{CongestionLevel, Ingestor, MemoryStore, NewTrafficRecord, ServerConfig, TrafficServer};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "127.0.0.1:9000" -> 127.0.0.1:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: traffic_server [BIND_ADDR] [--simulate]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: $TF_SERVER_ADDR or 0.0.0.0:8080)");
    eprintln!("  --simulate   Record a fake sensor reading every second");
}

/// Feed a few fake sensors through the ingestion hook
async fn simulate(ingestor: Ingestor) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut step: i32 = 0;

    loop {
        ticker.tick().await;
        step = (step + 1) % 1000;

        let sensor_id = step % 4 + 1;
        let volume = 40 + (step * 37) % 200;
        let level = match volume {
            0..=99 => CongestionLevel::Low,
            100..=179 => CongestionLevel::Moderate,
            _ => CongestionLevel::High,
        };
        let speed = 90.0 - f64::from(volume) / 3.0;

        if let Err(e) = ingestor
            .record(NewTrafficRecord::new(sensor_id, volume, speed, level))
            .await
        {
            tracing::warn!(error = %e, "Simulated reading rejected");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let simulate_feed = args.iter().any(|a| a == "--simulate");

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffic_fanout=info".parse()?)
                .add_directive("traffic_server=debug".parse()?),
        )
        .init();

    let mut config = ServerConfig::from_env()?;
    if let Some(addr_str) = args.iter().find(|a| !a.starts_with("--")) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config.bind_addr = addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    println!("Starting traffic server on {}", config.bind_addr);
    println!();
    println!("=== Subscribe ===");
    println!("websocat ws://{}/ws/traffic", config.bind_addr);
    println!();

    let server = TrafficServer::new(config, Arc::new(MemoryStore::new()));

    if simulate_feed {
        tokio::spawn(simulate(server.ingestor().clone()));
    }

    // Run with Ctrl+C handling
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    let stats = server.broadcaster().stats().snapshot();
    println!(
        "Stats: published={} delivered={} failed={} evicted={}",
        stats.published, stats.delivered, stats.delivery_failures, stats.evicted
    );

    Ok(())
}
