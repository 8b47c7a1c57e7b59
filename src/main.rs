mod measurement;
mod solar;
mod storage;
mod verdict;
mod web;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::solar::{SpaOracle, SunOracle};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "helios")]
#[command(about = "Crowdsourced sun position measurement backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },
    /// Compute the sun position for a location and time
    Position {
        /// Coordinates as "lat,lon" in degrees
        coordinates: String,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        time: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Position { coordinates, time } => position(&coordinates, time.as_deref()),
    }
}

async fn serve(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn position(coordinates: &str, time: Option<&str>) -> ExitCode {
    let Some((latitude, longitude)) = parse_coordinates(coordinates) else {
        eprintln!("Invalid coordinates, expected \"lat,lon\"");
        return ExitCode::FAILURE;
    };

    let at = match time {
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                eprintln!("Invalid timestamp: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Utc::now(),
    };

    match SpaOracle.sun_position(latitude, longitude, at) {
        Ok(p) => {
            println!("Sun position at ({}, {}) on {}:", latitude, longitude, at);
            println!("  azimuth:  {:.3}", p.azimuth);
            println!("  altitude: {:.3}", p.altitude);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Computation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_coordinates(s: &str) -> Option<(f64, f64)> {
    let parts: Vec<_> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let lat = parts[0].parse().ok()?;
    let lon = parts[1].parse().ok()?;
    Some((lat, lon))
}
