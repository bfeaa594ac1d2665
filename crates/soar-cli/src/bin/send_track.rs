//! CLI tool to stream a synthetic flight to a running task server.
//!
//! Uploads the task, then posts fixes in simulated time, optionally faster
//! than real time.

use anyhow::{Context, Result};
use clap::Parser;
use soar_cli::sim::{Demo, FlightPath, FlightProfile, TaskClient, TaskFlight};
use soar_core::{GlidePolar, PolarCoefficients, TaskDefinition};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time;

/// Send a synthetic flight to the task server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Task server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Task definition JSON file (a built-in demo otherwise)
    #[arg(long)]
    task: Option<PathBuf>,

    /// Built-in demo task
    #[arg(long, value_enum, default_value_t = Demo::Triangle)]
    demo: Demo,

    /// Flight seconds between fixes
    #[arg(long, default_value_t = 2.0)]
    step: f64,

    /// Fixes per request
    #[arg(long, default_value_t = 10)]
    batch: usize,

    /// Simulated seconds per real second
    #[arg(long, default_value_t = 60.0)]
    speedup: f64,

    /// MacCready setting used to plan the flight
    #[arg(long, default_value_t = 1.5)]
    mc: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let definition = match &args.task {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            TaskDefinition::from_json(&text)?
        }
        None => args.demo.definition(),
    };
    let task = definition.build()?;

    println!("Connecting to task server at {}...", args.url);
    let client = TaskClient::new(&args.url);
    let reply = client.put_task(&definition).await?;
    println!("Task accepted: {}", reply);

    let polar = GlidePolar::new(PolarCoefficients::default(), args.mc);
    let route = TaskFlight::route_for(&task);
    let flight = TaskFlight::new(&route, &polar, FlightProfile::default(), 0.0)
        .context("task has no route")?;
    let fixes = flight.sample(args.step);
    let batch = args.batch.max(1);

    println!(
        "Sending {} fixes in batches of {} ({:.0}x real time)",
        fixes.len(),
        batch,
        args.speedup
    );

    let real_step = args.step * batch as f64 / args.speedup.max(0.01);
    let mut interval = time::interval(Duration::from_secs_f64(real_step.max(0.001)));
    let mut sent = 0usize;
    for chunk in fixes.chunks(batch) {
        interval.tick().await;
        match client.send_fixes(chunk).await {
            Ok(queued) => {
                sent += queued;
                if let Some(last) = chunk.last() {
                    println!(
                        "[{:5}] t={:>6.0}s ({:.5}, {:.5}) {:.0} m -> OK",
                        sent, last.time_s, last.location.lat, last.location.lon, last.altitude_m
                    );
                }
            }
            Err(e) => eprintln!("Error sending fixes: {}", e),
        }
    }

    // Give the calculation loop a tick to catch up.
    time::sleep(Duration::from_millis(1500)).await;
    let stats = client.stats().await?;
    println!(
        "\nSent {} fixes. Started: {}, finished: {}, scored {:.1} km",
        sent,
        stats.task_started,
        stats.task_finished,
        stats.distances.scored_m / 1000.0
    );
    Ok(())
}
