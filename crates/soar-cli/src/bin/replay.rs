//! Fly a task locally through the engine and print what happened.
//!
//! Uses a task definition file or a built-in demo, plans a synthetic
//! cruise-and-climb flight through the targets and feeds every fix to a
//! `TaskManager`.

use anyhow::{Context, Result};
use clap::Parser;
use soar_cli::sim::{Demo, FlightPath, FlightProfile, TaskFlight};
use soar_core::{AircraftState, TaskBehaviour, TaskDefinition, TaskEvent, TaskManager, TaskStats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Replay a synthetic flight through a task
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Task definition JSON file (a built-in demo otherwise)
    #[arg(long)]
    task: Option<PathBuf>,

    /// Built-in demo task
    #[arg(long, value_enum, default_value_t = Demo::Triangle)]
    demo: Demo,

    /// MacCready setting in m/s
    #[arg(long, default_value_t = 1.5)]
    mc: f64,

    /// Altitude at the start of the flight in meters
    #[arg(long, default_value_t = 1500.0)]
    start_altitude: f64,

    /// Thermal climb rate in m/s
    #[arg(long, default_value_t = 2.0)]
    climb_rate: f64,

    /// Seconds between fixes
    #[arg(long, default_value_t = 5.0)]
    step: f64,

    /// Print engine tracing output
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("soar_core=debug"))
            .init();
    }

    let definition = match &args.task {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            TaskDefinition::from_json(&text)?
        }
        None => args.demo.definition(),
    };

    let behaviour = TaskBehaviour {
        mc_mps: args.mc,
        ..TaskBehaviour::default()
    };
    let mut manager = TaskManager::new(behaviour);
    for warning in manager.set_task(definition.build()?)? {
        println!("warning: {warning:?}");
    }

    let profile = FlightProfile {
        start_altitude_m: args.start_altitude,
        climb_rate_mps: args.climb_rate,
        ..FlightProfile::default()
    };

    let lead_in = TaskFlight::route_for(manager.task())
        .first()
        .copied()
        .context("task has no points")?;
    if manager.task().has_area_points() {
        manager.update(&AircraftState::new(lead_in, profile.start_altitude_m, 0.0));
        if let Some(range) = manager.adjust_aat_range()? {
            println!("AAT targets set to {:.0}% of their range", range * 100.0);
        }
    }

    let route = TaskFlight::route_for(manager.task());
    let flight =
        TaskFlight::new(&route, manager.polar(), profile, 0.0).context("task has no route")?;

    let task = manager.task();
    println!("Task: {:?} with {} points", task.factory_type(), task.len());
    println!(
        "  Nominal {:.1} km, planned {:.1} km (min {:.1}, max {:.1})",
        task.distance_nominal() / 1000.0,
        task.distance_planned() / 1000.0,
        task.distance_min() / 1000.0,
        task.distance_max() / 1000.0,
    );
    println!(
        "  Flight: {} thermals, {} planned",
        flight.climbs(),
        format_time(flight.duration_s())
    );
    println!();

    let mut fixes = 0u32;
    for state in flight.sample(args.step) {
        fixes += 1;
        for event in manager.update(&state) {
            print_event(&event);
        }
        if manager.task().is_finished() {
            break;
        }
    }

    println!("\nReplay complete after {} fixes.", fixes);
    print_stats(manager.stats());
    Ok(())
}

fn print_event(event: &TaskEvent) {
    match event {
        TaskEvent::Started { time_s, altitude_m } => {
            println!("[{}] Start at {:.0} m", format_time(*time_s), altitude_m)
        }
        TaskEvent::StartRearmed { time_s } => {
            println!("[{}] Start re-armed", format_time(*time_s))
        }
        TaskEvent::TurnpointEntered {
            index,
            name,
            time_s,
        } => println!("[{}] Reached {} ({})", format_time(*time_s), name, index),
        TaskEvent::AreaExited {
            index,
            name,
            time_s,
        } => println!("[{}] Left area {} ({})", format_time(*time_s), name, index),
        TaskEvent::Finished { time_s, elapsed_s } => println!(
            "[{}] Finished in {}",
            format_time(*time_s),
            format_time(*elapsed_s)
        ),
        TaskEvent::FinalGlideChanged { final_glide } => {
            println!(
                "        final glide {}",
                if *final_glide { "made" } else { "lost" }
            )
        }
    }
}

fn print_stats(stats: &TaskStats) {
    println!(
        "  Started: {}, finished: {}",
        stats.task_started, stats.task_finished
    );
    println!(
        "  Scored {:.1} km in {} ({:.1} km/h)",
        stats.distances.scored_m / 1000.0,
        format_time(stats.total.time_elapsed_s),
        stats.total.speed_travelled_mps * 3.6,
    );
    if let Some(remaining) = stats.aat_time_remaining_s {
        println!("  AAT time remaining: {}", format_time(remaining));
    }
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}
