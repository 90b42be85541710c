use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rail_fleet_opt::FleetOptimizer;
use rail_fleet_opt::OptimizationResult;
use rail_fleet_opt::ScheduleTable;


/// Allocates train lengths and frequencies to each line and period of a rail network.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the network and model config (yaml).
    #[arg(short, long)]
    config: PathBuf,

    /// OD csv to use instead of the one named in the config.
    #[arg(long)]
    od: Option<PathBuf>,

    /// Also run every scenario defined in the config.
    #[arg(long)]
    scenarios: bool,

    /// Print the schedule table for each run.
    #[arg(long)]
    report: bool,
}

fn summarise(label: &str, result: &OptimizationResult, report: bool) {
    let outcome = &result.outcome;
    println!("[{}] unmet demand {:.1} (minimum {:.1}), {:.1} car-hours", label,
             outcome.unmet_demand, outcome.min_unmet_demand, outcome.car_hours);
    for (segment, period, unmet) in &outcome.unmet_by_segment {
        println!("  unmet on {} in {}: {:.1}", segment, period, unmet);
    }
    if report {
        print!("{}", ScheduleTable::new(&outcome.schedule, result.params.min_frequency));
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let optimizer = match FleetOptimizer::from_cfg(&args.config, args.od.as_deref()) {
        Ok(optimizer) => optimizer,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    for gap in optimizer.routing_gaps() {
        println!("unrouted: {}", gap);
    }

    let mut failed = false;
    match optimizer.run() {
        Ok(result) => summarise("base", &result, args.report),
        Err(err) => {
            log::error!("base run failed: {}", err);
            failed = true;
        }
    }

    if args.scenarios {
        for scenario in optimizer.run_scenarios() {
            match &scenario.result {
                Ok(result) => summarise(&scenario.name, result, args.report),
                Err(err) => {
                    println!("[{}] failed: {}", scenario.name, err);
                    failed = true;
                }
            }
        }
    }

    if failed {
        return ExitCode::FAILURE;
    }
    return ExitCode::SUCCESS;
}
