use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use episim::mobility::ReplayEvents;
use episim::policy::PolicySchedule;
use episim::population_loader::load_population;
use episim::runner::run_with_custom_args;
use episim::simulation::{self, RunOverrides};
use episim::EpisimError;

#[derive(Args, Debug)]
struct EpisimArgs {
    /// Tab-separated presence events, replayed on every simulated day
    #[arg(long)]
    events: PathBuf,

    /// Optional tab-separated population with households and districts
    #[arg(long)]
    population: Option<PathBuf>,

    /// Optional JSON restriction schedule; replaces the policy of the config
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Last simulated day; takes precedence over the config
    #[arg(long)]
    last_day: Option<u32>,
}

fn main() -> ExitCode {
    let result = run_with_custom_args(|context, _, args: Option<EpisimArgs>| {
        let args = args
            .ok_or_else(|| EpisimError::ConfigError("missing arguments".to_string()))?;
        if let Some(path) = &args.population {
            load_population(context, path)?;
        }
        let policy = match &args.policy {
            Some(path) => Some(PolicySchedule::from_json(&fs::read_to_string(path)?)?),
            None => None,
        };
        let events = ReplayEvents::from_file(&args.events)?;
        simulation::init(
            context,
            Box::new(events),
            RunOverrides {
                last_day: args.last_day,
                policy,
                ..RunOverrides::default()
            },
        )
    });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("episim: {error}");
            ExitCode::FAILURE
        }
    }
}
