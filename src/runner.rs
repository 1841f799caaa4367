use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::config::{EpisimConfig, Parameters};
use crate::context::Context;
use crate::error::EpisimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::log::{set_log_level, LevelFilter};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Default cli arguments for the episim runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed; takes precedence over the seed of the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path of a JSON file with the run parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for the output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Replace output files of an earlier run
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Diagnostic log level: off, error, warn, info, debug or trace
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Args)]
pub struct PlaceholderCustom {}

fn create_episim_cli() -> Command {
    let cli = Command::new("episim");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments.
///
/// # Parameters
/// - `setup_fn`: takes the `Context`, the `BaseArgs` and the parsed custom
///   arguments `A`, and schedules the run
///
/// # Errors
/// Returns an error if argument parsing, the setup function or the run fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    A: Args,
    F: FnOnce(&mut Context, BaseArgs, Option<A>) -> Result<(), EpisimError>,
{
    let mut cli = create_episim_cli();
    cli = A::augment_args(cli);
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(
        base_args_matches,
        Some(custom_matches),
        setup_fn,
    )?)
}

/// Runs a simulation with the default cli arguments
///
/// # Errors
/// Returns an error if argument parsing, the setup function or the run fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Context, BaseArgs, Option<PlaceholderCustom>) -> Result<(), EpisimError>,
{
    let cli = create_episim_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(base_args_matches, None, setup_fn)?)
}

fn parse_log_level(level: &str) -> Result<LevelFilter, EpisimError> {
    level
        .parse()
        .map_err(|_| EpisimError::ConfigError(format!("unknown log level {level}")))
}

/// Builds the context from `args`, hands it to `setup_fn` and executes it.
///
/// # Errors
/// Returns the first error of the configuration, the setup or the run
pub fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Context, EpisimError>
where
    F: FnOnce(&mut Context, BaseArgs, Option<A>) -> Result<(), EpisimError>,
{
    if let Some(level) = &args.log_level {
        set_log_level(parse_log_level(level)?);
    }

    let mut context = Context::new();

    if let Some(path) = &args.config {
        info!("loading run parameters from {}", path.display());
        context.load_global_property(Parameters, path)?;
    }

    let report_options = context.report_options();
    if let Some(output_dir) = &args.output_dir {
        report_options.directory(output_dir.clone());
    }
    report_options.overwrite(args.force_overwrite);

    let seed = args.random_seed.unwrap_or_else(|| {
        context
            .get_global_property_value(Parameters)
            .map_or_else(|| EpisimConfig::default().seed, |config| config.seed)
    });
    info!("random seed {seed}");
    context.init_random(seed);

    setup_fn(&mut context, args, custom_args)?;

    context.execute()?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{tempdir, NamedTempFile};

    use super::*;
    use crate::define_rng;

    define_rng!(RunnerTestRng);

    #[test]
    fn random_seed_from_args() {
        let args = BaseArgs {
            random_seed: Some(42),
            ..BaseArgs::default()
        };

        let mut compare_ctx = Context::new();
        compare_ctx.init_random(42);
        let result = run_with_args_internal(args, None, |ctx, _, _: Option<()>| {
            assert_eq!(
                ctx.sample_range(RunnerTestRng, 0..100),
                compare_ctx.sample_range(RunnerTestRng, 0..100)
            );
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn seed_and_parameters_from_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"seed": 7, "calibration_parameter": 0.5}}"#).unwrap();
        file.flush().unwrap();
        let args = BaseArgs {
            config: Some(file.path().to_path_buf()),
            ..BaseArgs::default()
        };

        let mut compare_ctx = Context::new();
        compare_ctx.init_random(7);
        let context = run_with_args_internal(args, None, |ctx, _, _: Option<()>| {
            assert_eq!(
                ctx.sample_range(RunnerTestRng, 0..1000),
                compare_ctx.sample_range(RunnerTestRng, 0..1000)
            );
            Ok(())
        })
        .unwrap();
        let config = context.get_global_property_value(Parameters).unwrap();
        assert_eq!(config.seed, 7);
        assert!((config.calibration_parameter - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"calibration_parameter": -1.0}}"#).unwrap();
        file.flush().unwrap();
        let args = BaseArgs {
            config: Some(file.path().to_path_buf()),
            ..BaseArgs::default()
        };
        let result = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(()));
        assert!(matches!(result, Err(EpisimError::ConfigError(_))));
    }

    #[test]
    fn output_options_from_args() {
        let temp_dir = tempdir().unwrap();
        let args = BaseArgs {
            output_dir: Some(temp_dir.path().to_path_buf()),
            force_overwrite: true,
            ..BaseArgs::default()
        };
        let result = run_with_args_internal(args, None, |ctx, _, _: Option<()>| {
            let options = ctx.report_options();
            assert_eq!(options.directory, temp_dir.path());
            assert!(options.overwrite);
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn unknown_log_level_is_an_error() {
        let args = BaseArgs {
            log_level: Some("loud".to_string()),
            ..BaseArgs::default()
        };
        let result = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(()));
        assert!(matches!(result, Err(EpisimError::ConfigError(_))));
    }

    #[test]
    fn setup_error_stops_the_run() {
        let result = run_with_args_internal(BaseArgs::default(), None, |_, _, _: Option<()>| {
            Err(EpisimError::EpisimError("setup failed".to_string()))
        });
        assert!(result.is_err());
    }
}
