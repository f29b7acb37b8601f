use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::Context;
use crate::error::OutbreakError;
use crate::log::LogLevelSpec;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;
use crate::{debug, info};

/// Default cli arguments for the outbreak runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed, overriding the one in the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path to a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for report output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Replace report files that already exist
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Log levels, e.g. `info` or `outbreak::agent=trace,warn`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Number of days to simulate, overriding the config file
    #[arg(short, long)]
    pub days: Option<u32>,
}

#[derive(Args)]
pub struct PlaceholderCustom {}

fn create_outbreak_cli() -> Command {
    let cli = Command::new("outbreak");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments.
///
/// The setup function receives the context after parameters, logging,
/// report options and the random seed have been configured, and is expected
/// to build the world and population and schedule the days to run.
///
/// # Errors
/// Returns an error if argument parsing, configuration or the setup function
/// fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    A: Args,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), OutbreakError>,
{
    let mut cli = create_outbreak_cli();
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
/// Returns an error if argument parsing, configuration or the setup function
/// fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, BaseArgs, Option<PlaceholderCustom>) -> Result<(), OutbreakError>,
{
    let cli = create_outbreak_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(base_args_matches, None, setup_fn)?)
}

/// Parameters from the config file, or the defaults, with command line
/// overrides applied.
fn resolve_parameters(args: &BaseArgs) -> Result<Parameters, OutbreakError> {
    let mut parameters = match &args.config {
        Some(path) => {
            info!("loading parameters from {}", path.display());
            Parameters::from_json_file(path)?
        }
        None => Parameters::default(),
    };
    if let Some(seed) = args.random_seed {
        parameters.seed = seed;
    }
    if let Some(days) = args.days {
        parameters.num_days = days;
    }
    Ok(parameters)
}

fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Context, OutbreakError>
where
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), OutbreakError>,
{
    if let Some(levels) = &args.log_level {
        levels.parse::<LogLevelSpec>()?.apply();
    }

    let mut context = Context::new();
    let parameters = resolve_parameters(&args)?;
    context.init_random(parameters.seed);
    context.init_parameters(parameters)?;

    if let Some(output_dir) = &args.output_dir {
        context
            .report_options()
            .directory(output_dir.clone())
            .overwrite(args.force_overwrite);
    }

    setup_fn(&mut context, args, custom_args)?;

    debug!("starting the event loop");
    context.execute();
    Ok(context)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::define_rng;

    #[test]
    fn seed_from_args_is_used() {
        let args = BaseArgs {
            random_seed: Some(42),
            ..BaseArgs::default()
        };

        let mut compare_ctx = Context::new();
        compare_ctx.init_random(42);
        define_rng!(TestRng);
        let result = run_with_args_internal(args, None, |ctx, _, _: Option<()>| {
            assert_eq!(ctx.get_parameters().seed, 42);
            assert_eq!(
                ctx.sample_range(TestRng, 0..100),
                compare_ctx.sample_range(TestRng, 0..100)
            );
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn config_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"population_size": 7, "num_days": 2, "seed": 5}}"#).unwrap();
        let args = BaseArgs {
            config: Some(file.path().to_path_buf()),
            days: Some(9),
            ..BaseArgs::default()
        };

        let context = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(())).unwrap();
        let parameters = context.get_parameters();
        assert_eq!(parameters.population_size, 7);
        assert_eq!(parameters.num_days, 9);
        assert_eq!(parameters.seed, 5);
    }

    #[test]
    fn invalid_override_is_reported() {
        let args = BaseArgs {
            days: Some(0),
            ..BaseArgs::default()
        };
        let result = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(()));
        assert!(matches!(
            result,
            Err(OutbreakError::ConfigError {
                field: "num_days",
                ..
            })
        ));
    }

    #[test]
    fn setup_errors_propagate() {
        let result = run_with_args_internal(BaseArgs::default(), None, |_, _, _: Option<()>| {
            Err(OutbreakError::StateError("no world".to_string()))
        });
        assert!(matches!(result, Err(OutbreakError::StateError(_))));
    }

    #[test]
    fn output_dir_sets_report_options() {
        let dir = tempfile::tempdir().unwrap();
        let args = BaseArgs {
            output_dir: Some(dir.path().to_path_buf()),
            force_overwrite: true,
            ..BaseArgs::default()
        };
        let mut context = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(())).unwrap();
        let options = context.report_options();
        assert_eq!(options.output_dir, dir.path());
        assert!(options.overwrite);
    }
}
