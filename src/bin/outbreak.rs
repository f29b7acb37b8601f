use outbreak::prelude::*;
use outbreak::{info, OutbreakError};

const PEOPLE_PER_HOME: u32 = 3;
const SITES: usize = 8;
const BLOCK_SPACING: f64 = 25.0;

fn setup(context: &mut Context, args: BaseArgs) -> Result<(), OutbreakError> {
    let parameters = context.get_parameters().clone();

    let homes = parameters.population_size.div_ceil(PEOPLE_PER_HOME) as usize;
    let world = World::grid_town(homes, SITES, BLOCK_SPACING);
    let home_ids = world.homes();
    let navigator = StraightLineNavigator::new(world.bounds(), parameters.walk_speed);
    context.set_world(world);
    context.set_navigator(navigator);

    if args.output_dir.is_some() {
        context.add_outbreak_reports()?;
    }

    context.init_population(&parameters, &home_ids)?;
    info!(
        "simulating {} days for {} agents",
        parameters.num_days, parameters.population_size
    );
    context.run_days(parameters.num_days)?;
    Ok(())
}

fn main() {
    let result = run_with_args(|context, args, _| setup(context, args));
    match result {
        Ok(context) => {
            println!("day {}: {}", context.current_day(), context.census());
        }
        Err(err) => {
            eprintln!("outbreak: {err}");
            std::process::exit(1);
        }
    }
}
