use clap::Args;
use outbreak::runner::run_with_custom_args;
use outbreak::ContextParametersExt;

#[derive(Args, Debug)]
struct Extra {
    #[arg(short = 'x', long)]
    field: u32,
}

fn main() {
    run_with_custom_args(|context, _args, extra: Option<Extra>| {
        if let Some(extra) = extra {
            println!("{} {}", extra.field, context.get_parameters().seed);
        }
        Ok(())
    })
    .unwrap();
}
