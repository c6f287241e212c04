mod cli;
mod console;
mod paths;
mod run;
mod watch;
mod wrap;

use anyhow::Result;

use crate::cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run::run(args),
        Some(Command::Wrap(args)) => wrap::print(args),
        None => run::run(cli.run),
    }
}
