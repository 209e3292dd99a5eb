use clap::Parser;
use mkhssp::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{align, convert, create},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Create(_) => "create",
        Command::Align(_) => "align",
        Command::Convert(_) => "convert",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Create(args) => create::create(args)?,
        Command::Align(args) => align::align(args)?,
        Command::Convert(args) => convert::convert(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
