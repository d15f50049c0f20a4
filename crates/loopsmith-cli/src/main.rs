use clap::Parser;

mod cli;

fn main() -> miette::Result<()> {
    let cli = cli::Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp(None)
        .format_target(false)
        .init();
    log::debug!("Parsed arguments: {cli:?}");

    cli.run()
}
