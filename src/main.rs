use clap::Parser;
use quickcopy_lib::cli::{self, Cli};
use quickcopy_lib::logging::{self, Verbosity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet));
    cli::run(cli).await
}
