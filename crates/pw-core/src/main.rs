use clap::Parser;
use pw_core::cli::{self, Cli};
use pw_core::logging::init_logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);
    cli::run(&cli).await.into()
}
