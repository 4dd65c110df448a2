use anyhow::Result;
use clap::Parser;
use recap::{
    app,
    cli::{handle_process_command, handle_status_command, Cli, CliCommand},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Some(CliCommand::Version) = cli.command {
        println!("recap {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(CliCommand::Process(args)) => handle_process_command(args, &config).await,
        Some(CliCommand::Status(args)) => handle_status_command(args, &config).await,
        Some(CliCommand::Serve) | Some(CliCommand::Version) | None => {
            app::run_service(config).await
        }
    }
}
