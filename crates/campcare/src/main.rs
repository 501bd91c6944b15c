mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "campcare", &mut std::io::stdout());
            Ok(())
        }

        // Instance management owns its own loading
        Command::Instances(args) => commands::instances::handle(args, &cli.global).await,

        cmd => {
            let cfg = config::load(&cli.global)?;
            let host = config::connect(&cfg, &cli.global).await?;
            let format = config::output_format(&cfg, &cli.global);

            tracing::debug!(command = ?cmd, instance = %host.instance_id, "dispatching command");
            let result = commands::dispatch(cmd, &host, format, &cli.global).await;
            host.manager.shutdown().await;
            result
        }
    }
}
