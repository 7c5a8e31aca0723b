mod cli;
mod commands;
mod config;
mod error;

use crate::{
    cli::{Args, Commands, CookieRequest, DownloadRequest},
    commands::CommandExecutor,
    config::AppConfig,
    error::{CliError, Result},
};
use clap::{Parser, error::ErrorKind as ClapErrorKind};
use nicolive_extractor::ErrorKind;
use std::process;
use tracing::{Level, debug, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = match Args::try_parse_from(cli::normalize_args(std::env::args_os())) {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                let _ = e.print();
                process::exit(0);
            }
            ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                let _ = e.print();
                process::exit(1);
            }
            _ => {
                init_logging(false, false);
                let message = e.to_string();
                error!(kind = %ErrorKind::Validation, error = message.trim_end(), "Invalid arguments");
                process::exit(1);
            }
        },
    };

    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!(kind = %e.kind(), error = %e, "Operation failed");
        process::exit(1);
    }
}

async fn run(mut args: Args) -> Result<()> {
    match args.command.take() {
        Some(Commands::Cookie {
            raw,
            output,
            domain,
            filter,
        }) => {
            let request = CookieRequest::new(raw, output, domain, filter)?;
            CommandExecutor::new(load_config(&args)?)?.save_cookies(&request)?;
        }

        Some(Commands::Completions { shell }) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Some(Commands::Config { show, reset }) => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults ({})", path.display());
            } else if show {
                println!("{}", load_config(&args)?.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        None => {
            let request = DownloadRequest::from_args(&args)?;
            let config = load_config(&args)?;
            let timeout = config.locate_timeout(args.timeout);
            if timeout.is_zero() {
                return Err(CliError::validation("--timeout must be greater than zero"));
            }

            info!(url = %request.url, mode = ?request.mode, "Starting download");
            CommandExecutor::new(config)?
                .download(&request, timeout)
                .await?;
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let config = AppConfig::load(args.config.as_deref())?;
    debug!(?config, "Configuration loaded");
    Ok(config)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(filter)
        .init();
}
