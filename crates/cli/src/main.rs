mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use runner::{list_attacks, run_attack, run_capture, run_scan, ScanRequest};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let succeeded = match cli.command {
        Commands::Scan {
            duration,
            continuous,
            preset,
            no_services,
            no_info,
            output_format,
            export,
        } => {
            let request = ScanRequest {
                duration,
                continuous,
                preset,
                no_services,
                no_info,
                export,
            };
            run_scan(&cli.adapter, request, &output_format).await?;
            true
        }
        Commands::Attack {
            attack,
            target,
            options,
            output_format,
        } => run_attack(&cli.adapter, &attack, &target, &options, &output_format).await?,
        Commands::Capture {
            duration,
            options,
            pcap,
            save_text,
            output_format,
        } => {
            run_capture(
                &cli.adapter,
                duration,
                &options,
                pcap.as_deref(),
                save_text.as_deref(),
                &output_format,
            )
            .await?;
            true
        }
        Commands::ListAttacks { output_format } => {
            list_attacks(&output_format)?;
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8, json: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
