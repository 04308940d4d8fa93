use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use core_logic::setup_logger;
use dialoguer::{theme::ColorfulTheme, Select};
use dotenv::dotenv;
use layeredge_project::config::EdgeConfig;
use layeredge_project::{orchestrator, registration};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.json")]
    config: String,
}

fn print_banner() {
    let line = "═".repeat(63);
    println!("{}", format!("╔{}╗", line).cyan().bold());
    println!(
        "{}",
        format!("║  LAYEREDGE NODE KEEPER {:<39}║", env!("CARGO_PKG_VERSION"))
            .cyan()
            .bold()
    );
    println!("{}", format!("╚{}╝", line).cyan().bold());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = match EdgeConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config from {}: {}. Using defaults.", args.config, e);
            EdgeConfig::default()
        }
    };

    let _log_guard = setup_logger(config.console_level());
    // Keep guard alive for file logging
    std::mem::forget(_log_guard);

    info!("Loaded config from: {}", args.config);

    loop {
        print_banner();

        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select an option")
            .items(&[
                "Run claim & monitor flow",
                "Register new accounts",
                "Exit",
            ])
            .default(0)
            .interact()?;

        match choice {
            0 => {
                if let Err(e) = orchestrator::run_monitor_flow(&config).await {
                    error!("Monitor flow aborted: {:#}", e);
                }
            }
            1 => {
                if let Err(e) = registration::run_registration_flow(&config).await {
                    error!("Registration flow aborted: {:#}", e);
                }
            }
            _ => {
                println!("{}", "Exiting...".yellow());
                break;
            }
        }
    }

    Ok(())
}
