use clap::Parser;
use log::{error, info};
use retag_core::cli::report::JsonReport;
use retag_core::cli::{Cli, OutputFormat};
use retag_core::{BatchDriver, BatchReport, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.dump_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to serialize configuration: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let driver = match BatchDriver::new(config) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Editing {} into {}",
        driver.config().input_root.display(),
        driver.config().output_root.display()
    );

    let report = match driver.run() {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    output_report(&report, cli.format);
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn output_report(report: &BatchReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", TextReport::new(report));
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&JsonReport::from(report)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize to JSON: {}", e);
                eprintln!("Error: Failed to serialize to JSON: {}", e);
                process::exit(1);
            }
        },
    }
}
