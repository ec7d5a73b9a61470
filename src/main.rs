use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use tummy_scan::config::AppConfig;
use tummy_scan::errors::error_logging;
use tummy_scan::nutrition_form::NutritionForm;
use tummy_scan::observability;
use tummy_scan::pipeline::ScanPipeline;
use tummy_scan::progress::{ProgressEvent, ProgressReporter};

/// Scan a nutrition label photo and print the extracted values
#[derive(Parser, Debug)]
#[command(name = "tummy-scan")]
#[command(version)]
#[command(about = "Extract nutrition facts from a label photo", long_about = None)]
struct Cli {
    /// Photo of the nutrition label
    image: PathBuf,

    /// Product barcode; validates the pre-filled entry form against it
    #[arg(long, env = "SCAN_BARCODE")]
    barcode: Option<String>,

    /// Print only the recognized text
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "startup_validation");
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }

    observability::init_tracing(&config.observability)?;
    info!("{}", config.summary());

    let pipeline = ScanPipeline::from_config(&config)?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let progress_logger = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            info!(stage = %event.stage, progress = event.progress, "{}", event.display_message());
        }
    });

    let result = pipeline
        .scan_image_file(&cli.image, ProgressReporter::new(tx))
        .await;
    // The pipeline (and its reporter) is done; let the logger drain.
    let _ = progress_logger.await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(stage = %e.stage(), error = %e, "Scan failed");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    if cli.raw {
        println!("{}", outcome.raw_text);
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(barcode) = cli.barcode {
        let form = NutritionForm::prefill(&outcome.parsed);
        match form.validate(&barcode) {
            Ok(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            Err(errors) => {
                let missing: Vec<&str> = errors
                    .missing_fields()
                    .into_iter()
                    .map(|f| f.label())
                    .collect();
                info!(missing = ?missing, "Form needs completion before saving");
                println!("{}", serde_json::to_string_pretty(&errors)?);
            }
        }
    }

    Ok(())
}
