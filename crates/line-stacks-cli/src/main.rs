//! Command line front end of the line stacking transform
//!
//! Reads LineString features from GeoJSON, stacks them and writes the offset lines back as
//! GeoJSON. Logs go to stderr.

mod io;
mod logging;
mod settings;

use clap::Parser;
use line_stacks::{ProgressListener, StackError, StackProcess};
use settings::Settings;
use std::path::PathBuf;
use std::process::ExitCode;

/// Error types of the command line tool
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Logs the start and end of the transform
struct LogProgress;

impl ProgressListener for LogProgress {
    fn started(&mut self) {
        tracing::debug!("Stacking started");
    }

    fn complete(&mut self) {
        tracing::debug!("Stacking complete");
    }
}

fn run(settings: &Settings) -> Result<(), CliError> {
    let params = settings.to_params()?;
    let (schema, features) = io::read_features(&settings.input)?;

    let output = StackProcess::new(params).execute(&schema, features, &mut LogProgress)?;

    io::write_features(&output, &settings.output)?;
    Ok(())
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    logging::setup_logging();

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
