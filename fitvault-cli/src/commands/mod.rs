//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod registry;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fit a pipeline on a CSV dataset and save it
    Fit {
        /// Path to the CSV dataset
        #[arg(short, long)]
        data: PathBuf,

        /// Index of the target column
        #[arg(short, long)]
        target: usize,

        /// Path to the JSON pipeline definition
        #[arg(short, long)]
        pipeline: PathBuf,

        /// F1, F1_MACRO, RECALL, PRECISION or ALL
        #[arg(short, long, default_value = "F1")]
        metric: String,
    },
    /// Fit and score a pipeline without saving it
    Evaluate {
        /// Path to the CSV dataset
        #[arg(short, long)]
        data: PathBuf,

        /// Index of the target column
        #[arg(short, long)]
        target: usize,

        /// Path to the JSON pipeline definition
        #[arg(short, long)]
        pipeline: PathBuf,

        /// F1, F1_MACRO, RECALL, PRECISION or ALL
        #[arg(short, long, default_value = "F1")]
        metric: String,
    },
    /// Run a saved pipeline on new data
    Produce {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Path to the CSV dataset
        #[arg(short, long)]
        data: PathBuf,

        /// Index of the target column, if the dataset has one
        #[arg(short, long)]
        target: Option<usize>,

        /// Write predictions to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List saved pipelines
    List,
    /// Show the model index and artifacts of a saved pipeline
    Inspect {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Delete a saved pipeline
    Delete {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Show the carrier rules in effect
    Registry,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Fit {
            data,
            target,
            pipeline,
            metric,
        } => pipeline::fit(config, &data, target, &pipeline, &metric),
        Commands::Evaluate {
            data,
            target,
            pipeline,
            metric,
        } => pipeline::evaluate(config, &data, target, &pipeline, &metric),
        Commands::Produce {
            id,
            data,
            target,
            output,
        } => pipeline::produce(config, &id, &data, target, output.as_deref()),
        Commands::List => pipeline::list(config),
        Commands::Inspect { id } => pipeline::inspect(config, &id),
        Commands::Delete { id } => pipeline::delete(config, &id),
        Commands::Registry => registry::show(config),
    }
}
