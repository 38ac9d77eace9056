//! Pipeline command handlers
//!
//! Handles fitting, evaluating and producing pipelines, and listing,
//! inspecting and deleting the ones saved in the store.

use anyhow::{Context, Result};
use colored::*;
use fitvault_core::dto::result::Predictions;
use fitvault_store::{IndexEntry, PipelineSummary};
use std::path::Path;

use crate::config::Config;
use crate::id_resolver::resolve_pipeline_id;
use crate::types::IdOrPrefix;

/// Fit a pipeline and save it
pub fn fit(config: &Config, data: &Path, target: usize, pipeline: &Path, metric: &str) -> Result<()> {
    let store = config.open_store()?;
    let dataset = fitvault_store::generate_dataset(data, Some(target))
        .with_context(|| format!("Failed to read dataset: {}", data.display()))?;
    let definition = fitvault_store::load_pipeline(pipeline)
        .with_context(|| format!("Failed to read pipeline: {}", pipeline.display()))?;

    let mut backend = config.backend();
    let id = fitvault_store::fit_and_save(&store, &mut backend, &dataset, &definition, metric)
        .context("Failed to fit and save pipeline")?;

    println!("{}", "✓ Pipeline fitted and saved successfully!".green().bold());
    println!("  ID:      {}", id.to_string().cyan());
    println!("  Name:    {}", definition.name.bold());
    println!("  Dataset: {}", dataset.metadata.dataset_id.dimmed());
    println!("  Path:    {}", store.layout(id).dir().display().to_string().dimmed());

    Ok(())
}

/// Fit and score a pipeline without saving it
pub fn evaluate(config: &Config, data: &Path, target: usize, pipeline: &Path, metric: &str) -> Result<()> {
    let dataset = fitvault_store::generate_dataset(data, Some(target))
        .with_context(|| format!("Failed to read dataset: {}", data.display()))?;
    let definition = fitvault_store::load_pipeline(pipeline)
        .with_context(|| format!("Failed to read pipeline: {}", pipeline.display()))?;

    let mut backend = config.backend();
    let result = fitvault_store::evaluate_pipeline(&mut backend, &dataset, &definition, metric)
        .context("Failed to evaluate pipeline")?;

    println!("{}", format!("Scores for '{}':", definition.name).bold());
    for score in &result.scores {
        let label = score
            .pos_label
            .as_ref()
            .map(|l| format!(" (pos_label={})", l))
            .unwrap_or_default();
        println!(
            "  {:<10} {}{}",
            score.metric.as_str(),
            format!("{:.4}", score.value).cyan(),
            label.dimmed()
        );
    }

    Ok(())
}

/// Load a saved pipeline and run it on a dataset
pub fn produce(
    config: &Config,
    id: &str,
    data: &Path,
    target: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let store = config.open_store()?;
    let uuid = resolve_pipeline_id(&store, &IdOrPrefix::parse(id))?;
    let dataset = fitvault_store::generate_dataset(data, target)
        .with_context(|| format!("Failed to read dataset: {}", data.display()))?;

    let mut backend = config.backend();
    let result = store
        .load_and_produce(&mut backend, uuid, &dataset)
        .with_context(|| format!("Failed to produce pipeline {}", uuid))?;
    let predictions = result
        .output
        .context("Backend returned no predictions")?;

    println!("{}", "✓ Pipeline produced successfully!".green().bold());
    println!("  ID:        {}", uuid.to_string().cyan());
    println!("  Rows:      {}", predictions.len());
    println!(
        "  Anomalies: {}",
        predictions.anomalies().to_string().yellow()
    );

    if let Some(path) = output {
        write_predictions(path, &predictions)
            .with_context(|| format!("Failed to write predictions: {}", path.display()))?;
        println!("  Output:    {}", path.display().to_string().dimmed());
    }

    Ok(())
}

/// List saved pipelines
pub fn list(config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let pipelines = store.list()?;

    if pipelines.is_empty() {
        println!("{}", "No saved pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} saved pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for summary in &pipelines {
            print_pipeline_summary(summary);
        }
    }

    Ok(())
}

/// Show the model index and artifacts of a saved pipeline
pub fn inspect(config: &Config, id: &str) -> Result<()> {
    let store = config.open_store()?;
    let uuid = resolve_pipeline_id(&store, &IdOrPrefix::parse(id))?;
    let inspection = store
        .inspect(uuid)
        .with_context(|| format!("Failed to inspect pipeline {}", uuid))?;
    let index = &inspection.index;

    println!("{}", "Saved Pipeline:".bold());
    println!("  ID:      {}", index.pipeline_id.to_string().cyan());
    println!("  Name:    {}", index.pipeline_name.bold());
    println!("  Saved:   {}", index.saved_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Format:  v{}", index.format_version);

    println!("\n{}", "Carriers:".bold());
    if index.entries.is_empty() {
        println!("  {}", "none (every step state is stored in-tree)".dimmed());
    }
    for entry in &index.entries {
        print_entry(entry);
    }

    println!("\n{}", "Artifacts:".bold());
    for artifact in &inspection.artifacts {
        println!("  {}", artifact.dimmed());
    }

    Ok(())
}

/// Delete a saved pipeline
pub fn delete(config: &Config, id: &str) -> Result<()> {
    let store = config.open_store()?;
    let uuid = resolve_pipeline_id(&store, &IdOrPrefix::parse(id))?;

    store
        .remove(uuid)
        .with_context(|| format!("Failed to delete pipeline {}", uuid))?;

    println!(
        "{}",
        format!("✓ Pipeline {} deleted successfully!", uuid)
            .green()
            .bold()
    );

    Ok(())
}

fn write_predictions(path: &Path, predictions: &Predictions) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["d3mIndex", "score", "outlier"])?;
    for ((index, score), label) in predictions
        .d3m_index
        .iter()
        .zip(&predictions.scores)
        .zip(&predictions.labels)
    {
        writer.write_record([index.to_string(), score.to_string(), label.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_pipeline_summary(summary: &PipelineSummary) {
    println!("  {} {}", "▸".cyan(), summary.pipeline_name.bold());
    println!("    ID:       {}", summary.pipeline_id.to_string().dimmed());
    println!(
        "    Saved:    {}",
        summary
            .saved_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!("    Carriers: {}", summary.carriers.to_string().dimmed());
    println!();
}

fn print_entry(entry: &IndexEntry) {
    println!(
        "  step {:<3} {} {}",
        entry.step_index,
        entry.carrier_type.bold(),
        format!("rule={} stem={}", entry.rule, entry.artifact_stem).dimmed()
    );
}
