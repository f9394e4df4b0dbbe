//! Write stored results to a CSV or JSON file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use dnc_engine::EngineConfig;

use crate::context::AppContext;
use crate::export;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

pub async fn run(ctx: &AppContext, format: ExportFormat, out: Option<PathBuf>) -> Result<()> {
    let engine = ctx.build_engine(EngineConfig::default())?;
    engine.restore().await?;

    let records = engine.records();
    if records.is_empty() {
        bail!("no results to export; run a check first");
    }

    let path = out.unwrap_or_else(|| PathBuf::from(export::default_filename(format.extension())));
    let body = match format {
        ExportFormat::Csv => export::to_csv(&records),
        ExportFormat::Json => export::to_json(&records)?,
    };
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;

    ctx.print_success(&format!(
        "Exported {} records to {}",
        records.len(),
        path.display()
    ));
    Ok(())
}
