use crate::config::AppConfig;
use crate::normalize::normalize_features;
use crate::store::{self, DataKind};
use anyhow::Result;
use log::info;

/// Normalizes the latest cached feature table for one ticker and persists
/// the rescaled table together with its fitted scaler.
pub async fn run(config: &AppConfig, ticker: &str, exclude: &[String]) -> Result<()> {
    let table = store::load_latest_features(ticker, DataKind::Processed, &config.layout)?;
    let (normalized, scaler) = normalize_features(&table, exclude)?;
    info!(
        "Normalized {} columns for {} ({} excluded)",
        scaler.scales().len(),
        ticker,
        exclude.len()
    );

    store::save_normalized(&normalized, &scaler, ticker, &config.layout)?;
    Ok(())
}
