use crate::config::AppConfig;
use crate::features::build_features;
use crate::store;
use crate::yahoo::YahooClient;
use anyhow::Result;
use log::info;

/// Builds the feature table for one ticker from the latest cached raw data
/// (or a fresh download) and persists it under the processed directory.
pub async fn run(config: &AppConfig, ticker: &str, fetch_fresh: bool) -> Result<()> {
    let series = if fetch_fresh {
        let client = YahooClient::new()?;
        let series = client.fetch(ticker, config.interval, config.period).await?;
        store::save_raw(&series, config.period, &config.layout)?;
        series
    } else {
        store::load_latest_series(ticker, &config.layout)?
    };

    let table = build_features(&series, &config.features)?;
    info!(
        "Built {} feature rows x {} columns for {}",
        table.len(),
        table.columns().len(),
        series.ticker()
    );

    store::save_features(&table, series.ticker(), &config.layout)?;
    Ok(())
}
