use crate::config::AppConfig;
use crate::features::build_features;
use crate::normalize::normalize_features;
use crate::store;
use crate::yahoo::YahooClient;
use anyhow::Result;
use log::info;

/// Full batch run: fetch, build features and normalize for each ticker,
/// persisting every stage. Stages run sequentially; the first failure
/// aborts the whole run.
pub async fn run(config: &AppConfig, tickers: &[String]) -> Result<()> {
    let client = YahooClient::new()?;

    for ticker in tickers {
        info!("Running pipeline for {}", ticker);

        let series = client.fetch(ticker, config.interval, config.period).await?;
        store::save_raw(&series, config.period, &config.layout)?;

        let table = build_features(&series, &config.features)?;
        store::save_features(&table, series.ticker(), &config.layout)?;

        let (normalized, scaler) = normalize_features(&table, &[])?;
        store::save_normalized(&normalized, &scaler, series.ticker(), &config.layout)?;

        info!(
            "Pipeline complete for {}: {} raw rows -> {} feature rows",
            series.ticker(),
            series.len(),
            table.len()
        );
    }

    Ok(())
}
