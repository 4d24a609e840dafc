use crate::config::AppConfig;
use crate::models::{Interval, Period};
use crate::store;
use crate::yahoo::YahooClient;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

/// Downloads raw OHLCV history for each ticker and, unless disabled, caches
/// it under the raw data directory. Any single failure aborts the batch.
pub async fn run(
    config: &AppConfig,
    tickers: &[String],
    period: Period,
    interval: Interval,
    save: bool,
) -> Result<()> {
    let client = YahooClient::new()?;

    let pb = ProgressBar::new(tickers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    for ticker in tickers {
        pb.set_message(ticker.clone());
        let series = client.fetch(ticker, interval, period).await?;
        info!(
            "Downloaded {} rows for {} ({} @ {})",
            series.len(),
            series.ticker(),
            period.as_str(),
            interval.as_str()
        );
        if save {
            store::save_raw(&series, period, &config.layout)?;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(())
}
