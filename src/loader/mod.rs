//! Ticker-list loader. Accepts plain text or CSV: one ticker per line,
//! comma separated, or any mix of the two.

use crate::models::Ticker;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Parse tickers from file contents, preserving order and duplicates.
pub fn parse_tickers(content: &str) -> Result<Vec<Ticker>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut tickers = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Malformed ticker row {}", i + 1))?;
        tickers.extend(record.iter().filter_map(Ticker::new));
    }
    Ok(tickers)
}

/// Load a ticker file (txt or csv). A missing file yields an empty list.
pub fn load_tickers(path: &Path) -> Result<Vec<Ticker>> {
    if !path.exists() {
        warn!("Ticker file {:?} not found, using an empty list", path);
        return Ok(vec![]);
    }

    debug!("Loading tickers from {:?}", path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ticker file {:?}", path))?;
    let tickers = parse_tickers(&content)
        .with_context(|| format!("Failed to parse ticker file {:?}", path))?;

    info!("{:?}: {} tickers loaded", path, tickers.len());
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(tickers: &[Ticker]) -> Vec<&str> {
        tickers.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn test_parse_mixed_separators() {
        let t = parse_tickers("AAPL, MSFT\nSPX\n\n  QQQ ,,NVDA\r\n").unwrap();
        assert_eq!(symbols(&t), vec!["AAPL", "MSFT", "SPX", "QQQ", "NVDA"]);
    }

    #[test]
    fn test_parse_keeps_case_and_duplicates() {
        let t = parse_tickers("spx\nSPX\nspx").unwrap();
        assert_eq!(symbols(&t), vec!["spx", "SPX", "spx"]);
    }

    #[test]
    fn test_parse_quoted_fields() {
        let t = parse_tickers("\"BRK.B\",\"ES\"\n").unwrap();
        assert_eq!(symbols(&t), vec!["BRK.B", "ES"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let t = load_tickers(&dir.path().join("nope.txt")).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickers.csv");
        std::fs::write(&path, "AAPL,MSFT\nTSLA").unwrap();
        let t = load_tickers(&path).unwrap();
        assert_eq!(symbols(&t), vec!["AAPL", "MSFT", "TSLA"]);
    }
}
