//! Integration tests for the scrape-and-export pipeline
//!
//! The scraper is driven by a scripted in-memory listings source, so these
//! tests never touch the network.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use cmc_supply::client::{day_timestamp, decode_listings};
use cmc_supply::{
    CmcClient, Format, ListingsQuery, ListingsSource, RowsOutput, ScrapeRequest, SupplyError,
    SupplyResult, SupplyScraper, FIELD_COUNT, HEADERS,
};

// =============================================================================
// Test Utilities
// =============================================================================

/// Answers queries from a queue and records every query it sees
struct ScriptedSource {
    responses: RefCell<VecDeque<SupplyResult<Vec<Value>>>>,
    queries: RefCell<Vec<ListingsQuery>>,
}

impl ScriptedSource {
    fn new(responses: Vec<SupplyResult<Vec<Value>>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.queries.borrow().len()
    }
}

impl ListingsSource for ScriptedSource {
    fn fetch_listings(&self, query: &ListingsQuery) -> SupplyResult<Vec<Value>> {
        self.queries.borrow_mut().push(query.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(SupplyError::Transport("no scripted response".to_string())))
    }
}

fn request(date: &str) -> ScrapeRequest {
    ScrapeRequest::builder()
        .target_date(date)
        .limit(10)
        .fiat("USD")
        .build()
        .unwrap()
}

fn listings() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "name": "Bitcoin",
            "symbol": "BTC",
            "slug": "bitcoin",
            "date_added": "2010-07-13T00:00:00.000Z",
            "tags": ["mineable", "pow", "sha-256"],
            "max_supply": 21000000,
            "circulating_supply": 18584681,
            "total_supply": 18584681,
            "infinite_supply": false,
            "platform": null,
            "cmc_rank": 1,
            "last_updated": "2021-01-01T23:59:02.000Z",
            "quote": {"USD": {"price": 29374.15, "volume_24h": 40730301359.0, "market_cap": 545913000000.0}}
        }),
        json!({
            "id": 1027,
            "name": "Ethereum",
            "symbol": "ETH",
            "slug": "ethereum",
            "cmc_rank": 2,
            "quote": {"USD": {"price": 730.37}}
        }),
        json!({"id": 825, "symbol": "USDT", "tvl_ratio": "n/a"}),
    ]
}

// =============================================================================
// Caching
// =============================================================================

#[test]
fn test_second_access_hits_cache() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    scraper.get_rows(None, false).unwrap();
    scraper.get_rows(None, false).unwrap();
    scraper.get_rows(Some(Format::Json), false).unwrap();

    assert_eq!(source.calls(), 1);
}

#[test]
fn test_forced_fetch_refreshes() {
    let source = ScriptedSource::new(vec![Ok(listings()), Ok(vec![json!({"id": 5})])]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    scraper.ensure_fetched(false).unwrap();
    scraper.ensure_fetched(true).unwrap();

    assert_eq!(source.calls(), 2);
    let rows = scraper.records().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, Some(5));
}

// =============================================================================
// Row Shape
// =============================================================================

#[test]
fn test_every_row_has_fixed_shape() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    match scraper.get_rows(None, false).unwrap() {
        RowsOutput::Rows { headers, rows } => {
            assert_eq!(headers, &HEADERS[..]);
            assert_eq!(headers.len(), FIELD_COUNT);
            assert_eq!(rows.len(), 3);
            for row in rows {
                assert_eq!(row.cells().len(), FIELD_COUNT);
            }

            // upstream order reversed: USDT first, BTC last
            assert_eq!(rows[0].symbol.as_deref(), Some("USDT"));
            assert_eq!(rows[0].tvl_ratio, None);
            assert!(rows[0].cells()[2].is_null());
            assert_eq!(rows[2].symbol.as_deref(), Some("BTC"));
        }
        other => panic!("expected raw rows, got {:?}", other),
    }
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_csv_output_is_idempotent() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let first = match scraper.get_rows(Some(Format::Csv), false).unwrap() {
        RowsOutput::Encoded(bytes) => bytes,
        other => panic!("expected encoded output, got {:?}", other),
    };
    let second = match scraper.get_rows(Some(Format::Csv), false).unwrap() {
        RowsOutput::Encoded(bytes) => bytes,
        other => panic!("expected encoded output, got {:?}", other),
    };

    assert_eq!(first, second);
}

#[test]
fn test_csv_round_trip() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let csv_bytes = scraper.dataset().unwrap().export(Format::Csv).unwrap();
    let mut reader = csv::Reader::from_reader(csv_bytes.as_slice());

    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, HEADERS);

    let parsed: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    let expected: Vec<Vec<String>> = scraper
        .records()
        .unwrap()
        .iter()
        .map(|r| r.cells().iter().map(|c| c.to_string()).collect())
        .collect();

    assert_eq!(parsed, expected);
    assert_eq!(parsed[2][0], "01-01-2021");
    assert_eq!(parsed[2][7], "21000000");
}

#[test]
fn test_write_file_appends_extension() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let path = scraper
        .write_file(Format::Csv, Some("out"), Some(dir.path()))
        .unwrap();
    assert_eq!(path, dir.path().join("out.csv"));
    assert!(path.exists());

    let path = scraper
        .write_file(Format::Json, Some("snapshot.json"), Some(dir.path()))
        .unwrap();
    assert_eq!(path, dir.path().join("snapshot.json"));

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 3);
    assert_eq!(source.calls(), 1);
}

#[test]
fn test_write_file_defaults_to_current_dir() {
    let dir = tempfile::tempdir().unwrap();
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);
    let written = scraper.write_file(Format::Csv, None, None);
    std::env::set_current_dir(&previous).unwrap();

    let path = written.unwrap();
    assert_eq!(std::env::current_dir().unwrap(), previous);
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "cmc_supply_USD_01-01-2021_01-01-2021.csv"
    );
    assert!(dir.path().join("cmc_supply_USD_01-01-2021_01-01-2021.csv").exists());
}

#[test]
#[allow(deprecated)]
fn test_export_csv_forwards() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let path = scraper.export_csv(Some("legacy"), Some(dir.path())).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.starts_with("date,id,name,symbol,slug"));
}

#[test]
fn test_write_failure_is_typed() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let err = scraper
        .write_file(Format::Csv, Some("out"), Some(Path::new("/no/such/dir/here")))
        .unwrap_err();
    assert!(matches!(err, SupplyError::Export { .. }));
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_missing_target_date_never_fetches() {
    let err = ScrapeRequest::builder()
        .limit(10)
        .fiat("USD")
        .build()
        .unwrap_err();
    assert!(matches!(err, SupplyError::InvalidParameters(_)));
}

#[test]
fn test_single_day_scenario() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);
    scraper.ensure_fetched(false).unwrap();

    let queries = source.queries.borrow();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];
    assert_eq!(query.fiat, "USD");
    assert_eq!(query.limit, 10);
    assert_eq!(day_timestamp(query.date.unwrap()), 1_609_459_200);

    let url = CmcClient::with_defaults().unwrap().listings_url(query).unwrap();
    assert_eq!(url.query(), Some("convert=USD&date=1609459200&limit=5000"));

    assert_eq!(cmc_supply::format_date(scraper.end_date()), "01-01-2021");
    assert_eq!(cmc_supply::format_date(scraper.target_date()), "01-01-2021");
}

#[test]
fn test_provider_error_is_not_cached() {
    let source = ScriptedSource::new(vec![
        Err(SupplyError::Provider("Invalid date".to_string())),
        Ok(listings()),
    ]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    match scraper.get_rows(None, false) {
        Err(SupplyError::Provider(msg)) => assert_eq!(msg, "Invalid date"),
        other => panic!("expected provider error, got {:?}", other),
    }
    assert!(scraper.records().is_none());

    scraper.get_rows(None, false).unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(scraper.records().unwrap().len(), 3);
}

#[test]
fn test_payload_without_data_is_retried() {
    let source = ScriptedSource::new(vec![
        decode_listings(r#"{"status":{"error_code":0,"error_message":null}}"#),
        Ok(listings()),
    ]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    assert!(matches!(
        scraper.get_rows(None, false),
        Err(SupplyError::Transport(_))
    ));
    assert!(!scraper.is_fetched());

    scraper.get_rows(None, false).unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(scraper.records().unwrap().len(), 3);
}

#[cfg(feature = "table")]
#[test]
fn test_date_indexed_table() {
    let source = ScriptedSource::new(vec![Ok(listings())]);
    let mut scraper = SupplyScraper::new(request("01-01-2021"), &source);

    let table = scraper.get_table(true).unwrap();
    assert_eq!(table.len(), 3);
    assert!(table.column("date").is_none());
    assert_eq!(table.index().unwrap()[0], scraper.request().target_date());

    let flat = scraper.get_table(false).unwrap();
    assert_eq!(flat.columns()[0], "date");
    assert_eq!(source.calls(), 1);
}
