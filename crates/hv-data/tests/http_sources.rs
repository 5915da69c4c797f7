use chrono::NaiveDate;
use hv_data::{PriceSource, PriceSourceConfig, SourceKind, YahooPriceSource};
use hv_types::Ticker;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const CHART_BODY: &str = r#"{
  "chart": {
    "result": [{
      "meta": {"gmtoffset": -18000},
      "timestamp": [1704205800, 1704292200, 1704378600],
      "indicators": {
        "quote": [{"close": [101.0, 99.0, 103.0]}],
        "adjclose": [{"adjclose": [100.0, null, 102.0]}]
      }
    }],
    "error": null
  }
}"#;

/// Serves `status` and `body` to every connection after `delay`.
async fn serve(status: &'static str, body: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buffer = [0u8; 4096];
                let _ = socket.read(&mut buffer).await;
                tokio::time::sleep(delay).await;

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[tokio::test]
async fn yahoo_source_reads_chart_over_http() {
    let url = serve("200 OK", CHART_BODY, Duration::ZERO).await;
    let source = YahooPriceSource::new(&url, Duration::from_secs(5)).unwrap();
    let aapl = Ticker::new("AAPL").unwrap();

    let series = source.fetch_series(&aapl, jan(1), jan(31)).await.unwrap();
    let prices: Vec<f64> = series.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![100.0, 102.0]);
    assert_eq!(series[0].date, jan(2));

    let matrix = source.fetch_prices(&[aapl], jan(1), jan(31)).await.unwrap();
    assert_eq!(matrix.len(), 2);
}

#[tokio::test]
async fn slow_server_times_out_as_data_unavailable() {
    let url = serve("200 OK", CHART_BODY, Duration::from_secs(10)).await;
    let source = YahooPriceSource::new(&url, Duration::from_secs(1)).unwrap();
    let tickers = vec![Ticker::new("AAPL").unwrap(), Ticker::new("ENI").unwrap()];

    let err = source.fetch_prices(&tickers, jan(1), jan(31)).await.unwrap_err();

    assert!(err.is_data_unavailable());
    assert_eq!(err.unavailable_tickers(), ["AAPL".to_string(), "ENI".to_string()]);
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn http_error_without_chart_body_is_data_unavailable() {
    let url = serve("503 Service Unavailable", "busy", Duration::ZERO).await;
    let source = YahooPriceSource::new(&url, Duration::from_secs(5)).unwrap();

    let err = source
        .fetch_prices(&[Ticker::new("AAPL").unwrap()], jan(1), jan(31))
        .await
        .unwrap_err();

    assert!(err.is_data_unavailable());
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn configured_csv_source_reads_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ENI.csv"),
        "Date,Adj Close\n2024-01-02,12.5\n2024-01-03,12.75\n2024-01-04,12.6\n",
    )
    .unwrap();
    let data_dir = dir.path().to_string_lossy().to_string();

    let config = PriceSourceConfig::from_lookup(|key| match key {
        "HISTVAR_SOURCE" => Some("csv".to_string()),
        "HISTVAR_DATA_DIR" => Some(data_dir.clone()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.kind, SourceKind::Csv);

    let source = config.build().unwrap();
    let matrix = source
        .fetch_prices(&[Ticker::new("eni").unwrap()], jan(1), jan(3))
        .await
        .unwrap();

    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.dates(), [jan(2), jan(3)]);
}
