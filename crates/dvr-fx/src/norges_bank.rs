//! Norges Bank EXR daily-spot source.
//!
//! One bounded HTTP attempt per call against the SDMX-JSON endpoint
//! (`/api/data/EXR/B.{base}.{quote}.SP`). Values come back exactly as
//! published; per-100 normalization is the resolver's job.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::source::{RateSource, RateSourceError};

/// `RateSource` over the Norges Bank EXR API.
///
/// The base URL is injectable so tests can point at a local mock server.
#[derive(Debug, Clone)]
pub struct NorgesBankSource {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl NorgesBankSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url("https://data.norges-bank.no".to_string(), timeout)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    fn build_series_url(&self, base: &str, quote: &str) -> String {
        format!(
            "{}/api/data/EXR/B.{}.{}.SP",
            self.base_url.trim_end_matches('/'),
            base,
            quote
        )
    }
}

#[async_trait::async_trait]
impl RateSource for NorgesBankSource {
    fn source_name(&self) -> &'static str {
        "norges-bank"
    }

    async fn fetch_spot(
        &self,
        base: &str,
        quote: &str,
        on: NaiveDate,
    ) -> Result<f64, RateSourceError> {
        let url = self.build_series_url(base, quote);
        let date_s = on.format("%Y-%m-%d").to_string();

        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .query(&[
                ("startPeriod", date_s.as_str()),
                ("endPeriod", date_s.as_str()),
                ("format", "sdmx-json"),
            ])
            .send()
            .await
            .map_err(|e| RateSourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            // Norges Bank answers 404 for pairs/dates with no published data.
            if status.as_u16() == 404 {
                return Err(RateSourceError::NoObservation);
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(RateSourceError::Api {
                status: Some(status.as_u16()),
                message: body.chars().take(200).collect(),
            });
        }

        let body: ExrResponse = resp
            .json()
            .await
            .map_err(|e| RateSourceError::Decode(e.to_string()))?;
        body.first_observation()
    }
}

// SDMX-JSON shape, reduced to the fields we read. Series and observation
// keys are positional strings ("0:0:0:0", "0") chosen by the server.
#[derive(Debug, Deserialize)]
struct ExrResponse {
    data: ExrData,
}

#[derive(Debug, Deserialize)]
struct ExrData {
    #[serde(rename = "dataSets", default)]
    data_sets: Vec<ExrDataSet>,
}

#[derive(Debug, Deserialize)]
struct ExrDataSet {
    #[serde(default)]
    series: HashMap<String, ExrSeries>,
}

#[derive(Debug, Deserialize)]
struct ExrSeries {
    #[serde(default)]
    observations: HashMap<String, Vec<serde_json::Value>>,
}

impl ExrResponse {
    /// Extract the first observation value of the first series,
    /// deterministically (keys sorted, since SDMX map order is unspecified).
    fn first_observation(&self) -> Result<f64, RateSourceError> {
        let data_set = self
            .data
            .data_sets
            .first()
            .ok_or(RateSourceError::NoObservation)?;

        let mut series_keys: Vec<&String> = data_set.series.keys().collect();
        series_keys.sort();
        let series = series_keys
            .first()
            .map(|k| &data_set.series[*k])
            .ok_or(RateSourceError::NoObservation)?;

        let mut obs_keys: Vec<&String> = series.observations.keys().collect();
        obs_keys.sort_by_key(|k| k.parse::<u64>().unwrap_or(u64::MAX));
        let obs = obs_keys
            .first()
            .map(|k| &series.observations[*k])
            .ok_or(RateSourceError::NoObservation)?;

        let value = obs.first().ok_or(RateSourceError::NoObservation)?;
        match value {
            serde_json::Value::String(s) => s.parse::<f64>().map_err(|_| {
                RateSourceError::Decode(format!("non-numeric observation value: '{s}'"))
            }),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| RateSourceError::Decode("observation out of f64 range".into())),
            other => Err(RateSourceError::Decode(format!(
                "unexpected observation value type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 25).unwrap()
    }

    fn sdmx_body(value: &str) -> String {
        format!(
            r#"{{"data":{{"dataSets":[{{"series":{{"0:0:0:0":{{"observations":{{"0":["{value}"]}}}}}}}}]}}}}"#
        )
    }

    #[tokio::test]
    async fn fetches_and_parses_sdmx_observation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/data/EXR/B.USD.NOK.SP")
                    .query_param("startPeriod", "2025-04-25")
                    .query_param("endPeriod", "2025-04-25")
                    .query_param("format", "sdmx-json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(sdmx_body("10.5"));
            })
            .await;

        let src =
            NorgesBankSource::with_base_url(server.base_url(), Duration::from_secs(5));
        let rate = src.fetch_spot("USD", "NOK", date()).await.unwrap();
        assert_eq!(rate, 10.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn raw_per_100_value_passes_through_unnormalized() {
        // Normalization belongs to the resolver; the source reports verbatim.
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/data/EXR/B.JPY.NOK.SP");
                then.status(200).body(sdmx_body("650"));
            })
            .await;

        let src =
            NorgesBankSource::with_base_url(server.base_url(), Duration::from_secs(5));
        assert_eq!(src.fetch_spot("JPY", "NOK", date()).await.unwrap(), 650.0);
    }

    #[tokio::test]
    async fn http_404_maps_to_no_observation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/data/EXR/B.EUR.NOK.SP");
                then.status(404);
            })
            .await;

        let src =
            NorgesBankSource::with_base_url(server.base_url(), Duration::from_secs(5));
        let err = src.fetch_spot("EUR", "NOK", date()).await.unwrap_err();
        assert!(matches!(err, RateSourceError::NoObservation));
    }

    #[tokio::test]
    async fn http_500_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/data/EXR/B.USD.NOK.SP");
                then.status(500).body("internal error");
            })
            .await;

        let src =
            NorgesBankSource::with_base_url(server.base_url(), Duration::from_secs(5));
        let err = src.fetch_spot("USD", "NOK", date()).await.unwrap_err();
        match err {
            RateSourceError::Api { status, .. } => assert_eq!(status, Some(500)),
            other => panic!("expected Api error, got {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/data/EXR/B.USD.NOK.SP");
                then.status(200).body("not json");
            })
            .await;

        let src =
            NorgesBankSource::with_base_url(server.base_url(), Duration::from_secs(5));
        let err = src.fetch_spot("USD", "NOK", date()).await.unwrap_err();
        assert!(matches!(err, RateSourceError::Decode(_)));
    }

    #[test]
    fn empty_series_is_no_observation() {
        let body: ExrResponse =
            serde_json::from_str(r#"{"data":{"dataSets":[{"series":{}}]}}"#).unwrap();
        assert!(matches!(
            body.first_observation(),
            Err(RateSourceError::NoObservation)
        ));
    }
}
