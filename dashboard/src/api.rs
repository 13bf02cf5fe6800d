use crate::errors::{Error, Result};
use crate::filter::{ListEndpoint, ListFilter, QueryParams};
use crate::model::{Ack, ImageRecord, SensorReading, SettingsConfig, WateringEvent};
use crate::validate::validate_settings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const LATEST_READING_PATH: &str = "/api/data/sensors/latest";
pub const SETTINGS_PATH: &str = "/api/settings";

/// Thin JSON client for the plant API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base = Url::parse(base_url)?;
        // Paths are joined relative to the base, so it must end in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves an API path under the base URL, keeping any path prefix the base carries
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// GET `path` and decode the body. Any non-2xx status is an error.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &QueryParams) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {}?{}", url, params);

        let response = self.http.get(url).query(params.pairs()).send().await?;
        let response = check_status(response)?;
        Ok(response.json::<T>().await?)
    }

    /// Sends `body` with `method`, returning the acknowledgement if the server sent one.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<Ack> {
        let url = self.url(path)?;
        debug!("{} {}", method, url);

        let response = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await?;
        let response = check_status(response)?;

        // The ack is informational; an empty or foreign body is still success.
        let text = response.text().await?;
        Ok(serde_json::from_str::<Ack>(&text).unwrap_or_else(|_| Ack {
            success: true,
            message: text,
        }))
    }

    pub async fn latest_reading(&self) -> Result<SensorReading> {
        self.get_json(LATEST_READING_PATH, &QueryParams::new()).await
    }

    pub async fn sensor_history(&self, filter: &ListFilter) -> Result<Vec<SensorReading>> {
        let endpoint = ListEndpoint::SensorHistory;
        self.get_json(endpoint.path(), &filter.to_query(endpoint)).await
    }

    pub async fn images(&self, filter: &ListFilter) -> Result<Vec<ImageRecord>> {
        let endpoint = ListEndpoint::Images;
        self.get_json(endpoint.path(), &filter.to_query(endpoint)).await
    }

    pub async fn watering_events(&self, filter: &ListFilter) -> Result<Vec<WateringEvent>> {
        let endpoint = ListEndpoint::Watering;
        self.get_json(endpoint.path(), &filter.to_query(endpoint)).await
    }

    pub async fn settings(&self) -> Result<SettingsConfig> {
        self.get_json(SETTINGS_PATH, &QueryParams::new()).await
    }

    /// Replaces the whole settings object on the server
    pub async fn update_settings(&self, settings: &SettingsConfig) -> Result<Ack> {
        validate_settings(settings)?;
        let ack = self
            .send_json(reqwest::Method::PUT, SETTINGS_PATH, settings)
            .await?;
        info!("Settings updated: {:?}", settings);
        Ok(ack)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_join_onto_base() {
        let client = ApiClient::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url(LATEST_READING_PATH).unwrap().as_str(),
            "http://localhost:8000/api/data/sensors/latest"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        for base in ["http://gateway.local/plant", "http://gateway.local/plant/"] {
            let client = ApiClient::new(base, Duration::from_secs(5)).unwrap();
            assert_eq!(
                client.url(SETTINGS_PATH).unwrap().as_str(),
                "http://gateway.local/plant/api/settings"
            );
        }
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", Duration::from_secs(5)),
            Err(Error::Url(_))
        ));
    }

    #[test]
    fn test_update_settings_validates_before_sending() {
        tokio_test::block_on(async {
            // Nothing listens here; validation must fail first.
            let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
            let settings = SettingsConfig {
                image_capture_interval: 0,
                ..SettingsConfig::default()
            };

            let err = client.update_settings(&settings).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        });
    }
}
