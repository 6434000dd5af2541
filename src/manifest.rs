use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Project;
use crate::error::SyncError;

pub trait ManifestSource {
    fn fetch_manifest(&self, url: &str) -> Result<Vec<Project>, SyncError>;
}

impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    fn fetch_manifest(&self, url: &str) -> Result<Vec<Project>, SyncError> {
        (**self).fetch_manifest(url)
    }
}

#[derive(Clone)]
pub struct ManifestHttpClient {
    client: Client,
}

impl ManifestHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::ManifestHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ManifestSource for ManifestHttpClient {
    fn fetch_manifest(&self, url: &str) -> Result<Vec<Project>, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::ManifestHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "manifest request failed".to_string());
            return Err(SyncError::ManifestStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| SyncError::ManifestHttp(err.to_string()))?;
        parse_manifest(&body)
    }
}

pub fn parse_manifest(body: &str) -> Result<Vec<Project>, SyncError> {
    serde_json::from_str(body).map_err(|err| SyncError::ManifestParse(err.to_string()))
}

pub(crate) fn default_headers() -> Result<HeaderMap, SyncError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("sheet-sync/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| SyncError::ManifestHttp(err.to_string()))?,
    );
    Ok(headers)
}
