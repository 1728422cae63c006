use reqwest::{Client, StatusCode};
use std::time;

use crate::config::PostcodeClientSettings;
use crate::domain::postcode::{clean_postcode, PostcodeResult};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum PostcodeLookupError {
    #[error("Failed to reach the postcode provider.")]
    Request(#[from] reqwest::Error),
    #[error("The postcode provider answered with status {0}.")]
    UnexpectedStatus(StatusCode),
}

#[derive(serde::Deserialize)]
struct PostcodeResponse {
    status: u16,
    result: Option<PostcodeResult>,
}

/// Client for a postcodes.io compatible lookup API.
#[derive(Debug)]
pub struct PostcodeClient {
    http_client: Client,
    base_url: String,
}

impl PostcodeClient {
    pub fn new(base_url: String, timeout: Option<time::Duration>) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(PostcodeClient {
            http_client,
            base_url,
        })
    }

    pub fn from_settings(settings: &PostcodeClientSettings) -> Result<Self, reqwest::Error> {
        PostcodeClient::new(settings.base_url.clone(), Some(settings.get_timeout()))
    }

    /// `Ok(None)` means the provider does not know the postcode.
    #[tracing::instrument(name = "Looking up a postcode", skip(self))]
    pub async fn lookup_postcode(
        &self,
        postcode: &str,
    ) -> Result<Option<PostcodeResult>, PostcodeLookupError> {
        let url = format!("{}/postcodes/{}", self.base_url, clean_postcode(postcode));

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            tracing::error!("Postcode lookup failed with status {}", status);
            return Err(PostcodeLookupError::UnexpectedStatus(status));
        }

        let body: PostcodeResponse = response.json().await?;

        if body.status == 200 {
            return Ok(body.result);
        }

        Ok(None)
    }
}
