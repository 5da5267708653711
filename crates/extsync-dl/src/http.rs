use ureq::{http::Response, Body};

use crate::{error::DownloadError, http_client::SHARED_AGENT};

pub struct Http;

impl Http {
    /// Issues a GET request; any non-2xx final status is an error.
    pub fn fetch(url: &str) -> Result<Response<Body>, DownloadError> {
        SHARED_AGENT
            .get(url)
            .call()
            .map_err(|err| DownloadError::from_request(url, err))
    }

    /// Fetches `url` and decodes its body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, DownloadError> {
        Self::fetch(url)?
            .body_mut()
            .read_json()
            .map_err(|err| {
                DownloadError::InvalidResponse {
                    url: url.to_string(),
                    reason: err.to_string(),
                }
            })
    }
}
