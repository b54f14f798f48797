use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use rand::RngCore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::config::TestDefinition;
use crate::error::{AppError, AppResult, ConfigError};
use crate::events::{EventBus, RequestFailure, RequestSuccess, RequestTimings};
use crate::runner::TaskFn;

/// Largest random request body a definition may ask for.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Issues one configured HTTP request per call and publishes the outcome.
///
/// 2xx responses count as successes with the drained body length; any
/// other status is a failure labelled with the code, and transport errors
/// are failures labelled with the error text.
#[derive(Debug)]
pub struct HttpTask {
    client: Client,
    name: String,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl HttpTask {
    /// # Errors
    ///
    /// Returns an error when the URL, method or a header is invalid, or the
    /// body size exceeds [`MAX_BODY_BYTES`].
    pub fn from_definition(client: Client, definition: &TestDefinition) -> AppResult<Self> {
        let url = Url::parse(&definition.url).map_err(|err| {
            AppError::config(ConfigError::InvalidUrl {
                url: definition.url.clone(),
                reason: err.to_string(),
            })
        })?;
        let method_name = definition.method.trim().to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_err| {
            AppError::config(ConfigError::InvalidMethod {
                value: definition.method.clone(),
                url: definition.url.clone(),
            })
        })?;

        let mut headers = HeaderMap::new();
        for header in &definition.headers {
            let invalid = || {
                AppError::config(ConfigError::InvalidHeader {
                    name: header.name.clone(),
                    url: definition.url.clone(),
                })
            };
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|_err| invalid())?;
            let value = HeaderValue::from_str(&header.value).map_err(|_err| invalid())?;
            headers.insert(name, value);
        }

        let body = random_body(definition.body, &definition.url)?;
        Ok(Self {
            client,
            name: definition.task_name().to_owned(),
            method,
            url,
            headers,
            body,
        })
    }

    async fn execute(&self) -> Result<(u16, u64), reqwest::Error> {
        let mut request = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        if let Some(body) = self.body.as_ref() {
            request = request.body(body.clone());
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = drain_response_body(response).await?;
        Ok((status, bytes))
    }
}

fn random_body(size: u64, url: &str) -> AppResult<Option<Vec<u8>>> {
    if size == 0 {
        return Ok(None);
    }
    let too_large = || {
        AppError::config(ConfigError::BodyTooLarge {
            size,
            url: url.to_owned(),
        })
    };
    if size > MAX_BODY_BYTES {
        return Err(too_large());
    }
    let len = usize::try_from(size).map_err(|_err| too_large())?;
    let mut body = vec![0_u8; len];
    rand::thread_rng().fill_bytes(&mut body);
    Ok(Some(body))
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

#[async_trait]
impl TaskFn for HttpTask {
    async fn call(&self, events: &EventBus) {
        let started = Instant::now();
        let outcome = self.execute().await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let method = self.method.as_str();

        match outcome {
            Ok((status, bytes)) if (200..300).contains(&status) => {
                let timings = RequestTimings::elapsed(elapsed_ms);
                events
                    .publish_success(RequestSuccess::new(method, &self.name, timings, bytes))
                    .await;
            }
            Ok((status, _)) => {
                events
                    .publish_failure(RequestFailure::new(
                        method,
                        &self.name,
                        elapsed_ms,
                        status.to_string(),
                    ))
                    .await;
            }
            Err(err) => {
                debug!("{} {} failed: {}", method, self.url, err);
                events
                    .publish_failure(RequestFailure::new(
                        method,
                        &self.name,
                        elapsed_ms,
                        err.to_string(),
                    ))
                    .await;
            }
        }
    }
}
