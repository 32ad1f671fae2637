use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::{codec::to_base64, settings::InferenceSettings};

/// Longest slice of an error body kept in the returned error.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: [String; 1],
}

/// Sends one photo plus the extraction prompt to a vision chat endpoint and
/// hands back the body untouched.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    prompt: String,
}

impl InferenceClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            prompt: settings.prompt.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the raw reply body of a 2xx response. Any other status, a
    /// timeout, or a connection failure is an error.
    pub async fn extract(&self, image_jpeg: &[u8]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &self.prompt,
                images: [to_base64(image_jpeg)],
            }],
            stream: false,
        };

        let start = Instant::now();
        info!(
            "Sending {} byte image to {} (model {})",
            image_jpeg.len(),
            self.endpoint,
            self.model
        );

        let response = match self.request(&body).send().await {
            Ok(response) => response,
            // One resend on a refused/reset connect. A connect timeout reports
            // both flags and is not resent, so the budget holds.
            Err(err) if err.is_connect() && !err.is_timeout() => {
                warn!("Connecting to {} failed ({err}); retrying once", self.endpoint);
                self.request(&body)
                    .send()
                    .await
                    .with_context(|| format!("request to {} failed", self.endpoint))?
            }
            Err(err) => {
                return Err(err).with_context(|| format!("request to {} failed", self.endpoint))
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let excerpt: String = error_body.chars().take(ERROR_BODY_LIMIT).collect();
            bail!("inference endpoint returned {status}: {excerpt}");
        }

        let reply = response
            .text()
            .await
            .context("failed to read inference response body")?;

        debug!(
            "Inference reply: {} bytes in {}ms",
            reply.len(),
            start.elapsed().as_millis()
        );

        Ok(reply)
    }

    fn request(&self, body: &ChatRequest<'_>) -> RequestBuilder {
        let request = self.client.post(&self.endpoint).json(body);
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }
}
