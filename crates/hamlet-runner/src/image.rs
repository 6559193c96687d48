//! Image-generation endpoint adapter.
//!
//! The image service generates on fetch: requesting the URL is what
//! triggers generation, so "calling" the adapter is pure URL
//! construction with no network traffic and no failure mode. The seed
//! makes the URL (and therefore the image) deterministic for a given
//! prompt.
//!
//! Failures can only happen at construction time (a malformed base URL
//! in configuration); after that, [`ImageEndpoint::image_url`] is total.

use crate::config::ImageEndpointConfig;
use crate::error::DispatchError;

/// A configured, validated image-generation endpoint.
#[derive(Debug, Clone)]
pub struct ImageEndpoint {
    base: reqwest::Url,
    model: String,
    token: Option<String>,
    width: u32,
    height: u32,
}

impl ImageEndpoint {
    /// Validate the configuration and build the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if the base URL does not parse
    /// or cannot carry path segments.
    pub fn new(config: &ImageEndpointConfig) -> Result<Self, DispatchError> {
        let base = reqwest::Url::parse(&config.api_url)
            .map_err(|e| DispatchError::Config(format!("invalid IMAGE_API_URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(DispatchError::Config(format!(
                "IMAGE_API_URL cannot carry a path: {}",
                config.api_url
            )));
        }
        Ok(Self {
            base,
            model: config.model.clone(),
            token: config.token.clone(),
            width: config.width,
            height: config.height,
        })
    }

    /// Construct the generation URL for a prompt.
    ///
    /// Deterministic in `(prompt, seed)`; the prompt is percent-encoded
    /// into the path, the rest travels as query parameters.
    pub fn image_url(&self, prompt: &str, seed: u64) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("prompt").push(prompt);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", &self.model)
                .append_pair("width", &self.width.to_string())
                .append_pair("height", &self.height.to_string())
                .append_pair("nologo", "true")
                .append_pair("seed", &seed.to_string());
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
        }
        url.into()
    }
}
