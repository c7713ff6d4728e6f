use std::{collections::BTreeMap, time::Duration};

use reqwest::Method;
use serde::Serialize;

use crate::{ClientOptions, Result, SheetbotError};

/// A single HTTP call together with its timeout and retry budget.
///
/// Built once per call and only borrowed by the executor, so every retry
/// sends exactly the same request.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
    timeout: Duration,
    max_attempts: u32,
    base_delay: Duration,
}

impl RequestDescriptor {
    /// Creates a request with the default [`ClientOptions`].
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let defaults = ClientOptions::default();
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
            timeout: defaults.timeout(),
            max_attempts: defaults.max_attempts,
            base_delay: defaults.base_delay(),
        }
        .accept_json()
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` with `body` serialized as JSON.
    pub fn post_json<B: Serialize>(url: impl Into<String>, body: &B) -> Result<Self> {
        Self::new(Method::POST, url).json(body)
    }

    /// Creates a `PATCH` with `body` serialized as JSON.
    pub fn patch_json<B: Serialize>(url: impl Into<String>, body: &B) -> Result<Self> {
        Self::new(Method::PATCH, url).json(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Applies timeout and retry settings from `opts`.
    pub fn with_options(mut self, opts: &ClientOptions) -> Self {
        self.timeout = opts.timeout();
        self.max_attempts = opts.max_attempts.max(1);
        self.base_delay = opts.base_delay();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    fn accept_json(self) -> Self {
        self.header("Accept", "application/json")
    }

    fn json<B: Serialize>(self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| SheetbotError::Unknown(format!("could not encode request body: {err}")))?;
        Ok(self.header("Content-Type", "application/json").body(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use super::RequestDescriptor;
    use crate::ClientOptions;

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let request = RequestDescriptor::get("http://sheet").with_max_attempts(0);
        assert_eq!(request.max_attempts(), 1);

        let request = RequestDescriptor::get("http://sheet").with_options(&ClientOptions {
            max_attempts: 0,
            ..ClientOptions::default()
        });
        assert_eq!(request.max_attempts(), 1);
    }

    #[test]
    fn options_set_timeout_and_backoff() {
        let request = RequestDescriptor::get("http://sheet").with_options(&ClientOptions {
            timeout_ms: 250,
            max_attempts: 5,
            retry_backoff_ms: 20,
        });
        assert_eq!(request.timeout(), Duration::from_millis(250));
        assert_eq!(request.max_attempts(), 5);
        assert_eq!(request.base_delay(), Duration::from_millis(20));
    }

    #[test]
    fn post_json_sets_body_and_content_type() {
        let request = RequestDescriptor::post_json("http://hook", &json!({"modo": "bot"}))
            .expect("body must encode");
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(
            request.headers().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body_bytes(), Some(br#"{"modo":"bot"}"#.as_slice()));
    }
}
