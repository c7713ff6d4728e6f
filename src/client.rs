use std::{fmt, time::Duration};

use chrono::{SecondsFormat, Utc};
use reqwest::Url;

use crate::{
    contact::{normalize_records, validate_phone},
    executor::Executor,
    transport::{ReqwestTransport, Transport},
    wire::{SheetPatch, WebhookUpdate},
    BotMode, BotModeUpdate, ClientOptions, Contact, ContactList, HealthReport, RequestDescriptor,
    Result, SheetbotError,
};

const API_KEY_HEADER: &str = "X-Api-Key";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the contact sheet and the bot-mode webhook.
#[derive(Clone)]
pub struct ContactsClient<T = ReqwestTransport> {
    executor: Executor<T>,
    sheet_url: String,
    webhook_url: Option<String>,
    api_key: Option<String>,
    options: ClientOptions,
}

impl<T> fmt::Debug for ContactsClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactsClient")
            .field("sheet_url", &self.sheet_url)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .finish()
    }
}

impl ContactsClient<ReqwestTransport> {
    /// Creates a client reading contacts from `sheet_url`.
    pub fn new(sheet_url: impl Into<String>) -> Self {
        Self::with_transport(sheet_url, ReqwestTransport::new())
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `SHEETBOT_SHEET_URL`: sheet endpoint (required)
    /// - `SHEETBOT_WEBHOOK_URL`: bot-mode webhook (optional)
    /// - `SHEETBOT_API_KEY`: sent as `X-Api-Key` (optional)
    ///
    /// Returns an error if the sheet URL is missing or empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        let sheet_url = std::env::var("SHEETBOT_SHEET_URL")
            .map_err(|_| "missing SHEETBOT_SHEET_URL environment variable".to_owned())?;
        if sheet_url.trim().is_empty() {
            return Err("SHEETBOT_SHEET_URL is set but empty".to_owned());
        }

        let mut client = Self::new(sheet_url.trim());
        if let Some(webhook) = non_empty_env("SHEETBOT_WEBHOOK_URL") {
            client = client.with_webhook(webhook);
        }
        if let Some(key) = non_empty_env("SHEETBOT_API_KEY") {
            client = client.with_api_key(key);
        }
        Ok(client)
    }
}

impl<T: Transport> ContactsClient<T> {
    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(sheet_url: impl Into<String>, transport: T) -> Self {
        Self {
            executor: Executor::with_transport(transport),
            sheet_url: sheet_url.into(),
            webhook_url: None,
            api_key: None,
            options: ClientOptions::default(),
        }
    }

    /// Sends bot-mode updates to this webhook instead of patching the sheet.
    pub fn with_webhook(mut self, webhook_url: impl Into<String>) -> Self {
        self.webhook_url = Some(webhook_url.into());
        self
    }

    /// Sends `key` as `X-Api-Key` on sheet requests.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Fetches every row of the sheet and normalizes it.
    ///
    /// Rows that fail validation end up in [`ContactList::rejected`]; only a
    /// response that is not a JSON array fails the whole load.
    pub async fn load_contacts(&self) -> Result<ContactList> {
        let request = self.sheet_request(RequestDescriptor::get(self.sheet_url.as_str()));
        let payload = self.executor.execute(&request).await?;

        let records = payload.as_array().ok_or_else(|| {
            SheetbotError::Decode(format!(
                "expected an array of contact records, got {}",
                json_kind(&payload)
            ))
        })?;
        let list = normalize_records(records);

        #[cfg(feature = "tracing")]
        tracing::info!(
            loaded = list.contacts.len(),
            rejected = list.rejected.len(),
            "contacts loaded"
        );

        Ok(list)
    }

    /// Posts the new mode for `phone` to the webhook.
    pub async fn update_bot_mode(&self, phone: &str, mode: BotMode) -> Result<BotModeUpdate> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| SheetbotError::Config("no webhook URL configured".to_owned()))?;
        let phone = phone.trim();
        validate_phone(phone)?;

        let requested_at = Utc::now();
        let body = WebhookUpdate {
            numero: phone,
            modo: mode,
            timestamp: requested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let request =
            RequestDescriptor::post_json(webhook_url, &body)?.with_options(&self.options);

        #[cfg(feature = "tracing")]
        tracing::info!(phone, mode = %mode, "updating bot mode via webhook");

        let response = self.executor.send(&request).await?;
        Ok(BotModeUpdate {
            phone: phone.to_owned(),
            mode,
            requested_at,
            response: serde_json::from_slice(&response.body).ok(),
        })
    }

    /// Writes the new mode for `phone` straight into the sheet row.
    pub async fn patch_bot_mode(&self, phone: &str, mode: BotMode) -> Result<BotModeUpdate> {
        let phone = phone.trim();
        validate_phone(phone)?;

        let url = self.row_url(phone)?;
        let request =
            self.sheet_request(RequestDescriptor::patch_json(url, &SheetPatch { modo: mode })?);
        let requested_at = Utc::now();

        #[cfg(feature = "tracing")]
        tracing::info!(phone, mode = %mode, "patching bot mode in sheet");

        let response = self.executor.send(&request).await?;
        Ok(BotModeUpdate {
            phone: phone.to_owned(),
            mode,
            requested_at,
            response: serde_json::from_slice(&response.body).ok(),
        })
    }

    /// Flips `contact`'s mode through the webhook when one is configured,
    /// otherwise through the sheet.
    pub async fn toggle_bot_mode(&self, contact: &Contact) -> Result<BotModeUpdate> {
        let mode = contact.bot_mode.toggled();
        if self.webhook_url.is_some() {
            self.update_bot_mode(&contact.phone, mode).await
        } else {
            self.patch_bot_mode(&contact.phone, mode).await
        }
    }

    /// Probes the sheet once with a short timeout.
    ///
    /// The webhook is left alone: any request to it triggers the live
    /// automation.
    pub async fn check_health(&self) -> HealthReport {
        let request = self
            .sheet_request(RequestDescriptor::get(self.sheet_url.as_str()))
            .with_max_attempts(1)
            .with_timeout(HEALTH_TIMEOUT);
        let sheet_error = self.executor.send(&request).await.err().map(|err| err.kind());

        #[cfg(feature = "tracing")]
        if let Some(kind) = sheet_error {
            tracing::warn!(%kind, "sheet endpoint is not responding");
        }

        HealthReport { sheet_error }
    }

    fn sheet_request(&self, request: RequestDescriptor) -> RequestDescriptor {
        let request = request.with_options(&self.options);
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.as_str()),
            None => request,
        }
    }

    fn row_url(&self, phone: &str) -> Result<String> {
        let mut url = Url::parse(&self.sheet_url)
            .map_err(|err| SheetbotError::Config(format!("invalid sheet URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| SheetbotError::Config("sheet URL cannot have a path".to_owned()))?
            .pop_if_empty()
            .push("numero")
            .push(phone);
        Ok(url.into())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
