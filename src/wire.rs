use serde::Serialize;

use crate::BotMode;

/// Body posted to the bot-mode webhook.
#[derive(Debug, Serialize)]
pub struct WebhookUpdate<'a> {
    pub numero: &'a str,
    pub modo: BotMode,
    pub timestamp: String,
}

/// Body of a sheet row PATCH.
#[derive(Debug, Serialize)]
pub struct SheetPatch {
    pub modo: BotMode,
}
