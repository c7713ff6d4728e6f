//! `sheetbot-http` is an async client for a spreadsheet-backed contact list
//! whose per-contact "bot mode" is switched through a webhook.
//!
//! Every call goes through a resilient [`Executor`]: each attempt is bound
//! to a timeout, transient failures are retried with exponential backoff,
//! and the final failure is classified into a [`SheetbotError`].
//!
//! The contact-level operations live on [`ContactsClient`]:
//! - [`ContactsClient::load_contacts`]
//! - [`ContactsClient::update_bot_mode`]
//! - [`ContactsClient::patch_bot_mode`]
//! - [`ContactsClient::toggle_bot_mode`]
//! - [`ContactsClient::check_health`]

mod client;
mod contact;
mod error;
mod executor;
mod filter;
mod inflight;
mod options;
mod request;
mod transport;
mod types;
mod wire;

pub use client::ContactsClient;
pub use contact::{
    normalize_record, normalize_records, validate_phone, BotMode, Contact, ContactList,
    RejectedRecord, ValidationError,
};
pub use error::{ErrorKind, SheetbotError};
pub use executor::{backoff_delay, Executor};
pub use filter::{ContactFilter, ContactStats};
pub use inflight::{InFlightRegistry, RequestId};
pub use options::ClientOptions;
pub use request::RequestDescriptor;
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
pub use types::{BotModeUpdate, HealthReport};

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, SheetbotError>;
