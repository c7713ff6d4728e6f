use std::{future::Future, time::Duration};

use serde::de::DeserializeOwned;
use tokio::time::{sleep, timeout};

use crate::{
    inflight::InFlightRegistry,
    transport::{RawResponse, ReqwestTransport, Transport, TransportError},
    ErrorKind, RequestDescriptor, Result, SheetbotError,
};

/// Delay before the retry that follows the 1-indexed `attempt`.
///
/// `base * 2^(attempt - 1)`, with the exponent capped at 16 and the
/// multiplication saturating.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exp)
}

/// Runs requests with a per-attempt timeout, exponential backoff and
/// error classification.
#[derive(Clone, Debug)]
pub struct Executor<T = ReqwestTransport> {
    transport: T,
    in_flight: InFlightRegistry,
}

impl Executor<ReqwestTransport> {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }
}

impl Default for Executor<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Executor<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls that are currently running on this executor or its clones.
    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Executes the request and decodes the body as JSON.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<serde_json::Value> {
        self.execute_as(request).await
    }

    /// Executes the request and decodes the body into `D`.
    ///
    /// A body that does not decode is terminal; no attempt is spent on it.
    pub async fn execute_as<D: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<D> {
        let response = self.send(request).await?;
        decode_body(&response)
    }

    /// Like [`Executor::execute`], but gives up with
    /// [`SheetbotError::Cancelled`] as soon as `cancel` resolves.
    ///
    /// The running attempt is dropped, which aborts the underlying call.
    pub async fn execute_until<C>(
        &self,
        request: &RequestDescriptor,
        cancel: C,
    ) -> Result<serde_json::Value>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => {
                #[cfg(feature = "tracing")]
                tracing::debug!(url = request.url(), "request cancelled by caller");
                Err(SheetbotError::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }

    /// Runs the retry loop and returns the first 2xx response undecoded.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let guard = self.in_flight.register();
        let max_attempts = request.max_attempts().max(1);
        let mut attempt = 1u32;

        loop {
            guard.set_attempt(attempt);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                request_id = %guard.id,
                attempt,
                max_attempts,
                method = %request.method(),
                url = request.url(),
                "sending request"
            );

            let failure = match timeout(request.timeout(), self.transport.send(request)).await {
                Ok(Ok(response)) if response.is_success() => return Ok(response),
                Ok(Ok(response)) => Failure::Status {
                    status: response.status,
                    body: response.text(),
                },
                Ok(Err(TransportError::Timeout)) | Err(_) => Failure::Timeout,
                Ok(Err(TransportError::Connect(message))) => Failure::Network(message),
                Ok(Err(TransportError::Other(message))) => Failure::Other(message),
            };

            #[cfg(feature = "tracing")]
            tracing::warn!(request_id = %guard.id, attempt, error = %failure, "attempt failed");

            if !failure.is_retryable() || attempt >= max_attempts {
                let err = failure.classify(attempt);
                #[cfg(feature = "tracing")]
                tracing::warn!(request_id = %guard.id, kind = %err.kind(), "request failed");
                return Err(err);
            }

            let delay = backoff_delay(request.base_delay(), attempt);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                request_id = %guard.id,
                delay_ms = delay.as_millis() as u64,
                "retrying request after backoff"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

fn decode_body<D: DeserializeOwned>(response: &RawResponse) -> Result<D> {
    serde_json::from_slice(&response.body).map_err(|err| {
        SheetbotError::Decode(format!(
            "invalid response JSON: {err}; body: {}",
            response.text()
        ))
    })
}

/// Why a single attempt failed.
#[derive(Debug)]
enum Failure {
    Timeout,
    Network(String),
    Status { status: u16, body: String },
    Other(String),
}

impl Failure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Status { status, .. } => {
                matches!(ErrorKind::from_status(*status), ErrorKind::ServerError(_))
            }
            Self::Other(_) => false,
        }
    }

    fn classify(self, attempts: u32) -> SheetbotError {
        match self {
            Self::Timeout => SheetbotError::Timeout { attempts },
            Self::Network(message) => SheetbotError::NetworkUnavailable { attempts, message },
            Self::Status { status, body } => match ErrorKind::from_status(status) {
                ErrorKind::ClientError(_) => SheetbotError::ClientError { status, body },
                ErrorKind::ServerError(_) => SheetbotError::ServerError {
                    status,
                    attempts,
                    body,
                },
                _ => SheetbotError::Unknown(format!("unexpected status {status}: {body}")),
            },
            Self::Other(message) => SheetbotError::Unknown(message),
        }
    }
}

#[cfg(feature = "tracing")]
impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Network(message) => write!(f, "network: {message}"),
            Self::Status { status, .. } => write!(f, "http {status}"),
            Self::Other(message) => f.write_str(message),
        }
    }
}
