use std::future::Future;
use std::time::Duration;

use nanoid::nanoid;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

use crate::error::{LookupError, LookupResult};
use crate::lookup::lookup_client::LookupClient;
use crate::lookup::{InsertRequest, SearchRequest, SearchResponse};
use crate::service::CORRELATION_HEADER;

/// gRPC client for the lookup backend.
///
/// The channel connects lazily and reconnects on its own. Searches that fail
/// at the transport level are re-sent up to `retries` more times; inserts are
/// only re-sent when the request cannot have reached the handler.
#[derive(Debug, Clone)]
pub struct RpcClient {
    inner: LookupClient<Channel>,
    timeout: Duration,
    retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resend {
    /// Safe to send again whatever happened to the first attempt.
    Idempotent,
    /// Each delivery stores a key, so only resend what never got through.
    Undelivered,
}

impl Resend {
    fn after_status(self, status: &Status) -> bool {
        match self {
            Resend::Idempotent => matches!(
                status.code(),
                Code::Unavailable | Code::Cancelled | Code::DeadlineExceeded
            ),
            Resend::Undelivered => status.code() == Code::Unavailable,
        }
    }

    fn after_timeout(self) -> bool {
        self == Resend::Idempotent
    }
}

fn tagged<T>(message: T) -> (String, Request<T>) {
    let id = nanoid!();
    let mut request = Request::new(message);
    if let Ok(value) = id.parse() {
        request.metadata_mut().insert(CORRELATION_HEADER, value);
    }
    (id, request)
}

impl RpcClient {
    pub fn connect_lazy(endpoint: &str, timeout: Duration, retries: u32) -> LookupResult<Self> {
        let channel = Endpoint::from_shared(endpoint.to_string())?
            .connect_timeout(timeout)
            .connect_lazy();

        Ok(RpcClient {
            inner: LookupClient::new(channel),
            timeout,
            retries,
        })
    }

    /// Sends the textual form of `key` and returns the backend's reply as is.
    pub async fn search(&self, key: i64) -> LookupResult<SearchResponse> {
        self.search_raw(key.to_string()).await
    }

    pub async fn search_raw(&self, key: String) -> LookupResult<SearchResponse> {
        self.call(Resend::Idempotent, |mut client| {
            let (id, request) = tagged(SearchRequest { key: key.clone() });
            async move {
                tracing::debug!(correlation = %id, "sending search");
                client.search(request).await.map(|r| r.into_inner())
            }
        })
        .await
    }

    /// Inserts `key` and returns the backend's key count afterwards.
    pub async fn insert(&self, key: i64) -> LookupResult<u64> {
        let response = self
            .call(Resend::Undelivered, |mut client| {
                let (id, request) = tagged(InsertRequest { key });
                async move {
                    tracing::debug!(correlation = %id, key, "sending insert");
                    client.insert(request).await.map(|r| r.into_inner())
                }
            })
            .await?;
        Ok(response.size)
    }

    async fn call<T, F, Fut>(&self, resend: Resend, mut send: F) -> LookupResult<T>
    where
        F: FnMut(LookupClient<Channel>) -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let attempts = self.retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, send(self.inner.clone())).await {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(status)) if resend.after_status(&status) => {
                    tracing::warn!(attempt, %status, "backend call failed, reconnecting");
                    last_error = Some(LookupError::Unavailable { attempts, status });
                }
                Ok(Err(status)) => return Err(LookupError::Rejected(status)),
                Err(_) if resend.after_timeout() => {
                    tracing::warn!(attempt, timeout = ?self.timeout, "backend call timed out");
                    last_error = Some(LookupError::Timeout(self.timeout));
                }
                Err(_) => {
                    tracing::warn!(attempt, timeout = ?self.timeout, "backend call timed out, not resending");
                    return Err(LookupError::Timeout(self.timeout));
                }
            }
        }

        Err(last_error.unwrap_or(LookupError::Timeout(self.timeout)))
    }
}
