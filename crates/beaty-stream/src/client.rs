//! HTTP transport for `POST /query`.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{debug, info, warn};

use beaty_core::config::ApiConfig;
use beaty_core::types::{LatLng, QueryMode, QueryRequest};

use crate::decode::Utf8Carry;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::framer::TransportFramer;

/// Events of one query response, ending with exactly one terminal event.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Opens a response stream for a query.
///
/// Implemented over HTTP by [`QueryClient`]; tests substitute scripted
/// streams.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn open(&self, request: &QueryRequest) -> Result<EventStream, StreamError>;
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_location: Option<LatLng>,
    mode: QueryMode,
}

impl<'a> From<&'a QueryRequest> for QueryBody<'a> {
    fn from(request: &'a QueryRequest) -> Self {
        Self {
            query: &request.text,
            user_location: request.location,
            mode: request.mode,
        }
    }
}

/// reqwest-backed client for the Beaty query endpoint.
#[derive(Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl QueryClient {
    pub fn new(config: &ApiConfig) -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| StreamError::Client(e.to_string()))?;
        Ok(Self {
            http,
            url: config.query_url(),
            token: config.token.clone(),
        })
    }

    /// Replace the bearer token sent with each query.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl QueryTransport for QueryClient {
    async fn open(&self, request: &QueryRequest) -> Result<EventStream, StreamError> {
        info!(url = %self.url, mode = ?request.mode, "opening query stream");

        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, "text/event-stream")
            .json(&QueryBody::from(request));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "query rejected");
            return Err(StreamError::Status(status.as_u16()));
        }
        debug!(
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            "query stream open"
        );

        Ok(Box::pin(FramedEvents::new(Box::pin(response.bytes_stream()))))
    }
}

/// Adapts a byte stream into [`StreamEvent`]s.
///
/// A read failure mid-stream becomes a terminal `Error` event. Nothing more
/// is read once a terminal event has been produced.
pub struct FramedEvents<S> {
    inner: S,
    decoder: Utf8Carry,
    framer: TransportFramer,
    ready: VecDeque<StreamEvent>,
    finished: bool,
}

impl<S> FramedEvents<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8Carry::new(),
            framer: TransportFramer::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    pub fn malformed_frames(&self) -> usize {
        self.framer.malformed_frames()
    }
}

impl<S, E> Stream for FramedEvents<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.finished || this.framer.is_terminated() {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = this.decoder.decode(&bytes);
                    this.ready.extend(this.framer.feed(&text));
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "query stream read failed");
                    this.finished = true;
                    this.ready.push_back(StreamEvent::Error {
                        message: StreamError::Network(e.to_string()).to_string(),
                    });
                }
                Poll::Ready(None) => {
                    let tail = this.decoder.finish();
                    this.ready.extend(this.framer.feed(&tail));
                    this.ready.extend(this.framer.finish());
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
