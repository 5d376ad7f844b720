//! Test doubles shared by the core unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use assetlink_shared::{AssetLinkError, ClientOptions, Result};
use assetlink_transport::{CatalogTransport, Method, TransportResponse};

use crate::CatalogClient;

/// A request as the scripted transport saw it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Transport that replays canned responses in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.respond_with(TransportResponse::new(status, body))
    }

    pub fn respond_with(self, response: TransportResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(AssetLinkError::Transport(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogTransport for ScriptedTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        _content_type: Option<&str>,
    ) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AssetLinkError::Transport(format!(
                "no scripted response left for {method} {path}"
            )))
        })
    }
}

pub(crate) fn client_for(transport: &Arc<ScriptedTransport>) -> CatalogClient {
    CatalogClient::new(transport.clone(), ClientOptions::default())
}

/// A result page body, with a continuation reference when `next` is set.
pub(crate) fn page(items: Vec<Value>, next: Option<&str>) -> Value {
    let mut paging = json!({ "pageSize": 10, "begin": 0 });
    if let Some(next) = next {
        paging["next"] = json!(next);
    }
    json!({ "items": items, "paging": paging })
}

/// `{ _id, _type, _name }` item.
pub(crate) fn item(id: &str, asset_type: &str, name: &str) -> Value {
    json!({ "_id": id, "_type": asset_type, "_name": name })
}

/// Counts WARN events emitted on the current thread while installed.
#[derive(Clone, Default)]
pub(crate) struct WarningCounter(Arc<AtomicUsize>);

impl WarningCounter {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing_subscriber::registry().with(self.clone()).set_default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
