//! Request dispatcher: fake-or-live execution, in-flight tracking and
//! cancellation.
//!
//! # Design
//! `Networking` is a cheap handle around one shared state. The fake registry
//! and the in-flight table live behind a single mutex, so a fake lookup and
//! the creation of the in-flight entry happen atomically.
//!
//! Each in-flight entry owns the caller's completion. Whoever removes the
//! entry from the table (the request task on natural completion, or a cancel
//! call) is the only party allowed to invoke the completion, which gives the
//! exactly-once guarantee when cancellation races completion. Request tasks
//! run on the tokio runtime and may finish on any worker thread.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::classifier::classify;
use crate::config::NetworkingConfig;
use crate::encoding::{build_http_request, url_for};
use crate::error::{BuildError, CancellationError, NetworkError};
use crate::fake::{Bundle, FakeBody, FakeRegistry, FakeResponse};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Request, ResponseKind, TaskCategory};
use crate::response::{Response, ResponseMeta};
use crate::transport::{ReqwestTransport, Transport};

/// Identifier of a dispatched request, unique per client while in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Completion = Box<dyn FnOnce(Response) + Send + 'static>;

struct InFlight {
    method: HttpMethod,
    /// Base URL plus path, without query parameters.
    url: String,
    category: TaskCategory,
    kind: ResponseKind,
    cancel: CancellationToken,
    completion: Completion,
}

#[derive(Default)]
struct State {
    fakes: FakeRegistry,
    in_flight: HashMap<RequestId, InFlight>,
}

struct Shared {
    config: NetworkingConfig,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `response` if `id` is still in flight; a no-op otherwise.
    fn complete(&self, id: &RequestId, response: Response) {
        let entry = self.lock().in_flight.remove(id);
        match entry {
            Some(entry) => {
                debug!(
                    request_id = %id,
                    method = %entry.method,
                    url = %entry.url,
                    status = ?response.status_code(),
                    success = response.is_success(),
                    "request completed"
                );
                (entry.completion)(response);
            }
            None => trace!(request_id = %id, "request already settled, dropping result"),
        }
    }

    /// Cancel every in-flight request matching `predicate`.
    fn cancel_where(&self, predicate: impl Fn(&RequestId, &InFlight) -> bool) -> usize {
        let cancelled: Vec<(RequestId, InFlight)> = {
            let mut state = self.lock();
            let ids: Vec<RequestId> = state
                .in_flight
                .iter()
                .filter(|(id, entry)| predicate(id, entry))
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| state.in_flight.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        let count = cancelled.len();
        for (id, entry) in cancelled {
            debug!(request_id = %id, method = %entry.method, url = %entry.url, "request cancelled");
            entry.cancel.cancel();
            let response = classify(&entry.url, Err(CancellationError.into()), entry.kind);
            (entry.completion)(response);
        }
        count
    }
}

/// Completes the request with a cancellation failure if the task is dropped
/// before it delivered a result (runtime shutdown, panic in the transport).
struct Settle {
    shared: Arc<Shared>,
    id: RequestId,
    url: String,
    kind: ResponseKind,
    done: bool,
}

impl Settle {
    fn deliver(mut self, response: Response) {
        self.done = true;
        self.shared.complete(&self.id, response);
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if !self.done {
            let response = classify(&self.url, Err(CancellationError.into()), self.kind);
            self.shared.complete(&self.id, response);
        }
    }
}

/// HTTP client with a fake registry and cancellable in-flight requests.
#[derive(Clone)]
pub struct Networking {
    shared: Arc<Shared>,
}

impl fmt::Debug for Networking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Networking")
            .field("base_url", &self.shared.config.base_url)
            .field("transport", &self.shared.transport)
            .field("fakes", &state.fakes.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

/// Builder for `Networking`.
#[derive(Debug)]
pub struct NetworkingBuilder {
    config: NetworkingConfig,
    transport: Option<Arc<dyn Transport>>,
    runtime: Option<Handle>,
}

impl NetworkingBuilder {
    /// Use `transport` instead of a reqwest transport built from the config.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Spawn request tasks on `runtime` instead of the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Networking, BuildError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| BuildError::NoRuntime(e.to_string()))?,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };
        let mut config = self.config;
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Networking {
            shared: Arc::new(Shared {
                config,
                transport,
                runtime,
                state: Mutex::new(State::default()),
            }),
        })
    }
}

impl Networking {
    /// Client for `base_url` on the current tokio runtime with the reqwest
    /// transport.
    pub fn new(base_url: &str) -> Result<Self, BuildError> {
        Self::builder(NetworkingConfig::new(base_url)).build()
    }

    pub fn builder(config: NetworkingConfig) -> NetworkingBuilder {
        NetworkingBuilder {
            config,
            transport: None,
            runtime: None,
        }
    }

    pub fn config(&self) -> &NetworkingConfig {
        &self.shared.config
    }

    /// Absolute URL for `path`.
    pub fn url_for(&self, path: &str) -> Result<url::Url, NetworkError> {
        url_for(&self.shared.config.base_url, path)
    }

    /// Dispatch `request`; `completion` is invoked exactly once with the
    /// classified response. The identifier is returned before the completion
    /// can run.
    pub fn request<F>(&self, request: Request, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let shared = &self.shared;
        let id = RequestId::new();
        let category = request.category();
        let kind = request.kind;
        let target = match self.url_for(&request.path) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => format!("{}{}", shared.config.base_url, request.path),
        };
        let prepared = build_http_request(&shared.config.base_url, &shared.config.headers, &request);
        let response_url = prepared
            .as_ref()
            .map(|req| req.url.clone())
            .unwrap_or_else(|_| target.clone());
        let cancel = CancellationToken::new();

        let fake = {
            let mut state = shared.lock();
            let fake = state.fakes.lookup(request.method, &request.path);
            state.in_flight.insert(
                id.clone(),
                InFlight {
                    method: request.method,
                    url: target.clone(),
                    category,
                    kind,
                    cancel: cancel.clone(),
                    completion: Box::new(completion),
                },
            );
            fake
        };

        debug!(
            request_id = %id,
            method = %request.method,
            url = %response_url,
            faked = fake.is_some(),
            "dispatching request"
        );

        let settle = Settle {
            shared: Arc::clone(shared),
            id: id.clone(),
            url: response_url.clone(),
            kind,
            done: false,
        };
        let transport = Arc::clone(&shared.transport);
        let (release, released) = oneshot::channel::<()>();
        shared.runtime.spawn(async move {
            // Held until the caller has the identifier.
            let _ = released.await;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = execute(transport.as_ref(), prepared, fake) => outcome,
            };
            settle.deliver(classify(&response_url, outcome, kind));
        });

        let _ = release.send(());
        id
    }

    /// Dispatch `request` and await its response.
    pub fn send(&self, request: Request) -> PendingRequest {
        let (tx, rx) = oneshot::channel();
        let id = self.request(request, move |response| {
            let _ = tx.send(response);
        });
        PendingRequest { id, rx }
    }

    /// Register a fake for `(method, path)` answering with `body` and
    /// `status`. Replaces any earlier fake for the same key.
    pub fn fake(&self, method: HttpMethod, path: &str, body: FakeBody, status: u16) {
        self.fake_response(method, path, FakeResponse::new(body, status));
    }

    /// Register a fake answering with the contents of `file_name`, read from
    /// `bundle` when a matching request is dispatched.
    pub fn fake_file(&self, method: HttpMethod, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake(method, path, FakeBody::file(file_name, bundle), 200);
    }

    pub fn fake_response(&self, method: HttpMethod, path: &str, response: FakeResponse) {
        debug!(%method, path, status = response.status, "registering fake");
        self.shared.lock().fakes.register(method, path, response);
    }

    pub fn remove_fake(&self, method: HttpMethod, path: &str) -> bool {
        self.shared.lock().fakes.clear(method, path)
    }

    pub fn remove_all_fakes(&self) {
        self.shared.lock().fakes.clear_all();
    }

    /// Cancel the in-flight requests for `(category, method, url)`, where
    /// `url` is the base URL plus path. Each cancelled request completes
    /// with a cancellation failure. Returns how many were cancelled.
    pub fn cancel_request(&self, category: TaskCategory, method: HttpMethod, url: &str) -> usize {
        self.shared.cancel_where(|_, entry| {
            entry.category == category && entry.method == method && entry.url == url
        })
    }

    /// Cancel one request; `false` if it already completed.
    pub fn cancel(&self, id: &RequestId) -> bool {
        self.shared.cancel_where(|candidate, _| candidate == id) == 1
    }

    pub fn cancel_all_requests(&self) -> usize {
        self.shared.cancel_where(|_, _| true)
    }

    pub fn in_flight_count(&self) -> usize {
        self.shared.lock().in_flight.len()
    }

    pub fn is_in_flight(&self, id: &RequestId) -> bool {
        self.shared.lock().in_flight.contains_key(id)
    }
}

async fn execute(
    transport: &dyn Transport,
    prepared: Result<HttpRequest, NetworkError>,
    fake: Option<FakeResponse>,
) -> Result<HttpResponse, NetworkError> {
    let request = prepared?;
    match fake {
        Some(fake) => fake
            .synthesize()
            .inspect_err(|error| warn!(%error, "fake response could not be resolved")),
        None => Ok(transport.execute(request).await?),
    }
}

/// A dispatched request whose response can be awaited.
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    rx: oneshot::Receiver<Response>,
}

impl PendingRequest {
    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl Future for PendingRequest {
    type Output = Response;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| Response::Failure {
                meta: ResponseMeta::default(),
                error: CancellationError.into(),
            })
        })
    }
}
