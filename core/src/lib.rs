//! HTTP client core with typed responses and request faking.
//!
//! # Overview
//! `Networking` turns a verb, a path, parameters and the payload kind the
//! caller expects into either a live request over a `Transport` or a
//! registered fake, and hands exactly one classified `Response` to the
//! caller's completion. Requests are tracked by identifier while in flight so
//! they can be cancelled.
//!
//! # Design
//! - `json` is a pure codec between bytes and the tagged `JsonValue`.
//! - `classifier` maps a raw outcome onto the closed `Response` variant set.
//! - `fake` holds canned responses; file-backed fakes are read lazily.
//! - `client` owns the fake registry and in-flight table behind one lock and
//!   drives each request as a tokio task.
//! - `verbs` adds per-method conveniences on top of `Networking::request`.
//!
//! ```no_run
//! use networking_core::Networking;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let networking = Networking::new("https://api.example.com")?;
//! networking.fake_get("/users", json!({"id": 1}), 200);
//! networking.get("/users", None, |response| {
//!     assert_eq!(response.mapping()["id"], 1);
//! });
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fake;
pub mod http;
pub mod json;
pub mod response;
pub mod transport;
mod verbs;

pub use classifier::classify;
pub use client::{Networking, NetworkingBuilder, PendingRequest, RequestId};
pub use config::NetworkingConfig;
pub use error::{BuildError, CancellationError, FakeError, NetworkError, ParsingError, TransportError};
pub use fake::{Bundle, DirectoryBundle, FakeBody, FakeRegistry, FakeResponse, MemoryBundle};
pub use http::{
    FormDataPart, HttpMethod, HttpRequest, HttpResponse, ParameterType, Request, RequestBody,
    ResponseKind, TaskCategory,
};
pub use json::{JsonValue, Mapping};
pub use response::{Image, Response, ResponseMeta};
pub use transport::{ReqwestTransport, Transport};
