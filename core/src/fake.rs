//! Fake registry: canned responses substituted for live requests.
//!
//! # Design
//! Fakes are keyed by verb and normalized path; a later registration for the
//! same key replaces the earlier one. File-backed fakes store the bundle and
//! the file name, not the file contents, and read the file only when a
//! matching request is dispatched. A missing file therefore surfaces as a
//! failure response of that request, never at registration time.
//!
//! The registry itself holds no lock; the client keeps it behind the same
//! mutex as its in-flight table.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::encoding::normalize_path;
use crate::error::{FakeError, NetworkError};
use crate::http::{HttpMethod, HttpResponse};

/// Source of files for file-backed fakes.
pub trait Bundle: Send + Sync + fmt::Debug {
    /// Contents of `file_name`, or `FakeError::FileNotFound`.
    fn resolve(&self, file_name: &str) -> Result<Vec<u8>, FakeError>;
}

/// Bundle backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Bundle for DirectoryBundle {
    fn resolve(&self, file_name: &str) -> Result<Vec<u8>, FakeError> {
        std::fs::read(self.root.join(file_name)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FakeError::FileNotFound {
                name: file_name.to_string(),
            },
            _ => FakeError::Unreadable {
                name: file_name.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// Bundle backed by an in-memory map that can change after fakes are
/// registered.
#[derive(Debug, Default)]
pub struct MemoryBundle {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.into(), contents.into());
    }

    pub fn remove(&self, file_name: &str) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(file_name);
    }
}

impl Bundle for MemoryBundle {
    fn resolve(&self, file_name: &str) -> Result<Vec<u8>, FakeError> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_name)
            .cloned()
            .ok_or_else(|| FakeError::FileNotFound {
                name: file_name.to_string(),
            })
    }
}

/// Payload of a registered fake.
#[derive(Debug, Clone)]
pub enum FakeBody {
    Empty,
    Json(Value),
    Data(Vec<u8>),
    File {
        file_name: String,
        bundle: Arc<dyn Bundle>,
    },
}

impl FakeBody {
    /// JSON payload; `null` means no body.
    pub fn json(value: Value) -> Self {
        if value.is_null() {
            FakeBody::Empty
        } else {
            FakeBody::Json(value)
        }
    }

    pub fn file(file_name: impl Into<String>, bundle: Arc<dyn Bundle>) -> Self {
        FakeBody::File {
            file_name: file_name.into(),
            bundle,
        }
    }

    fn bytes(&self) -> Result<Vec<u8>, NetworkError> {
        match self {
            FakeBody::Empty => Ok(Vec::new()),
            FakeBody::Json(value) => serde_json::to_vec(value)
                .map_err(|e| NetworkError::InvalidParameters(e.to_string())),
            FakeBody::Data(data) => Ok(data.clone()),
            FakeBody::File { file_name, bundle } => Ok(bundle.resolve(file_name)?),
        }
    }
}

/// A canned response: payload, status code and headers.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub body: FakeBody,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl FakeResponse {
    pub fn new(body: FakeBody, status: u16) -> Self {
        Self {
            body,
            status,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Produce the response a transport would have returned. File-backed
    /// bodies are read here.
    pub fn synthesize(&self) -> Result<HttpResponse, NetworkError> {
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.bytes()?,
        })
    }
}

/// Registered fakes keyed by verb and normalized path.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    fakes: HashMap<(HttpMethod, String), FakeResponse>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `response` for `(method, path)`, replacing any earlier fake.
    pub fn register(&mut self, method: HttpMethod, path: &str, response: FakeResponse) {
        self.fakes.insert((method, normalize_path(path)), response);
    }

    pub fn lookup(&self, method: HttpMethod, path: &str) -> Option<FakeResponse> {
        self.fakes.get(&(method, normalize_path(path))).cloned()
    }

    /// Remove the fake for `(method, path)`; returns whether one existed.
    pub fn clear(&mut self, method: HttpMethod, path: &str) -> bool {
        self.fakes.remove(&(method, normalize_path(path))).is_some()
    }

    pub fn clear_all(&mut self) {
        self.fakes.clear();
    }

    pub fn len(&self) -> usize {
        self.fakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fakes.is_empty()
    }
}
