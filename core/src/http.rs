//! HTTP request and response types.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe a single round-trip as plain
//! data. The dispatcher builds an `HttpRequest` and hands it either to a
//! registered fake or to the `Transport`; both answer with an `HttpResponse`.
//! `Request` is the caller-facing description of what to send: verb, path,
//! parameters and the payload kind it expects back.
//!
//! All fields use owned types (`String`, `Vec`) so requests can move into
//! spawned tasks without lifetime concerns.

use std::fmt;

use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Methods whose parameters travel in the query string.
    pub fn uses_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How request parameters are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterType {
    #[default]
    None,
    FormUrlEncoded,
    Multipart,
    Json,
}

/// How the caller wants the response bytes interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    #[default]
    Json,
    Data,
    Image,
}

/// Transport category a request is tracked under for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    Data,
    Upload,
    Download,
}

/// A file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDataPart {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FormDataPart {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
    Multipart {
        fields: Vec<(String, String)>,
        parts: Vec<FormDataPart>,
    },
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// An HTTP response described as plain data, as returned by a transport or
/// synthesized from a fake.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a caller asks the dispatcher to send.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    pub path: String,
    pub parameter_type: ParameterType,
    pub parameters: Option<Value>,
    pub parts: Vec<FormDataPart>,
    pub headers: Vec<(String, String)>,
    pub kind: ResponseKind,
}

impl Request {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameter_type: ParameterType::None,
            parameters: None,
            parts: Vec::new(),
            headers: Vec::new(),
            kind: ResponseKind::Json,
        }
    }

    pub fn parameters(mut self, parameter_type: ParameterType, parameters: Value) -> Self {
        self.parameter_type = parameter_type;
        self.parameters = Some(parameters);
        self
    }

    /// Attach multipart file parts; switches the parameter type to multipart.
    pub fn parts(mut self, parts: Vec<FormDataPart>) -> Self {
        self.parameter_type = ParameterType::Multipart;
        self.parts = parts;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Category the request is tracked under in the in-flight table.
    pub fn category(&self) -> TaskCategory {
        if self.parameter_type == ParameterType::Multipart {
            TaskCategory::Upload
        } else if self.kind == ResponseKind::Image {
            TaskCategory::Download
        } else {
            TaskCategory::Data
        }
    }
}
