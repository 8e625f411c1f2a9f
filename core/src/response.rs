//! Typed responses handed to request completions.
//!
//! # Design
//! The variant set is closed: success or failure, crossed with the payload the
//! caller asked for. Only the classifier builds these values, so a failure can
//! never carry image data and a data response can never carry parsed JSON.

use crate::error::NetworkError;
use crate::json::{JsonValue, Mapping};

/// Metadata of the response a variant was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub url: String,
    /// `None` when no HTTP response was received (transport failure,
    /// cancellation, invalid request).
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// Decoded pixel rows, in the color type of the source image.
    pub pixels: Vec<u8>,
    /// The bytes the image was decoded from.
    pub encoded: Vec<u8>,
}

impl Image {
    /// Decode a PNG image.
    pub fn decode(bytes: &[u8]) -> Result<Self, NetworkError> {
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let mut reader = decoder
            .read_info()
            .map_err(|e| NetworkError::ImageDecoding(e.to_string()))?;
        let mut pixels = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut pixels)
            .map_err(|e| NetworkError::ImageDecoding(e.to_string()))?;
        pixels.truncate(info.buffer_size());

        Ok(Self {
            width: info.width,
            height: info.height,
            pixels,
            encoded: bytes.to_vec(),
        })
    }
}

/// Outcome of a completed request.
#[derive(Debug, Clone)]
pub enum Response {
    SuccessJson {
        meta: ResponseMeta,
        json: JsonValue,
    },
    FailureJson {
        meta: ResponseMeta,
        json: JsonValue,
        error: NetworkError,
    },
    SuccessData {
        meta: ResponseMeta,
        data: Vec<u8>,
    },
    SuccessImage {
        meta: ResponseMeta,
        image: Image,
    },
    Failure {
        meta: ResponseMeta,
        error: NetworkError,
    },
}

impl Response {
    pub fn meta(&self) -> &ResponseMeta {
        match self {
            Response::SuccessJson { meta, .. }
            | Response::FailureJson { meta, .. }
            | Response::SuccessData { meta, .. }
            | Response::SuccessImage { meta, .. }
            | Response::Failure { meta, .. } => meta,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.meta().status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.meta().headers
    }

    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }

    pub fn error(&self) -> Option<&NetworkError> {
        match self {
            Response::FailureJson { error, .. } | Response::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&JsonValue> {
        match self {
            Response::SuccessJson { json, .. } | Response::FailureJson { json, .. } => Some(json),
            _ => None,
        }
    }

    /// The JSON mapping, empty if the response has none.
    pub fn mapping(&self) -> Mapping {
        self.json().map(JsonValue::mapping).unwrap_or_default()
    }

    /// The JSON sequence, empty if the response has none.
    pub fn sequence(&self) -> Vec<Mapping> {
        self.json().map(JsonValue::sequence).unwrap_or_default()
    }

    /// Raw payload bytes: the JSON bytes, the data, or the encoded image.
    pub fn data(&self) -> &[u8] {
        match self {
            Response::SuccessJson { json, .. } | Response::FailureJson { json, .. } => json.bytes(),
            Response::SuccessData { data, .. } => data,
            Response::SuccessImage { image, .. } => &image.encoded,
            Response::Failure { .. } => &[],
        }
    }

    pub fn image(&self) -> Option<&Image> {
        match self {
            Response::SuccessImage { image, .. } => Some(image),
            _ => None,
        }
    }
}
