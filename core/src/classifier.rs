//! Response classification.
//!
//! Maps the raw outcome of a round-trip (a transport response or the error
//! that prevented one) onto exactly one `Response` variant.

use crate::error::{NetworkError, ParsingError};
use crate::http::{HttpResponse, ResponseKind};
use crate::json::JsonValue;
use crate::response::{Image, Response, ResponseMeta};

/// Classify `outcome` for a request to `url` expecting `kind`.
///
/// A non-2xx status is a failure carrying the status. For JSON requests the
/// body of a failure is parsed best-effort; a successful JSON response whose
/// body does not parse is a failure, never a success with an absent body.
pub fn classify(
    url: &str,
    outcome: Result<HttpResponse, NetworkError>,
    kind: ResponseKind,
) -> Response {
    let response = match outcome {
        Ok(response) => response,
        Err(error) => {
            let meta = ResponseMeta {
                url: url.to_string(),
                status: None,
                headers: Vec::new(),
            };
            return failure(meta, Vec::new(), error, kind);
        }
    };

    let success = response.is_success();
    let meta = ResponseMeta {
        url: url.to_string(),
        status: Some(response.status),
        headers: response.headers,
    };
    let body = response.body;

    if !success {
        let error = NetworkError::Status {
            status: response.status,
        };
        return failure(meta, body, error, kind);
    }

    match kind {
        ResponseKind::Json => match parse_body(&body) {
            Ok(json) => Response::SuccessJson { meta, json },
            Err(error) => Response::FailureJson {
                meta,
                json: JsonValue::None(body),
                error: error.into(),
            },
        },
        ResponseKind::Data => Response::SuccessData { meta, data: body },
        ResponseKind::Image => match Image::decode(&body) {
            Ok(image) => Response::SuccessImage { meta, image },
            Err(error) => Response::Failure { meta, error },
        },
    }
}

// An empty body is "no JSON returned", not a parse failure.
fn parse_body(body: &[u8]) -> Result<JsonValue, ParsingError> {
    if body.is_empty() {
        Ok(JsonValue::none())
    } else {
        JsonValue::parse(body)
    }
}

// Only JSON requests look at the body of a failure, best-effort.
fn failure(meta: ResponseMeta, body: Vec<u8>, error: NetworkError, kind: ResponseKind) -> Response {
    match kind {
        ResponseKind::Json => {
            let json = JsonValue::parse(&body).unwrap_or_else(|_| JsonValue::None(body));
            Response::FailureJson { meta, json, error }
        }
        ResponseKind::Data | ResponseKind::Image => Response::Failure { meta, error },
    }
}
