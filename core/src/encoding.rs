//! URL composition and parameter encoding.
//!
//! Turns a caller `Request` into the `HttpRequest` that goes to a fake or the
//! transport: joins base URL and path, validates the parameter type against
//! the verb and encodes the parameters.

use serde_json::Value;

use crate::error::NetworkError;
use crate::http::{HttpRequest, ParameterType, Request, RequestBody, ResponseKind};

pub(crate) const CONTENT_TYPE: &str = "content-type";
pub(crate) const ACCEPT: &str = "accept";
pub(crate) const JSON_MIME: &str = "application/json";
pub(crate) const FORM_MIME: &str = "application/x-www-form-urlencoded";

/// Join `base_url` and `path` into an absolute URL.
pub fn url_for(base_url: &str, path: &str) -> Result<url::Url, NetworkError> {
    let separator = if path.is_empty() || path.starts_with('/') { "" } else { "/" };
    let joined = format!("{base_url}{separator}{path}");
    url::Url::parse(&joined).map_err(|e| NetworkError::InvalidUrl {
        url: joined,
        message: e.to_string(),
    })
}

/// Normalized form of a path used to key fakes: leading slash, no query
/// string, no trailing slash (except for the root).
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Encode a mapping of parameters as `application/x-www-form-urlencoded`.
///
/// String values are used as-is, every other value by its JSON text.
pub fn form_url_encode(parameters: &Value) -> Result<String, NetworkError> {
    let pairs = form_pairs(parameters)?;
    serde_urlencoded::to_string(&pairs).map_err(|e| NetworkError::InvalidParameters(e.to_string()))
}

fn form_pairs(parameters: &Value) -> Result<Vec<(String, String)>, NetworkError> {
    let Value::Object(mapping) = parameters else {
        return Err(NetworkError::InvalidParameters(
            "form parameters must be a mapping".to_string(),
        ));
    };

    Ok(mapping
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect())
}

/// Build the outbound request for `request` against `base_url`.
pub(crate) fn build_http_request(
    base_url: &str,
    default_headers: &[(String, String)],
    request: &Request,
) -> Result<HttpRequest, NetworkError> {
    let mut url = url_for(base_url, &request.path)?;
    let mut headers: Vec<(String, String)> = default_headers.to_vec();
    if request.kind == ResponseKind::Json {
        headers.push((ACCEPT.to_string(), JSON_MIME.to_string()));
    }

    if request.method.uses_query()
        && !matches!(
            request.parameter_type,
            ParameterType::None | ParameterType::FormUrlEncoded
        )
    {
        return Err(NetworkError::InvalidParameters(format!(
            "{} requests only accept query parameters",
            request.method
        )));
    }

    let body = match (request.parameter_type, &request.parameters) {
        (ParameterType::None, _) | (ParameterType::FormUrlEncoded, None) | (ParameterType::Json, None) => {
            RequestBody::Empty
        }
        (ParameterType::FormUrlEncoded, Some(parameters)) => {
            let encoded = form_url_encode(parameters)?;
            if request.method.uses_query() {
                if !encoded.is_empty() {
                    let query = match url.query() {
                        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                        _ => encoded,
                    };
                    url.set_query(Some(&query));
                }
                RequestBody::Empty
            } else {
                RequestBody::Bytes {
                    content_type: FORM_MIME.to_string(),
                    data: encoded.into_bytes(),
                }
            }
        }
        (ParameterType::Json, Some(parameters)) => RequestBody::Bytes {
            content_type: JSON_MIME.to_string(),
            data: serde_json::to_vec(parameters)
                .map_err(|e| NetworkError::InvalidParameters(e.to_string()))?,
        },
        (ParameterType::Multipart, parameters) => RequestBody::Multipart {
            fields: match parameters {
                Some(parameters) => form_pairs(parameters)?,
                None => Vec::new(),
            },
            parts: request.parts.clone(),
        },
    };

    if let RequestBody::Bytes { content_type, .. } = &body {
        headers.push((CONTENT_TYPE.to_string(), content_type.clone()));
    }
    headers.extend(request.headers.iter().cloned());

    Ok(HttpRequest {
        method: request.method,
        url: url.to_string(),
        headers,
        body,
    })
}
