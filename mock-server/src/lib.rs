//! Fixture HTTP server for exercising the networking client over real
//! sockets.
//!
//! Every route returns a predictable payload: JSON mappings and sequences,
//! raw bytes, a PNG image, a body that is not JSON, an arbitrary status or a
//! delayed answer. Hits are counted per path so tests can prove a request
//! never reached the network.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u32,
    pub name: String,
}

pub type Hits = Arc<RwLock<HashMap<String, usize>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/get", get(query_args))
        .route("/delete", delete(query_args))
        .route("/post", post(echo))
        .route("/put", put(echo))
        .route("/patch", patch(echo))
        .route("/upload", post(upload))
        .route("/users", get(list_users))
        .route("/bytes/{n}", get(bytes))
        .route("/image/png", get(image_png))
        .route("/garbage", get(garbage))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
        .route("/hits", get(list_hits))
        .layer(middleware::from_fn_with_state(hits.clone(), count_hits))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The users served by `GET /users`.
pub fn users() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "Elvis".to_string(),
        },
        User {
            id: 2,
            name: "Priscilla".to_string(),
        },
    ]
}

/// A 2x2 RGBA image, encoded as PNG.
pub fn sample_png() -> Result<Vec<u8>, png::EncodingError> {
    let mut encoded = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut encoded, 2, 2);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&[
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ])?;
        writer.finish()?;
    }
    Ok(encoded)
}

async fn count_hits(State(hits): State<Hits>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if path != "/hits" {
        *hits.write().await.entry(path).or_insert(0) += 1;
    }
    next.run(request).await
}

async fn query_args(Query(args): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "args": args }))
}

async fn echo(headers: HeaderMap, body: Bytes) -> Result<Json<Value>, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
        Ok(Json(json!({ "json": value })))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: HashMap<String, String> =
            serde_urlencoded::from_bytes(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
        Ok(Json(json!({ "form": form })))
    } else {
        Ok(Json(json!({ "length": body.len() })))
    }
}

async fn upload(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                files.push(json!({
                    "name": name,
                    "file_name": file_name,
                    "content_type": content_type,
                    "size": data.len(),
                }));
            }
            None => {
                let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                fields.insert(name, text);
            }
        }
    }

    Ok(Json(json!({ "fields": fields, "files": files })))
}

async fn list_users() -> Json<Vec<User>> {
    Json(users())
}

async fn bytes(Path(n): Path<usize>) -> ([(header::HeaderName, &'static str); 1], Vec<u8>) {
    let body = (0..n).map(|i| (i % 256) as u8).collect();
    ([(header::CONTENT_TYPE, "application/octet-stream")], body)
}

async fn image_png() -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), StatusCode> {
    let encoded = sample_png().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], encoded))
}

async fn garbage() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/json")], "this is not json")
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({ "status": code }))))
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "delayed": ms }))
}

async fn list_hits(State(hits): State<Hits>) -> Json<HashMap<String, usize>> {
    Json(hits.read().await.clone())
}
