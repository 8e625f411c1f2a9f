//! Per-verb conveniences over `Networking::request`, `fake` and
//! `cancel_request`.

use std::sync::Arc;

use serde_json::Value;

use crate::client::{Networking, RequestId};
use crate::fake::{Bundle, FakeBody};
use crate::http::{FormDataPart, HttpMethod, ParameterType, Request, ResponseKind, TaskCategory};
use crate::response::Response;

impl Networking {
    /// GET `path`; parameters are sent form-url-encoded in the query string.
    pub fn get<F>(&self, path: &str, parameters: Option<Value>, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(query_request(HttpMethod::Get, path, parameters), completion)
    }

    /// POST `path` with a JSON body.
    pub fn post<F>(&self, path: &str, parameters: Option<Value>, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(body_request(HttpMethod::Post, path, ParameterType::Json, parameters), completion)
    }

    /// POST `path` with a form-url-encoded body.
    pub fn post_form<F>(&self, path: &str, parameters: Value, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let request = Request::new(HttpMethod::Post, path)
            .parameters(ParameterType::FormUrlEncoded, parameters);
        self.request(request, completion)
    }

    /// POST `path` as multipart form data; `parameters` become text fields.
    pub fn post_multipart<F>(
        &self,
        path: &str,
        parameters: Option<Value>,
        parts: Vec<FormDataPart>,
        completion: F,
    ) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let mut request = Request::new(HttpMethod::Post, path).parts(parts);
        request.parameters = parameters;
        self.request(request, completion)
    }

    /// PUT `path` with a JSON body.
    pub fn put<F>(&self, path: &str, parameters: Option<Value>, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(body_request(HttpMethod::Put, path, ParameterType::Json, parameters), completion)
    }

    /// PATCH `path` with a JSON body.
    pub fn patch<F>(&self, path: &str, parameters: Option<Value>, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(body_request(HttpMethod::Patch, path, ParameterType::Json, parameters), completion)
    }

    /// DELETE `path`; parameters are sent in the query string.
    pub fn delete<F>(&self, path: &str, parameters: Option<Value>, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(query_request(HttpMethod::Delete, path, parameters), completion)
    }

    /// GET `path` and decode the body as an image.
    pub fn download_image<F>(&self, path: &str, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(
            Request::new(HttpMethod::Get, path).kind(ResponseKind::Image),
            completion,
        )
    }

    /// GET `path` and hand back the raw body.
    pub fn download_data<F>(&self, path: &str, completion: F) -> RequestId
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.request(
            Request::new(HttpMethod::Get, path).kind(ResponseKind::Data),
            completion,
        )
    }

    pub fn fake_get(&self, path: &str, response: Value, status: u16) {
        self.fake(HttpMethod::Get, path, FakeBody::json(response), status);
    }

    pub fn fake_get_file(&self, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake_file(HttpMethod::Get, path, file_name, bundle);
    }

    pub fn fake_post(&self, path: &str, response: Value, status: u16) {
        self.fake(HttpMethod::Post, path, FakeBody::json(response), status);
    }

    pub fn fake_post_file(&self, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake_file(HttpMethod::Post, path, file_name, bundle);
    }

    pub fn fake_put(&self, path: &str, response: Value, status: u16) {
        self.fake(HttpMethod::Put, path, FakeBody::json(response), status);
    }

    pub fn fake_put_file(&self, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake_file(HttpMethod::Put, path, file_name, bundle);
    }

    pub fn fake_patch(&self, path: &str, response: Value, status: u16) {
        self.fake(HttpMethod::Patch, path, FakeBody::json(response), status);
    }

    pub fn fake_patch_file(&self, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake_file(HttpMethod::Patch, path, file_name, bundle);
    }

    pub fn fake_delete(&self, path: &str, response: Value, status: u16) {
        self.fake(HttpMethod::Delete, path, FakeBody::json(response), status);
    }

    pub fn fake_delete_file(&self, path: &str, file_name: &str, bundle: Arc<dyn Bundle>) {
        self.fake_file(HttpMethod::Delete, path, file_name, bundle);
    }

    /// Fake an image download with encoded image bytes.
    pub fn fake_image_download(&self, path: &str, image: Vec<u8>, status: u16) {
        self.fake(HttpMethod::Get, path, FakeBody::Data(image), status);
    }

    pub fn cancel_get(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Data, HttpMethod::Get, path)
    }

    pub fn cancel_post(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Data, HttpMethod::Post, path)
    }

    pub fn cancel_put(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Data, HttpMethod::Put, path)
    }

    pub fn cancel_patch(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Data, HttpMethod::Patch, path)
    }

    pub fn cancel_delete(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Data, HttpMethod::Delete, path)
    }

    pub fn cancel_multipart_post(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Upload, HttpMethod::Post, path)
    }

    pub fn cancel_image_download(&self, path: &str) -> usize {
        self.cancel_path(TaskCategory::Download, HttpMethod::Get, path)
    }

    fn cancel_path(&self, category: TaskCategory, method: HttpMethod, path: &str) -> usize {
        match self.url_for(path) {
            Ok(url) => self.cancel_request(category, method, url.as_str()),
            Err(_) => 0,
        }
    }
}

fn query_request(method: HttpMethod, path: &str, parameters: Option<Value>) -> Request {
    match parameters {
        Some(parameters) => Request::new(method, path).parameters(ParameterType::FormUrlEncoded, parameters),
        None => Request::new(method, path),
    }
}

fn body_request(
    method: HttpMethod,
    path: &str,
    parameter_type: ParameterType,
    parameters: Option<Value>,
) -> Request {
    match parameters {
        Some(parameters) => Request::new(method, path).parameters(parameter_type, parameters),
        None => Request::new(method, path),
    }
}
