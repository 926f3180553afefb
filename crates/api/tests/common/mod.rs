#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use posterboard_api::auth::jwt::{generate_access_token, JwtConfig};
use posterboard_api::config::{ServerConfig, StoreBackend};
use posterboard_api::router::build_app_router;
use posterboard_api::state::AppState;
use posterboard_core::artifact::LocalArtifactStore;
use posterboard_core::roles::ROLE_ADMIN;
use posterboard_db::MemoryStore;

pub const TEST_JWT_SECRET: &str = "test-secret-not-for-production";

/// Smallest payloads `image::guess_format` recognises.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
pub const GIF: &[u8] = b"GIF89a\x01\0\x01\0\x80\0\0";

const BOUNDARY: &str = "posterboard-test-boundary";

/// Build a test `ServerConfig` uploading into `upload_dir`.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 1024,
        store: StoreBackend::Memory,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// A router wired to an in-memory store and a temporary upload directory.
///
/// The router is built through [`build_app_router`] so tests exercise the
/// same middleware stack production uses.
pub struct TestApp {
    pub router: Router,
    pub config: ServerConfig,
    _dir: TempDir,
}

pub fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("uploads"));

    let store = Arc::new(MemoryStore::new());
    let artifacts = Arc::new(LocalArtifactStore::new(config.upload_dir.clone()));
    let state = AppState::new(config.clone(), store.clone(), store, artifacts);

    TestApp {
        router: build_app_router(state, &config),
        config,
        _dir: dir,
    }
}

impl TestApp {
    pub fn admin_token(&self) -> String {
        generate_access_token("admin-1", ROLE_ADMIN, &self.config.jwt).unwrap()
    }

    pub fn user_token(&self) -> String {
        generate_access_token("user-1", "user", &self.config.jwt).unwrap()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    /// Files currently in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.upload_dir())
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(request(Method::GET, uri, None).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(json_request(Method::POST, uri, token, body)).await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(json_request(Method::PUT, uri, token, body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        form: MultipartForm,
    ) -> Response<Body> {
        let req = request(method, uri, token)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(req).await
    }

    /// Create a category as admin and return its id.
    pub async fn create_category(&self, name: &str) -> String {
        let token = self.admin_token();
        let response = self
            .post_json(
                "/category/v1/category",
                Some(&token),
                serde_json::json!({ "name": name }),
            )
            .await;
        let json = body_json(response).await;
        json["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a poster with a PNG image as admin and return its `data`.
    pub async fn create_poster(&self, category_id: &str) -> serde_json::Value {
        let token = self.admin_token();
        let form = MultipartForm::new()
            .text("categoryId", category_id)
            .file("image", "poster.png", "image/png", PNG);
        let response = self
            .multipart(Method::POST, "/poster/v1/poster", Some(&token), form)
            .await;
        body_json(response).await["data"].clone()
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    request(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
