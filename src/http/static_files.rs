//! Static asset fallback for unmatched paths.
//!
//! Serves the built frontend from disk, or answers 404 when no directory is
//! configured.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::config::StaticFilesConfig;

/// Responder for requests no route claims.
#[derive(Debug, Clone)]
pub enum StaticFallback {
    NotFound,
    Directory(ServeDir),
}

impl StaticFallback {
    pub fn from_config(config: &StaticFilesConfig) -> Self {
        match &config.root {
            Some(root) => {
                tracing::info!(root = %root.display(), "Serving static files for unmatched paths");
                Self::Directory(ServeDir::new(root))
            }
            None => Self::NotFound,
        }
    }

    pub async fn serve(&self, request: Request<Body>) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            Self::Directory(dir) => match dir.clone().oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn not_found_without_root() {
        let fallback = StaticFallback::from_config(&StaticFilesConfig::default());
        let request = Request::get("/index.html").body(Body::empty()).unwrap();
        assert_eq!(fallback.serve(request).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_files_from_root() {
        let root = std::env::temp_dir().join(format!("dev-proxy-static-{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("app.js"), "console.log('hi');").unwrap();

        let fallback = StaticFallback::from_config(&StaticFilesConfig {
            root: Some(root.clone()),
        });

        let response = fallback
            .serve(Request::get("/app.js").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"console.log('hi');");

        let missing = fallback
            .serve(Request::get("/missing.js").body(Body::empty()).unwrap())
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        fs::remove_dir_all(&root).unwrap();
    }
}
