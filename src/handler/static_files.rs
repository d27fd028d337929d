//! Static asset serving module
//!
//! The default handler for every path that is neither a preflight nor a
//! forwarded API call. Serves the frontend build from the asset directory.

use hyper::body::Bytes;
use hyper::header::{HeaderMap, IF_NONE_MATCH};
use hyper::{Method, Response, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::AssetsConfig;
use crate::http::{self, cache, mime, response::build_asset_response, ProxyBody};
use crate::logger;

/// Asset directory plus lookup rules
pub struct StaticAssets {
    root: PathBuf,
    index_files: Vec<String>,
    not_found_page: Option<String>,
}

impl StaticAssets {
    pub fn new(config: &AssetsConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            index_files: config.index_files.clone(),
            not_found_page: config.not_found_page.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Answer a request from the asset directory
    pub async fn serve(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Response<ProxyBody> {
        let is_head = *method == Method::HEAD;
        if *method != Method::GET && !is_head {
            return http::build_405_response();
        }

        let Some(file_path) = self.resolve(path).await else {
            return self.not_found(is_head).await;
        };

        let data = match fs::read(&file_path).await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read file '{}': {e}",
                    file_path.display()
                ));
                return http::build_404_response();
            }
        };

        let etag = cache::generate_etag(&data);
        let if_none_match = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());
        if cache::is_not_modified(if_none_match, &etag) {
            return http::build_304_response(&etag);
        }

        build_asset_response(
            StatusCode::OK,
            data,
            mime::content_type_for(&file_path),
            Some(&etag),
            is_head,
        )
    }

    /// Map a request path to a file inside the root, if one exists
    async fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let mut candidate = self.root.join(relative);

        if is_dir(&candidate).await {
            candidate = self.find_index(&candidate).await?;
        }

        let root = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Asset directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return None;
            }
        };

        // Missing files are the common 404 case, not worth a log line
        let canonical = fs::canonicalize(&candidate).await.ok()?;
        if !canonical.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {request_path} -> {}",
                canonical.display()
            ));
            return None;
        }

        is_file(&canonical).await.then_some(canonical)
    }

    async fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        for index in &self.index_files {
            let path = dir.join(index);
            if is_file(&path).await {
                return Some(path);
            }
        }
        None
    }

    async fn not_found(&self, is_head: bool) -> Response<ProxyBody> {
        if let Some(page) = &self.not_found_page {
            let path = self.root.join(page);
            if let Ok(data) = fs::read(&path).await {
                return build_asset_response(
                    StatusCode::NOT_FOUND,
                    Bytes::from(data),
                    mime::content_type_for(&path),
                    None,
                    is_head,
                );
            }
        }
        http::build_404_response()
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
