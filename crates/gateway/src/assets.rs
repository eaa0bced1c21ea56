//! Overlay HTML/CSS/JS: per-route overrides from a directory, falling back to
//! the files compiled into the binary.

use std::path::{Path, PathBuf};

use {
    tokio::sync::RwLock,
    tracing::{debug, warn},
};

const INDEX_HTML: &str = include_str!("assets/index.html");
const CHAT_CSS: &str = include_str!("assets/chat.css");
const CHAT_JS: &str = include_str!("assets/chat.js");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub content_type: &'static str,
    pub body: String,
}

fn content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "html" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "js" => Some("application/javascript; charset=utf-8"),
        _ => None,
    }
}

fn builtin(file_name: &str) -> Option<&'static str> {
    match file_name {
        "index.html" => Some(INDEX_HTML),
        "chat.css" => Some(CHAT_CSS),
        "chat.js" => Some(CHAT_JS),
        _ => None,
    }
}

/// Looks up overlay files, preferring `<dir>/<routeKey>.<ext>`, then
/// `<dir>/<fileName>`, then the built-in copy.
#[derive(Debug, Default)]
pub struct StaticResolver {
    override_dir: RwLock<Option<PathBuf>>,
}

impl StaticResolver {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir: RwLock::new(override_dir),
        }
    }

    pub async fn override_dir(&self) -> Option<PathBuf> {
        self.override_dir.read().await.clone()
    }

    pub async fn set_override_dir(&self, dir: Option<PathBuf>) {
        *self.override_dir.write().await = dir;
    }

    pub async fn resolve(&self, route_key: &str, file_name: &str) -> Option<StaticAsset> {
        let builtin_body = builtin(file_name)?;
        let extension = Path::new(file_name).extension()?.to_str()?;
        let content_type = content_type(extension)?;

        if let Some(dir) = self.override_dir().await.filter(|d| d.is_dir()) {
            for candidate in [format!("{route_key}.{extension}"), file_name.to_string()] {
                let path = dir.join(&candidate);
                match tokio::fs::read_to_string(&path).await {
                    Ok(body) => {
                        debug!(route = route_key, path = %path.display(), "serving override file");
                        return Some(StaticAsset { content_type, body });
                    },
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to read override file");
                    },
                }
            }
        }

        Some(StaticAsset {
            content_type,
            body: builtin_body.to_string(),
        })
    }
}
