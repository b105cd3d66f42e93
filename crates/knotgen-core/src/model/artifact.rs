//! 生成物定義

use serde::Serialize;
use std::path::PathBuf;

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const PROXY_FILE: &str = "nginx.conf";
pub const ENV_DIR: &str = "envs";
pub const POSTGRES_DIR: &str = "postgres";

/// 生成物の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    EnvFile,
    ComposeManifest,
    ProxyConfig,
    PostgresConfig,
}

/// レンダリング済みの生成物
///
/// `path` は出力ディレクトリからの相対パス。書き込み後は破棄される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: String,
}

impl RenderedArtifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            content: content.into(),
        }
    }
}

/// `envs/instance{id}.env`
pub fn env_file_path(id: u32) -> PathBuf {
    PathBuf::from(ENV_DIR).join(format!("instance{}.env", id))
}

/// `postgres/instance{id}`
pub fn postgres_config_dir(id: u32) -> PathBuf {
    PathBuf::from(POSTGRES_DIR).join(format!("instance{}", id))
}
