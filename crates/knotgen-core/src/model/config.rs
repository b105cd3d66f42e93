//! 生成設定

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_INSTANCE_COUNT: u32 = 8;
pub const DEFAULT_HTTP_BASE: u16 = 8080;
pub const DEFAULT_UPSTREAM_DB_PORT_BASE: u16 = 7000;
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_DOMAIN: &str = "example.com";
pub const DEFAULT_LABEL: &str = "default";
pub const DEFAULT_UPSTREAM_PASSWORD: &str = "augur";
pub const DEFAULT_CREDENTIAL_SEED: &str = "pass";

/// ポート割り当てのベース値
///
/// インスタンス `i` の HTTP ポートは `http_base + i`、
/// 上流DBポートは `upstream_db_port_base + i` になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePorts {
    pub http_base: u16,
    pub upstream_db_port_base: u16,
    /// Redis がインスタンスネットワーク内で待ち受けるポート（ホストには公開しない）
    pub redis_port_base: u16,
}

impl Default for BasePorts {
    fn default() -> Self {
        Self {
            http_base: DEFAULT_HTTP_BASE,
            upstream_db_port_base: DEFAULT_UPSTREAM_DB_PORT_BASE,
            redis_port_base: DEFAULT_REDIS_PORT,
        }
    }
}

/// 既存ファイルの上書きポリシー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// 既存ファイルはそのまま残す（デフォルト）
    #[default]
    Skip,
    /// 常に置き換える
    Force,
}

impl OverwritePolicy {
    /// `--force` フラグから決定
    pub fn from_force_flag(force: bool) -> Self {
        if force { Self::Force } else { Self::Skip }
    }
}

/// アプリケーションが参照する上流データベース
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamDatabase {
    pub host: String,
    pub database: String,
    pub schema: String,
    pub username: String,
    pub login_enabled: bool,
}

impl Default for UpstreamDatabase {
    fn default() -> Self {
        Self {
            host: "host.docker.internal".to_string(),
            database: "augur".to_string(),
            schema: "augur_data".to_string(),
            username: "augur".to_string(),
            login_enabled: false,
        }
    }
}

/// ラベル読み込みポリシー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPolicy {
    /// インスタンス数以上のラベルを必須とする
    pub strict: bool,
    /// ラベルファイルが無い場合に使うラベル（None ならエラー）
    pub default_label: Option<String>,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            strict: false,
            default_label: Some(DEFAULT_LABEL.to_string()),
        }
    }
}

/// 秘密情報ソースから解決した値
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    /// 上流DBのパスワード (AUGUR_PASSWORD)
    pub upstream_password: String,
    /// インスタンス別クレデンシャルの導出元
    pub credential_seed: String,
}

impl Default for Secrets {
    fn default() -> Self {
        Self {
            upstream_password: DEFAULT_UPSTREAM_PASSWORD.to_string(),
            credential_seed: DEFAULT_CREDENTIAL_SEED.to_string(),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("upstream_password", &"***")
            .field("credential_seed", &"***")
            .finish()
    }
}

/// 生成パイプライン全体を駆動する設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub instance_count: u32,
    pub label_source: PathBuf,
    pub base_ports: BasePorts,
    /// compose の build.context に書き出すパス
    pub build_context: PathBuf,
    pub overwrite_policy: OverwritePolicy,
    /// リバースプロキシの server_name に使うドメイン
    pub domain: String,
    pub upstream: UpstreamDatabase,
    pub label_policy: LabelPolicy,
    pub secrets: Secrets,
    /// 並列度の上限
    pub jobs: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            instance_count: DEFAULT_INSTANCE_COUNT,
            label_source: PathBuf::from("labels.txt"),
            base_ports: BasePorts::default(),
            build_context: PathBuf::from("."),
            overwrite_policy: OverwritePolicy::default(),
            domain: DEFAULT_DOMAIN.to_string(),
            upstream: UpstreamDatabase::default(),
            label_policy: LabelPolicy::default(),
            secrets: Secrets::default(),
            jobs: 1,
        }
    }
}

impl GenerationConfig {
    /// 計画開始前の検証
    ///
    /// インスタンス数が1以上であること、全ての割り当てポートが
    /// 65535 以下に収まることを確認する。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_count == 0 {
            return Err(ConfigError::InvalidInstanceCount(self.instance_count));
        }

        let bases = [
            ("http", self.base_ports.http_base),
            ("upstream", self.base_ports.upstream_db_port_base),
        ];
        for (name, base) in bases {
            if u32::from(base) + self.instance_count > u32::from(u16::MAX) {
                return Err(ConfigError::PortOutOfRange {
                    name,
                    base,
                    instance_count: self.instance_count,
                });
            }
        }

        Ok(())
    }
}
