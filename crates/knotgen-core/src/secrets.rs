//! 秘密情報ソース
//!
//! `.secrets.env` 形式 (`KEY=VALUE`) のファイルから上流DBのパスワードと
//! クレデンシャル導出用のシードを読み込みます。
//!
//! ファイルやキーが無い場合はデフォルト値にフォールバックし、警告を出します。
//! ローカル開発で止まらないことを優先し、エラーにはしません。
//!
//! ## 対応キー
//!
//! - `AUGUR_PASSWORD`: 上流DBのパスワード（デフォルト: `augur`）
//! - `CREDENTIAL_SEED`: インスタンス別パスワードのシード（デフォルト: `pass`）

use crate::model::{DEFAULT_CREDENTIAL_SEED, DEFAULT_UPSTREAM_PASSWORD, Secrets};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const UPSTREAM_PASSWORD_KEY: &str = "AUGUR_PASSWORD";
pub const CREDENTIAL_SEED_KEY: &str = "CREDENTIAL_SEED";

/// デフォルト値へのフォールバック理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretFallback {
    /// ファイルが存在しない、または読めない
    SourceUnavailable { path: PathBuf, reason: String },
    /// キーが定義されていない
    KeyMissing { key: &'static str, default: &'static str },
}

impl fmt::Display for SecretFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { path, reason } => write!(
                f,
                "{} を読み込めません ({})。デフォルト値を使用します",
                path.display(),
                reason
            ),
            Self::KeyMissing { key, default } => {
                write!(f, "{} が未定義です。デフォルト値 '{}' を使用します", key, default)
            }
        }
    }
}

/// 読み込み結果
#[derive(Debug, Clone)]
pub struct LoadedSecrets {
    pub secrets: Secrets,
    pub fallbacks: Vec<SecretFallback>,
}

/// 秘密情報ファイルを読み込む（失敗しない）
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_secrets(path: &Path) -> LoadedSecrets {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("Loaded secrets source");
            parse_secrets(&content)
        }
        Err(e) => {
            warn!(error = %e, "Secrets source unavailable, falling back to defaults");
            LoadedSecrets {
                secrets: Secrets::default(),
                fallbacks: vec![SecretFallback::SourceUnavailable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }],
            }
        }
    }
}

/// `KEY=VALUE` 形式の内容をパース
pub fn parse_secrets(content: &str) -> LoadedSecrets {
    let mut upstream_password = None;
    let mut credential_seed = None;

    for line in content.lines() {
        let line = line.trim();

        // 空行とコメント行をスキップ
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = strip_quotes(value.trim());
        if value.is_empty() {
            continue;
        }

        match key.trim() {
            UPSTREAM_PASSWORD_KEY => upstream_password = Some(value.to_string()),
            CREDENTIAL_SEED_KEY => credential_seed = Some(value.to_string()),
            _ => {}
        }
    }

    let mut fallbacks = Vec::new();
    let upstream_password = upstream_password.unwrap_or_else(|| {
        warn!(key = UPSTREAM_PASSWORD_KEY, "Secret key missing, using default");
        fallbacks.push(SecretFallback::KeyMissing {
            key: UPSTREAM_PASSWORD_KEY,
            default: DEFAULT_UPSTREAM_PASSWORD,
        });
        DEFAULT_UPSTREAM_PASSWORD.to_string()
    });
    let credential_seed = credential_seed.unwrap_or_else(|| {
        warn!(key = CREDENTIAL_SEED_KEY, "Secret key missing, using default");
        fallbacks.push(SecretFallback::KeyMissing {
            key: CREDENTIAL_SEED_KEY,
            default: DEFAULT_CREDENTIAL_SEED,
        });
        DEFAULT_CREDENTIAL_SEED.to_string()
    });

    LoadedSecrets {
        secrets: Secrets {
            upstream_password,
            credential_seed,
        },
        fallbacks,
    }
}

/// クォートを除去（"value" や 'value' の場合）
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
