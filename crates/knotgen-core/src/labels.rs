//! ラベルレジストリ
//!
//! インスタンスにタグ付けするラベル一覧を読み込み、検証します。
//! ファイル形式は1行1ラベル。空行と `#` で始まる行は無視されます。

use crate::error::ConfigError;
use crate::model::{Label, LabelPolicy, LabelSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// デフォルトラベルを使った理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFallback {
    /// ラベルファイルが存在しない
    SourceMissing { path: PathBuf, label: Label },
    /// ファイルはあるが有効なラベルが1件も無い
    NoLabels { path: PathBuf, label: Label },
}

impl fmt::Display for LabelFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceMissing { path, label } => write!(
                f,
                "{} が見つかりません。ラベル '{}' を使用します",
                path.display(),
                label
            ),
            Self::NoLabels { path, label } => write!(
                f,
                "{} に有効なラベルがありません。ラベル '{}' を使用します",
                path.display(),
                label
            ),
        }
    }
}

/// 読み込み結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLabels {
    pub labels: LabelSet,
    pub fallback: Option<LabelFallback>,
}

/// ラベルファイルの内容をパース
pub fn parse_labels(content: &str) -> Vec<Label> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(Label::new)
        .collect()
}

/// ラベルを読み込む
///
/// - ファイルが無い（またはラベルが1件も無い）場合、`policy.default_label`
///   があればそれを使い `fallback` に理由を残す。無ければ `LabelsMissing`
/// - `policy.strict` のとき、ラベル数が `instance_count` 未満なら `InsufficientLabels`
/// - それ以外はラベルを循環して再利用する
#[tracing::instrument(skip(path, policy), fields(path = %path.display()))]
pub fn load_labels(
    path: &Path,
    policy: &LabelPolicy,
    instance_count: u32,
) -> Result<LoadedLabels, ConfigError> {
    let source_exists = path.exists();
    let labels = if source_exists {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse_labels(&content)
    } else {
        debug!("Label source does not exist");
        Vec::new()
    };

    let (labels, fallback) = match LabelSet::new(labels) {
        Some(set) => (set, None),
        None => {
            let fallback = policy
                .default_label
                .as_deref()
                .and_then(Label::new)
                .ok_or_else(|| ConfigError::LabelsMissing {
                    path: path.to_path_buf(),
                })?;
            warn!(default_label = %fallback, "No labels found, using default label");
            let set = LabelSet::new(vec![fallback.clone()]).ok_or_else(|| {
                ConfigError::LabelsMissing {
                    path: path.to_path_buf(),
                }
            })?;
            let path = path.to_path_buf();
            let reason = if source_exists {
                LabelFallback::NoLabels {
                    path,
                    label: fallback,
                }
            } else {
                LabelFallback::SourceMissing {
                    path,
                    label: fallback,
                }
            };
            (set, Some(reason))
        }
    };

    if policy.strict && labels.len() < instance_count as usize {
        return Err(ConfigError::InsufficientLabels {
            path: path.to_path_buf(),
            required: instance_count,
            found: labels.len(),
        });
    }

    if labels.len() < instance_count as usize {
        info!(
            labels = labels.len(),
            instances = instance_count,
            "Fewer labels than instances, labels will be reused cyclically"
        );
    }

    Ok(LoadedLabels { labels, fallback })
}
