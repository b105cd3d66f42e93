use crate::model::Conflict;
use std::path::PathBuf;
use thiserror::Error;

/// 生成パイプライン全体のエラー
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// 設定エラー（計画開始前に検出され、ファイルには一切触れない）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "ラベルファイルが見つかりません: {}\nヒント: 1行に1ラベルのファイルを用意するか、デフォルトラベルを設定してください",
        path.display()
    )]
    LabelsMissing { path: PathBuf },

    #[error(
        "ラベルが不足しています: {required}個のインスタンスに対して{found}個しかありません ({})",
        path.display()
    )]
    InsufficientLabels {
        path: PathBuf,
        required: u32,
        found: usize,
    },

    #[error("インスタンス数は1以上を指定してください: {0}")]
    InvalidInstanceCount(u32),

    #[error("ポート範囲外: {name} のベースポート {base} + {instance_count} が 65535 を超えます")]
    PortOutOfRange {
        name: &'static str,
        base: u16,
        instance_count: u32,
    },

    #[error("IO エラー: {path}\n理由: {message}")]
    Io { path: PathBuf, message: String },
}

/// トポロジー検証エラー
///
/// 最初の1件ではなく、検出した全ての重複を保持する。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("リソースの重複が{}件検出されました:\n{}", conflicts.len(), format_conflicts(conflicts))]
    DuplicateResource { conflicts: Vec<Conflict> },
}

impl ValidationError {
    /// 検出された全ての重複
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::DuplicateResource { conflicts } => conflicts,
        }
    }
}

fn format_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("  - {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 依存グラフ構築エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("循環依存が検出されました (instance {instance}): {}", cycle.join(" -> "))]
    CycleDetected { instance: u32, cycle: Vec<String> },

    #[error("未定義のサービスへの依存です (instance {instance}): {from} -> {to}")]
    UnknownService {
        instance: u32,
        from: String,
        to: String,
    },

    #[error(
        "ルート '{root}' から到達できないサービスがあります (instance {instance}): {}",
        services.join(", ")
    )]
    Unreachable {
        instance: u32,
        root: String,
        services: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
