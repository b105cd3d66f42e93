//! knotgen のコア
//!
//! ラベル読み込み → 割り当て計画 → トポロジー検証 → 依存グラフ構築
//! までの純粋な処理を提供します。ファイルへの書き込みは行いません。

pub mod error;
pub mod graph;
pub mod labels;
pub mod model;
pub mod planner;
pub mod secrets;
pub mod validator;

pub use error::*;
pub use graph::{ROOT_ROLE, TopologyNode, build_graph, build_graph_with, canonical_topology};
pub use labels::{LabelFallback, LoadedLabels, load_labels, parse_labels};
pub use model::*;
pub use planner::{plan, plan_all};
pub use secrets::{LoadedSecrets, SecretFallback, load_secrets, parse_secrets};
pub use validator::{find_conflicts, validate};

/// 計画と検証をまとめて実行（逐次版）
///
/// 設定検証 → 全インスタンスの計画 → 一括検証 の順に行い、
/// 検証を通過した計画だけを返す。
pub fn plan_and_validate(config: &GenerationConfig, labels: &LabelSet) -> Result<Vec<InstancePlan>> {
    config.validate()?;
    let plans = plan_all(config, labels);
    validate(&plans)?;
    Ok(plans)
}
