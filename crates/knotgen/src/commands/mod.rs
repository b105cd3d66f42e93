pub mod generate;
pub mod plan;

use crate::pipeline::PipelineError;
use crate::utils;
use knotgen_core::{GenerationConfig, LabelSet, TopologyError, load_labels, load_secrets};
use std::path::Path;

/// 秘密情報とラベルを読み込み、設定を完成させる
///
/// ラベルの設定エラーは表示して終了する。
fn load_inputs(mut config: GenerationConfig, secrets_path: &Path) -> (GenerationConfig, LabelSet) {
    let loaded = load_secrets(secrets_path);
    utils::print_secret_fallbacks(&loaded.fallbacks);
    config.secrets = loaded.secrets;

    match load_labels(
        &config.label_source,
        &config.label_policy,
        config.instance_count,
    ) {
        Ok(loaded) => {
            if let Some(fallback) = &loaded.fallback {
                utils::print_label_fallback(fallback);
            }
            (config, loaded.labels)
        }
        Err(e) => utils::exit_with_pipeline_error(&PipelineError::Topology(TopologyError::from(e))),
    }
}
