use crate::pipeline::PipelineError;
use colored::Colorize;
use knotgen_config::LoadedSettings;
use knotgen_core::{LabelFallback, SecretFallback, TopologyError, ValidationError};

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_settings(loaded: &LoadedSettings) {
    if let Some(path) = &loaded.path {
        println!("📄 設定ファイル: {}", path.display().to_string().cyan());
    }
}

/// 秘密情報のフォールバック警告を表示
pub fn print_secret_fallbacks(fallbacks: &[SecretFallback]) {
    for fallback in fallbacks {
        eprintln!("{} {}", "⚠".yellow(), fallback.to_string().yellow());
    }
}

/// デフォルトラベルへのフォールバックを表示
pub fn print_label_fallback(fallback: &LabelFallback) {
    eprintln!("{} {}", "⚠".yellow(), fallback.to_string().yellow());
}

/// パイプラインのエラーを表示して終了
///
/// 重複エラーは検出した全件を列挙する。
pub fn exit_with_pipeline_error(err: &PipelineError) -> ! {
    eprintln!();
    match err {
        PipelineError::Topology(TopologyError::Config(e)) => {
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
        }
        PipelineError::Topology(TopologyError::Validation(ValidationError::DuplicateResource {
            conflicts,
        })) => {
            eprintln!(
                "{}",
                format!("✗ トポロジー検証に失敗しました ({}件の重複)", conflicts.len())
                    .red()
                    .bold()
            );
            for conflict in conflicts {
                eprintln!("  - {}", conflict);
            }
            eprintln!();
            eprintln!("ファイルは書き込まれていません");
        }
        PipelineError::Topology(TopologyError::Graph(e)) => {
            eprintln!("{}", "✗ 依存グラフエラー".red().bold());
            eprintln!("  {}", e);
        }
        PipelineError::Render(e) => {
            eprintln!("{}", "✗ レンダリングエラー".red().bold());
            eprintln!("  {}", e);
        }
        PipelineError::Join(e) => {
            eprintln!("{}", "✗ 内部エラー".red().bold());
            eprintln!("  {}", e);
        }
    }
    std::process::exit(1);
}
