use crate::options::GenerateArgs;
use crate::pipeline::{self, WriteReport};
use crate::utils;
use crate::writer::WriteOutcome;
use colored::Colorize;
use std::sync::Arc;

pub async fn handle(args: GenerateArgs) -> anyhow::Result<()> {
    let loaded = knotgen_config::load_settings()?;
    utils::print_loaded_settings(&loaded);

    let config = args.to_config(&loaded.settings);
    let output_dir = args.output_dir(&loaded.settings);
    let secrets_path = args.allocation.secrets_path(&loaded.settings);
    let (config, labels) = super::load_inputs(config, &secrets_path);

    println!(
        "{}",
        format!(
            "{}個のインスタンスを生成中... (ラベル {}個)",
            config.instance_count,
            labels.len()
        )
        .blue()
    );

    let config = Arc::new(config);
    let plans = match pipeline::plan_instances(config.clone(), Arc::new(labels)).await {
        Ok(plans) => plans,
        Err(e) => utils::exit_with_pipeline_error(&e),
    };
    println!("{}", "✓ トポロジー検証 OK（重複なし）".green());

    let artifacts = match pipeline::render_artifacts(&plans, config.clone()).await {
        Ok(artifacts) => artifacts,
        Err(e) => utils::exit_with_pipeline_error(&e),
    };

    println!("出力先: {}", output_dir.display().to_string().cyan());
    let reports = pipeline::write_artifacts(
        artifacts,
        output_dir.clone(),
        config.overwrite_policy,
        config.jobs,
    )
    .await;

    print_reports(&reports, &output_dir);

    let failed: Vec<_> = reports.iter().filter(|r| r.result.is_err()).collect();
    if !failed.is_empty() {
        eprintln!();
        eprintln!(
            "{}",
            format!("✗ {}個のファイルの書き込みに失敗しました", failed.len())
                .red()
                .bold()
        );
        for report in failed {
            if let Err(e) = &report.result {
                eprintln!("  - {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn print_reports(reports: &[WriteReport], output_dir: &std::path::Path) {
    let mut created = 0;
    let mut replaced = 0;
    let mut skipped = 0;

    for report in reports {
        let display = report
            .path
            .strip_prefix(output_dir)
            .unwrap_or(&report.path)
            .display()
            .to_string();
        match &report.result {
            Ok(WriteOutcome::Created) => {
                created += 1;
                println!("  {} 作成: {}", "✓".green(), display.cyan());
            }
            Ok(WriteOutcome::Replaced) => {
                replaced += 1;
                println!("  {} 上書き: {}", "✓".green(), display.cyan());
            }
            Ok(WriteOutcome::Skipped) => {
                skipped += 1;
                println!("  {} スキップ（既存）: {}", "⚠".yellow(), display);
            }
            Err(_) => println!("  {} 失敗: {}", "✗".red(), display),
        }
    }

    println!();
    println!(
        "{}",
        format!(
            "✓ 完了: 作成 {} / 上書き {} / スキップ {}",
            created, replaced, skipped
        )
        .green()
        .bold()
    );
    if skipped > 0 {
        println!("  既存ファイルを置き換えるには --force を指定してください");
    }
}
