use crate::options::AllocationArgs;
use crate::pipeline::{self, PipelineError};
use crate::utils;
use colored::Colorize;
use knotgen_core::{TopologyError, build_graph};
use std::sync::Arc;

/// 割り当て計画を表示（ドライラン）
pub async fn handle(allocation: AllocationArgs, json: bool) -> anyhow::Result<()> {
    let loaded = knotgen_config::load_settings()?;
    if !json {
        utils::print_loaded_settings(&loaded);
    }

    let config = allocation.to_config(&loaded.settings);
    let secrets_path = allocation.secrets_path(&loaded.settings);
    let (config, labels) = super::load_inputs(config, &secrets_path);

    let plans = match pipeline::plan_instances(Arc::new(config), Arc::new(labels)).await {
        Ok(plans) => plans,
        Err(e) => utils::exit_with_pipeline_error(&e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("✓ トポロジー検証 OK（{}インスタンス、重複なし）", plans.len()).green()
    );
    println!();
    for plan in &plans {
        println!(
            "  [{}] {} ({})",
            plan.id,
            plan.label.to_string().cyan(),
            plan.server_name
        );
        println!(
            "      http: {}  upstream: {}  network: {}  volume: {}",
            plan.http_port, plan.upstream_service_port, plan.network_name, plan.volume_name
        );
    }

    if let Some(first) = plans.first() {
        let graph = match build_graph(first) {
            Ok(graph) => graph,
            Err(e) => utils::exit_with_pipeline_error(&PipelineError::Topology(
                TopologyError::from(e),
            )),
        };
        println!();
        println!("起動順 (instance {}):", graph.instance());
        for (step, service) in graph.topological_order().iter().enumerate() {
            println!("  {}. {}", step + 1, service);
        }
    }

    Ok(())
}
