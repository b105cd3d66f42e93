//! 生成パイプライン
//!
//! 計画 (並列) → 検証 (同期点) → グラフ構築とレンダリング (並列) → 集約 → 書き込み (並列)
//!
//! 各フェーズは前のフェーズが全て完了してから始まる。検証・グラフ・
//! レンダリングのどこで失敗しても、ファイルは1つも書き込まれない。

use crate::writer::{WriteError, WriteOutcome, write_artifact};
use knotgen_core::{
    GenerationConfig, InstancePlan, LabelSet, OverwritePolicy, RenderedArtifact, TopologyError,
    build_graph,
};
use knotgen_render::{
    ComposeFragment, RenderError, render_env_file, render_fragment, render_manifest,
    render_postgres_config, render_proxy,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("タスクの実行に失敗しました: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 1ファイル分の書き込み結果
#[derive(Debug)]
pub struct WriteReport {
    pub path: PathBuf,
    pub result: Result<WriteOutcome, WriteError>,
}

/// 全インスタンスを並列に計画し、一括で検証する
#[tracing::instrument(skip_all, fields(instances = config.instance_count, jobs = config.jobs))]
pub async fn plan_instances(
    config: Arc<GenerationConfig>,
    labels: Arc<LabelSet>,
) -> Result<Vec<InstancePlan>, PipelineError> {
    config.validate().map_err(TopologyError::from)?;

    let permits = Arc::new(Semaphore::new(config.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for id in 1..=config.instance_count {
        let permits = permits.clone();
        let config = config.clone();
        let labels = labels.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            knotgen_core::plan(id, &config, &labels)
        });
    }

    let mut plans = Vec::with_capacity(config.instance_count as usize);
    while let Some(plan) = tasks.join_next().await {
        plans.push(plan?);
    }
    plans.sort_by_key(|p| p.id);

    knotgen_core::validate(&plans).map_err(TopologyError::from)?;
    info!(instances = plans.len(), "Planned and validated all instances");
    Ok(plans)
}

/// 検証済みの計画から全生成物をレンダリングする（パス順）
#[tracing::instrument(skip_all, fields(instances = plans.len()))]
pub async fn render_artifacts(
    plans: &[InstancePlan],
    config: Arc<GenerationConfig>,
) -> Result<Vec<RenderedArtifact>, PipelineError> {
    let permits = Arc::new(Semaphore::new(config.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for plan in plans.iter().cloned() {
        let permits = permits.clone();
        let config = config.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            render_instance(&plan, &config)
        });
    }

    let mut fragments = Vec::with_capacity(plans.len());
    let mut artifacts = Vec::new();
    while let Some(rendered) = tasks.join_next().await {
        let (fragment, instance_artifacts) = rendered??;
        fragments.push(fragment);
        artifacts.extend(instance_artifacts);
    }

    artifacts.push(render_manifest(&fragments)?);
    artifacts.push(render_proxy(plans)?);
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));

    info!(artifacts = artifacts.len(), "Rendered all artifacts");
    Ok(artifacts)
}

/// 1インスタンス分: グラフ構築 → compose 断片 / .env / postgres 設定
fn render_instance(
    plan: &InstancePlan,
    config: &GenerationConfig,
) -> Result<(ComposeFragment, Vec<RenderedArtifact>), PipelineError> {
    let graph = build_graph(plan).map_err(TopologyError::from)?;
    let fragment = render_fragment(plan, &graph, config)?;

    let mut artifacts = vec![render_env_file(plan, config)];
    artifacts.extend(render_postgres_config(plan));

    debug!(instance = plan.id, "Rendered instance");
    Ok((fragment, artifacts))
}

/// 生成物を並列に書き込む
///
/// 失敗したファイルがあっても他のファイルの書き込みは続ける。
/// 結果はパス順で返す。
#[tracing::instrument(skip_all, fields(root = %root.display(), policy = ?policy))]
pub async fn write_artifacts(
    artifacts: Vec<RenderedArtifact>,
    root: PathBuf,
    policy: OverwritePolicy,
    jobs: usize,
) -> Vec<WriteReport> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let root = Arc::new(root);
    let mut tasks = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let permits = permits.clone();
        let root = root.clone();
        let path = root.join(&artifact.path);
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            tokio::task::spawn_blocking(move || write_artifact(&artifact, &root, policy)).await
        });
        tasks.push((path, handle));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for (path, handle) in tasks {
        let result = match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) | Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Writer task failed");
                Err(WriteError {
                    path: path.clone(),
                    source: std::io::Error::other(e),
                })
            }
        };
        reports.push(WriteReport { path, result });
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    reports
}
