//! compose マニフェスト
//!
//! 計画と依存グラフから構造化モデルを組み立て、serde_yaml で書き出す。
//! 文字列連結はしないので、クォートやエスケープは YAML ライター任せになる。

use crate::error::{RenderError, Result};
use indexmap::IndexMap;
use knotgen_core::{
    ArtifactKind, COMPOSE_FILE, DependencyGraph, Gate, GenerationConfig, InstancePlan,
    RenderedArtifact, ServiceRole, env_file_path, postgres_config_dir,
};
use serde::Serialize;
use tracing::debug;

const APP_DOCKERFILE: &str = "./docker/Dockerfile";
const REDIS_IMAGE: &str = "docker.io/library/redis:6";
const POSTGRES_IMAGE: &str = "docker.io/library/postgres:16";
/// アプリケーションがコンテナ内で待ち受けるポート
const APP_CONTAINER_PORT: u16 = 8080;

/// docker-compose.yml のトップレベル
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComposeFile {
    pub services: IndexMap<String, ComposeService>,
    pub networks: IndexMap<String, ComposeNetwork>,
    pub volumes: IndexMap<String, ComposeVolume>,
}

/// サービス定義
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComposeService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<ComposeBuild>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub depends_on: IndexMap<String, DependsOn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    pub restart: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthCheck>,
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeBuild {
    pub context: String,
    pub dockerfile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependsOn {
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeHealthCheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeNetwork {
    pub driver: String,
}

/// 名前付きボリューム（オプション無し → `{}`）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComposeVolume {}

/// 1インスタンス分の断片
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeFragment {
    pub instance: u32,
    pub services: IndexMap<String, ComposeService>,
    pub network: String,
    pub volume: String,
}

/// インスタンスの断片をレンダリング
///
/// 依存グラフの各エッジは `depends_on.{service}.condition` になる。
/// `healthy` ゲートの依存先にはヘルスチェックが必要。
pub fn render_fragment(
    plan: &InstancePlan,
    graph: &DependencyGraph,
    config: &GenerationConfig,
) -> Result<ComposeFragment> {
    let mut services = IndexMap::new();

    for role in ServiceRole::ALL {
        let name = plan.service_name(role);
        if !graph.services().contains(&name) {
            continue;
        }

        let mut service = service_definition(role, plan, config);
        for edge in graph.dependencies_of(&name) {
            service.depends_on.insert(
                edge.to.clone(),
                DependsOn {
                    condition: edge.gate.compose_condition().to_string(),
                },
            );
        }
        services.insert(name, service);
    }

    for edge in graph.edges().iter().filter(|e| e.gate == Gate::Healthy) {
        let has_healthcheck = services
            .get(&edge.to)
            .is_some_and(|s| s.healthcheck.is_some());
        if !has_healthcheck {
            return Err(RenderError::MissingHealthcheck {
                service: edge.to.clone(),
                dependent: edge.from.clone(),
            });
        }
    }

    debug!(instance = plan.id, services = services.len(), "Rendered compose fragment");
    Ok(ComposeFragment {
        instance: plan.id,
        services,
        network: plan.network_name.clone(),
        volume: plan.volume_name.clone(),
    })
}

/// 断片を集約して docker-compose.yml をレンダリング
pub fn render_manifest(fragments: &[ComposeFragment]) -> Result<RenderedArtifact> {
    let mut ordered: Vec<&ComposeFragment> = fragments.iter().collect();
    ordered.sort_by_key(|f| f.instance);

    let mut file = ComposeFile::default();
    for fragment in ordered {
        for (name, service) in &fragment.services {
            file.services.insert(name.clone(), service.clone());
        }
        file.networks.insert(
            fragment.network.clone(),
            ComposeNetwork {
                driver: "bridge".to_string(),
            },
        );
        file.volumes
            .insert(fragment.volume.clone(), ComposeVolume::default());
    }

    let yaml = serde_yaml::to_string(&file)?;
    let content = format!("{}\n{}", crate::GENERATED_HEADER, yaml);
    Ok(RenderedArtifact::new(
        ArtifactKind::ComposeManifest,
        COMPOSE_FILE,
        content,
    ))
}

/// 役割ごとのサービス定義（depends_on 以外）
fn service_definition(
    role: ServiceRole,
    plan: &InstancePlan,
    config: &GenerationConfig,
) -> ComposeService {
    let base = ComposeService {
        env_file: vec![format!("./{}", env_file_path(plan.id).display())],
        restart: "always".to_string(),
        networks: vec![plan.network_name.clone()],
        ..Default::default()
    };
    let app_build = || ComposeBuild {
        context: config.build_context.display().to_string(),
        dockerfile: APP_DOCKERFILE.to_string(),
    };

    match role {
        ServiceRole::AppServer => ComposeService {
            build: Some(app_build()),
            command: args(&[
                "gunicorn",
                "--bind",
                &format!(":{}", APP_CONTAINER_PORT),
                "app:server",
                "--workers",
                "1",
                "--threads",
                "2",
                "--timeout",
                "300",
                "--keep-alive",
                "5",
            ]),
            environment: args(&[
                "EIGHTKNOT_SEARCHBAR_OPTS_SORT=shortest",
                "EIGHTKNOT_SEARCHBAR_OPTS_MAX_RESULTS=5500",
                "EIGHTKNOT_SEARCHBAR_OPTS_MAX_REPOS=5000",
            ]),
            ports: vec![format!("{}:{}", plan.http_port, APP_CONTAINER_PORT)],
            ..base
        },
        ServiceRole::WorkerCallback => ComposeService {
            build: Some(app_build()),
            command: args(&[
                "celery",
                "-A",
                "app:celery_app",
                "worker",
                "--loglevel=INFO",
                "--concurrency=1",
                "--time-limit=300",
                "--soft-time-limit=240",
            ]),
            ..base
        },
        ServiceRole::WorkerQuery => ComposeService {
            build: Some(app_build()),
            command: args(&[
                "celery",
                "-A",
                "app:celery_app",
                "worker",
                "--loglevel=INFO",
                "-Q",
                "data",
                "--concurrency=1",
                "--time-limit=600",
                "--soft-time-limit=540",
            ]),
            ..base
        },
        ServiceRole::RedisCache => ComposeService {
            image: Some(REDIS_IMAGE.to_string()),
            command: redis_command("REDIS_CACHE_PASSWORD", config.base_ports.redis_port_base),
            ..base
        },
        ServiceRole::RedisUsers => ComposeService {
            image: Some(REDIS_IMAGE.to_string()),
            command: redis_command("REDIS_USERS_PASSWORD", config.base_ports.redis_port_base),
            ..base
        },
        ServiceRole::PostgresCache => {
            let config_dir = postgres_config_dir(plan.id);
            ComposeService {
                image: Some(POSTGRES_IMAGE.to_string()),
                command: args(&[
                    "postgres",
                    "-c",
                    "config_file=/etc/postgresql/postgresql.conf",
                    "-c",
                    "hba_file=/etc/postgresql/pg_hba.conf",
                ]),
                volumes: vec![
                    format!(
                        "./{}:/etc/postgresql/postgresql.conf:ro",
                        config_dir.join("postgresql.conf").display()
                    ),
                    format!(
                        "./{}:/etc/postgresql/pg_hba.conf:ro",
                        config_dir.join("pg_hba.conf").display()
                    ),
                    format!("{}:/var/lib/postgresql/data", plan.volume_name),
                ],
                healthcheck: Some(ComposeHealthCheck {
                    test: args(&["CMD-SHELL", "pg_isready -U postgres"]),
                    interval: "5s".to_string(),
                    timeout: "5s".to_string(),
                    retries: 5,
                }),
                ..base
            }
        }
        ServiceRole::DbInit => ComposeService {
            build: Some(app_build()),
            command: args(&["python3", "./cache_manager/db_init.py"]),
            restart: "on-failure:1000".to_string(),
            ..base
        },
    }
}

/// パスワードは env_file から読み、compose の展開を避けるため `$$` でエスケープ
fn redis_command(password_var: &str, port: u16) -> Vec<String> {
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        format!(
            "redis-server --port {} --requirepass \"$${{{var}:?{var} variable is not set}}\"",
            port,
            var = password_var
        ),
    ]
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
