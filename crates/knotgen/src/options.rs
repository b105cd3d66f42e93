//! CLI 引数と設定ファイルの統合
//!
//! 優先順位: CLI フラグ / KNOTGEN_* 環境変数 > knotgen.yaml > 組み込みデフォルト

use clap::Args;
use knotgen_config::Settings;
use knotgen_core::{
    BasePorts, DEFAULT_DOMAIN, DEFAULT_HTTP_BASE, DEFAULT_INSTANCE_COUNT, DEFAULT_REDIS_PORT,
    DEFAULT_UPSTREAM_DB_PORT_BASE, GenerationConfig, LabelPolicy, OverwritePolicy,
    UpstreamDatabase,
};
use std::path::PathBuf;

const DEFAULT_LABELS_PATH: &str = "labels.txt";
const DEFAULT_SECRETS_PATH: &str = ".secrets.env";

/// 割り当てに関わる引数（generate / plan 共通）
#[derive(Args, Debug, Clone, Default)]
pub struct AllocationArgs {
    /// インスタンス数 [デフォルト: 8]
    #[arg(short = 'n', long = "instances", env = "KNOTGEN_INSTANCES")]
    pub instances: Option<u32>,
    /// ラベルファイル（1行1ラベル） [デフォルト: labels.txt]
    #[arg(short = 'l', long, env = "KNOTGEN_LABELS")]
    pub labels: Option<PathBuf>,
    /// HTTP ポートのベース（インスタンス i は base + i） [デフォルト: 8080]
    #[arg(long, env = "KNOTGEN_BASE_HTTP_PORT")]
    pub base_http_port: Option<u16>,
    /// 上流DBポートのベース [デフォルト: 7000]
    #[arg(long, env = "KNOTGEN_BASE_UPSTREAM_PORT")]
    pub base_upstream_port: Option<u16>,
    /// Redis のコンテナ内ポート [デフォルト: 6379]
    #[arg(long, env = "KNOTGEN_REDIS_PORT")]
    pub redis_port: Option<u16>,
    /// nginx の server_name に使うドメイン [デフォルト: example.com]
    #[arg(long, env = "KNOTGEN_DOMAIN")]
    pub domain: Option<String>,
    /// 秘密情報ファイル [デフォルト: .secrets.env]
    #[arg(long, env = "KNOTGEN_SECRETS")]
    pub secrets: Option<PathBuf>,
    /// インスタンス数に満たないラベルをエラーにする
    #[arg(long, env = "KNOTGEN_STRICT_LABELS")]
    pub strict_labels: bool,
    /// 並列度の上限 [デフォルト: CPU 数]
    #[arg(short = 'j', long, env = "KNOTGEN_JOBS")]
    pub jobs: Option<usize>,
}

/// generate コマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// compose の build.context に書くパス [デフォルト: .]
    #[arg(env = "KNOTGEN_BUILD_CONTEXT")]
    pub build_context: Option<PathBuf>,
    /// 既存ファイルを上書きする
    #[arg(short, long, env = "KNOTGEN_FORCE")]
    pub force: bool,
    /// 出力先ディレクトリ [デフォルト: .]
    #[arg(short = 'o', long, env = "KNOTGEN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
    #[command(flatten)]
    pub allocation: AllocationArgs,
}

impl AllocationArgs {
    /// 割り当て用の設定を組み立てる（秘密情報は未解決のまま）
    pub fn to_config(&self, settings: &Settings) -> GenerationConfig {
        let defaults = UpstreamDatabase::default();
        let upstream = UpstreamDatabase {
            host: settings.upstream.host.clone().unwrap_or(defaults.host),
            database: settings.upstream.database.clone().unwrap_or(defaults.database),
            schema: settings.upstream.schema.clone().unwrap_or(defaults.schema),
            username: settings.upstream.username.clone().unwrap_or(defaults.username),
            login_enabled: settings
                .upstream
                .login_enabled
                .unwrap_or(defaults.login_enabled),
        };

        let mut label_policy = LabelPolicy {
            strict: self.strict_labels || settings.label_policy.strict.unwrap_or(false),
            ..Default::default()
        };
        if let Some(label) = &settings.label_policy.default_label {
            // 空文字はラベルファイル必須の意味
            label_policy.default_label = Some(label.trim().to_string()).filter(|l| !l.is_empty());
        }

        GenerationConfig {
            instance_count: self
                .instances
                .or(settings.instances)
                .unwrap_or(DEFAULT_INSTANCE_COUNT),
            label_source: self
                .labels
                .clone()
                .or_else(|| settings.labels.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH)),
            base_ports: BasePorts {
                http_base: self
                    .base_http_port
                    .or(settings.ports.http_base)
                    .unwrap_or(DEFAULT_HTTP_BASE),
                upstream_db_port_base: self
                    .base_upstream_port
                    .or(settings.ports.upstream_base)
                    .unwrap_or(DEFAULT_UPSTREAM_DB_PORT_BASE),
                redis_port_base: self
                    .redis_port
                    .or(settings.ports.redis)
                    .unwrap_or(DEFAULT_REDIS_PORT),
            },
            domain: self
                .domain
                .clone()
                .or_else(|| settings.domain.clone())
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            upstream,
            label_policy,
            jobs: self
                .jobs
                .or(settings.jobs)
                .filter(|jobs| *jobs > 0)
                .unwrap_or_else(default_jobs),
            ..Default::default()
        }
    }

    pub fn secrets_path(&self, settings: &Settings) -> PathBuf {
        self.secrets
            .clone()
            .or_else(|| settings.secrets.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH))
    }
}

impl GenerateArgs {
    pub fn to_config(&self, settings: &Settings) -> GenerationConfig {
        GenerationConfig {
            build_context: self
                .build_context
                .clone()
                .or_else(|| settings.build_context.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            overwrite_policy: OverwritePolicy::from_force_flag(
                self.force || settings.force.unwrap_or(false),
            ),
            ..self.allocation.to_config(settings)
        }
    }

    pub fn output_dir(&self, settings: &Settings) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| settings.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knotgen_config::{LabelPolicySettings, PortSettings, UpstreamSettings};

    #[test]
    fn test_defaults_without_settings() {
        let config = GenerateArgs::default().to_config(&Settings::default());

        assert_eq!(config.instance_count, 8);
        assert_eq!(config.label_source, PathBuf::from("labels.txt"));
        assert_eq!(config.base_ports, BasePorts::default());
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.build_context, PathBuf::from("."));
        assert_eq!(config.overwrite_policy, OverwritePolicy::Skip);
        assert_eq!(config.label_policy, LabelPolicy::default());
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_settings_fill_missing_flags() {
        let settings = Settings {
            instances: Some(3),
            domain: Some("8knot.test".to_string()),
            force: Some(true),
            ports: PortSettings {
                http_base: Some(9000),
                ..Default::default()
            },
            upstream: UpstreamSettings {
                host: Some("db.internal".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = GenerateArgs::default().to_config(&settings);
        assert_eq!(config.instance_count, 3);
        assert_eq!(config.domain, "8knot.test");
        assert_eq!(config.overwrite_policy, OverwritePolicy::Force);
        assert_eq!(config.base_ports.http_base, 9000);
        assert_eq!(config.base_ports.upstream_db_port_base, 7000);
        assert_eq!(config.upstream.host, "db.internal");
        assert_eq!(config.upstream.database, "augur");
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            instances: Some(3),
            jobs: Some(2),
            ..Default::default()
        };
        let args = GenerateArgs {
            allocation: AllocationArgs {
                instances: Some(5),
                jobs: Some(4),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = args.to_config(&settings);
        assert_eq!(config.instance_count, 5);
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn test_empty_default_label_requires_label_file() {
        let settings = Settings {
            label_policy: LabelPolicySettings {
                default_label: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = AllocationArgs::default().to_config(&settings);
        assert_eq!(config.label_policy.default_label, None);
    }

    #[test]
    fn test_secrets_path_resolution() {
        let settings = Settings {
            secrets: Some(PathBuf::from("conf/secrets.env")),
            ..Default::default()
        };

        assert_eq!(
            AllocationArgs::default().secrets_path(&Settings::default()),
            PathBuf::from(".secrets.env")
        );
        assert_eq!(
            AllocationArgs::default().secrets_path(&settings),
            PathBuf::from("conf/secrets.env")
        );
    }
}
