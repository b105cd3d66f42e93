//! インスタンス別 postgres 設定ディレクトリ

use knotgen_core::{ArtifactKind, InstancePlan, RenderedArtifact, postgres_config_dir};

const PG_HBA_CONF: &str = "\
# TYPE  DATABASE        USER            ADDRESS                 METHOD
local   all             all                                     trust
host    all             all             127.0.0.1/32            trust
host    all             all             ::1/128                 trust
host    all             all             all                     scram-sha-256
";

const POSTGRESQL_CONF: &str = "\
listen_addresses = '*'
port = 5432
max_connections = 100
shared_buffers = 128MB
password_encryption = scram-sha-256
log_timezone = 'UTC'
timezone = 'UTC'
";

/// `postgres/instance{i}/` 配下の設定ファイル（内容は全インスタンス共通）
pub fn render_postgres_config(plan: &InstancePlan) -> Vec<RenderedArtifact> {
    let dir = postgres_config_dir(plan.id);
    vec![
        RenderedArtifact::new(
            ArtifactKind::PostgresConfig,
            dir.join("pg_hba.conf"),
            format!("{}\n{}", crate::GENERATED_HEADER, PG_HBA_CONF),
        ),
        RenderedArtifact::new(
            ArtifactKind::PostgresConfig,
            dir.join("postgresql.conf"),
            format!("{}\n{}", crate::GENERATED_HEADER, POSTGRESQL_CONF),
        ),
    ]
}
