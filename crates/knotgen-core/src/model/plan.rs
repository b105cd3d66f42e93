//! インスタンス計画

use super::label::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 1インスタンスを構成するサービスの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceRole {
    /// HTTP を受け付けるアプリケーションサーバー（依存グラフのルート）
    AppServer,
    WorkerCallback,
    WorkerQuery,
    RedisCache,
    RedisUsers,
    PostgresCache,
    /// データストアの初期化ジョブ（正常終了で完了）
    DbInit,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 7] = [
        Self::AppServer,
        Self::WorkerCallback,
        Self::WorkerQuery,
        Self::RedisCache,
        Self::RedisUsers,
        Self::PostgresCache,
        Self::DbInit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppServer => "app-server",
            Self::WorkerCallback => "worker-callback",
            Self::WorkerQuery => "worker-query",
            Self::RedisCache => "redis-cache",
            Self::RedisUsers => "redis-users",
            Self::PostgresCache => "postgres-cache",
            Self::DbInit => "db-init",
        }
    }

    /// `{role}-{id}` 形式のサービス名
    pub fn service_name(&self, id: u32) -> String {
        format!("{}-{}", self.as_str(), id)
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// インスタンス固有のクレデンシャル
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// redis-cache の requirepass
    pub cache_password: String,
    /// redis-users の requirepass
    pub users_password: String,
    /// postgres-cache の POSTGRES_PASSWORD
    pub db_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cache_password", &"***")
            .field("users_password", &"***")
            .field("db_password", &"***")
            .finish()
    }
}

/// 1インスタンス分の解決済み識別子とクレデンシャル
///
/// AllocationPlanner が id ごとに一度だけ生成し、以降は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePlan {
    pub id: u32,
    pub label: Label,
    pub http_port: u16,
    pub upstream_service_port: u16,
    pub network_name: String,
    pub volume_name: String,
    /// リバースプロキシの server_name
    pub server_name: String,
    /// シリアライズしない（`.env` にだけ書き出す）
    #[serde(skip)]
    pub credentials: Credentials,
    pub service_names: BTreeMap<ServiceRole, String>,
}

impl InstancePlan {
    /// 役割に対応するサービス名
    pub fn service_name(&self, role: ServiceRole) -> String {
        self.service_names
            .get(&role)
            .cloned()
            .unwrap_or_else(|| role.service_name(self.id))
    }
}
