//! 一意性検証のためのリソースキー

use super::plan::InstancePlan;
use serde::Serialize;
use std::fmt;

/// ホスト全体で一意でなければならないリソースの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Port,
    NetworkName,
    VolumeName,
    ServiceName,
    ServerName,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::NetworkName => "network",
            Self::VolumeName => "volume",
            Self::ServiceName => "service",
            Self::ServerName => "server_name",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (種別, 値) の組
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub value: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn port(port: u16) -> Self {
        Self::new(ResourceKind::Port, port.to_string())
    }

    pub fn network(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::NetworkName, name)
    }

    pub fn volume(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::VolumeName, name)
    }

    pub fn service(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::ServiceName, name)
    }

    pub fn server_name(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::ServerName, name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.value)
    }
}

/// 複数のインスタンスが同じキーを所有している状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub key: ResourceKey,
    /// キーを所有するインスタンス id（昇順・重複なし）
    pub instance_ids: Vec<u32>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = self
            .instance_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} <- instance {}", self.key, ids)
    }
}

impl InstancePlan {
    /// このインスタンスが所有する全てのリソースキー
    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        let mut keys = vec![
            ResourceKey::port(self.http_port),
            ResourceKey::port(self.upstream_service_port),
            ResourceKey::network(&self.network_name),
            ResourceKey::volume(&self.volume_name),
            ResourceKey::server_name(&self.server_name),
        ];
        keys.extend(self.service_names.values().map(ResourceKey::service));
        keys
    }
}
