//! 依存グラフ定義

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 依存エッジの起動ゲート
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// 依存先が起動していればよい
    Started,
    /// 依存先のヘルスチェックが通るまで待つ
    Healthy,
    /// 依存先が正常終了するまで待つ
    CompletedSuccessfully,
}

impl Gate {
    /// compose の depends_on.condition に書く値
    pub fn compose_condition(&self) -> &'static str {
        match self {
            Self::Started => "service_started",
            Self::Healthy => "service_healthy",
            Self::CompletedSuccessfully => "service_completed_successfully",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::Healthy => "healthy",
            Self::CompletedSuccessfully => "completed_successfully",
        };
        f.write_str(s)
    }
}

/// `from` は `to` が `gate` を満たすまで起動しない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub gate: Gate,
}

/// 1インスタンス分の依存グラフ（検証済み DAG）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    instance: u32,
    root: String,
    services: Vec<String>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub(crate) fn new(
        instance: u32,
        root: String,
        services: Vec<String>,
        edges: Vec<DependencyEdge>,
    ) -> Self {
        Self {
            instance,
            root,
            services,
            edges,
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// HTTP を受け付けるルートサービス
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// `service` が依存しているエッジ
    pub fn dependencies_of<'a>(
        &'a self,
        service: &'a str,
    ) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges.iter().filter(move |e| e.from == service)
    }

    /// 起動順（依存先が先）
    ///
    /// 同じ段のサービスは `services()` の順序を保つ。
    pub fn topological_order(&self) -> Vec<&str> {
        let mut remaining: HashMap<&str, usize> = self
            .services
            .iter()
            .map(|s| (s.as_str(), self.dependencies_of(s).count()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for edge in &self.edges {
            dependents
                .entry(edge.to.as_str())
                .or_default()
                .push(edge.from.as_str());
        }

        let mut order = Vec::with_capacity(self.services.len());
        while order.len() < self.services.len() {
            let ready: Vec<&str> = self
                .services
                .iter()
                .map(String::as_str)
                .filter(|s| remaining.get(s) == Some(&0))
                .collect();
            if ready.is_empty() {
                // 構築時に非巡回が保証されているので到達しない
                break;
            }
            for service in ready {
                remaining.remove(service);
                order.push(service);
                for dependent in dependents.get(service).into_iter().flatten() {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                    }
                }
            }
        }
        order
    }
}
