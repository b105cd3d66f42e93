//! 依存グラフ構築
//!
//! インスタンス内のサービス間に起動ゲート付きのエッジを張ります。
//!
//! 標準トポロジー:
//!
//! ```text
//! app-server ──completed──▶ db-init ──healthy──▶ postgres-cache
//!     │                                              ▲
//!     ├──started──▶ worker-callback ──started──┬─────┤
//!     ├──started──▶ worker-query ────started───┼─────┘
//!     ├──started──▶ redis-cache ◀──────────────┤
//!     └──started──▶ redis-users ◀──────────────┘ (worker-callback のみ)
//! ```
//!
//! ワーカーは依存先の準備完了を自身のリトライで吸収するため `started` で十分。

use crate::error::GraphError;
use crate::model::{DependencyEdge, DependencyGraph, Gate, InstancePlan, ServiceRole};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// トポロジー上の1ノード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyNode {
    pub role: ServiceRole,
    pub depends_on: Vec<(ServiceRole, Gate)>,
}

impl TopologyNode {
    pub fn new(role: ServiceRole, depends_on: Vec<(ServiceRole, Gate)>) -> Self {
        Self { role, depends_on }
    }
}

/// HTTP を受け付けるルート
pub const ROOT_ROLE: ServiceRole = ServiceRole::AppServer;

/// 標準のサービストポロジー
pub fn canonical_topology() -> Vec<TopologyNode> {
    use Gate::*;
    use ServiceRole::*;

    vec![
        TopologyNode::new(
            AppServer,
            vec![
                (DbInit, CompletedSuccessfully),
                (WorkerCallback, Started),
                (WorkerQuery, Started),
                (RedisCache, Started),
                (RedisUsers, Started),
            ],
        ),
        TopologyNode::new(
            WorkerCallback,
            vec![
                (RedisCache, Started),
                (RedisUsers, Started),
                (PostgresCache, Started),
            ],
        ),
        TopologyNode::new(
            WorkerQuery,
            vec![(RedisCache, Started), (PostgresCache, Started)],
        ),
        TopologyNode::new(RedisCache, vec![]),
        TopologyNode::new(RedisUsers, vec![]),
        TopologyNode::new(PostgresCache, vec![]),
        TopologyNode::new(DbInit, vec![(PostgresCache, Healthy)]),
    ]
}

/// 標準トポロジーでインスタンスの依存グラフを構築
pub fn build_graph(plan: &InstancePlan) -> Result<DependencyGraph, GraphError> {
    build_graph_with(plan, &canonical_topology(), ROOT_ROLE)
}

/// 任意のトポロジーで依存グラフを構築
///
/// 循環があれば `CycleDetected`、ルートから到達できないサービスがあれば
/// `Unreachable` を返す。
#[tracing::instrument(skip(plan, topology), fields(instance = plan.id))]
pub fn build_graph_with(
    plan: &InstancePlan,
    topology: &[TopologyNode],
    root: ServiceRole,
) -> Result<DependencyGraph, GraphError> {
    let index: HashMap<ServiceRole, usize> = topology
        .iter()
        .enumerate()
        .map(|(i, node)| (node.role, i))
        .collect();

    let root_name = plan.service_name(root);
    if !index.contains_key(&root) {
        return Err(GraphError::UnknownService {
            instance: plan.id,
            from: root_name.clone(),
            to: root_name,
        });
    }

    // 隣接リスト（ロールのインデックス）
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); topology.len()];
    let mut edges = Vec::new();
    for (i, node) in topology.iter().enumerate() {
        for (dep, gate) in &node.depends_on {
            let Some(&j) = index.get(dep) else {
                return Err(GraphError::UnknownService {
                    instance: plan.id,
                    from: plan.service_name(node.role),
                    to: plan.service_name(*dep),
                });
            };
            adjacency[i].push(j);
            edges.push(DependencyEdge {
                from: plan.service_name(node.role),
                to: plan.service_name(*dep),
                gate: *gate,
            });
        }
    }

    if let Some(cycle) = find_cycle(&adjacency) {
        return Err(GraphError::CycleDetected {
            instance: plan.id,
            cycle: cycle
                .into_iter()
                .map(|i| plan.service_name(topology[i].role))
                .collect(),
        });
    }

    let reachable = reachable_from(&adjacency, index[&root]);
    let unreachable: Vec<String> = topology
        .iter()
        .enumerate()
        .filter(|(i, _)| !reachable[*i])
        .map(|(_, node)| plan.service_name(node.role))
        .collect();
    if !unreachable.is_empty() {
        return Err(GraphError::Unreachable {
            instance: plan.id,
            root: root_name,
            services: unreachable,
        });
    }

    let services = topology
        .iter()
        .map(|node| plan.service_name(node.role))
        .collect();

    debug!(edges = edges.len(), "Dependency graph built");
    Ok(DependencyGraph::new(plan.id, root_name, services, edges))
}

/// 深さ優先探索で循環を探す（見つかれば循環経路を返す）
fn find_cycle(adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(
        node: usize,
        adjacency: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[node] = Mark::InProgress;
        stack.push(node);

        for &next in &adjacency[node] {
            match marks[next] {
                Mark::InProgress => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, adjacency, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::Unvisited; adjacency.len()];
    let mut stack = Vec::new();
    for node in 0..adjacency.len() {
        if marks[node] == Mark::Unvisited {
            if let Some(cycle) = visit(node, adjacency, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn reachable_from(adjacency: &[Vec<usize>], root: usize) -> Vec<bool> {
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([root]);
    seen[root] = true;

    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}
