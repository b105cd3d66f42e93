//! 割り当てプランナー
//!
//! インスタンス id と設定から、そのインスタンスの全識別子を決定します。
//! 純粋関数であり、同じ入力には常に同じ計画を返します。
//!
//! ## 割り当て規則
//!
//! | 項目 | 値 |
//! |---|---|
//! | HTTP ポート | `http_base + i` |
//! | 上流DBポート | `upstream_db_port_base + i` |
//! | ネットワーク | `net-{i}` |
//! | ボリューム | `data-{i}` |
//! | サービス名 | `{role}-{i}` |
//! | server_name | `{slug}.{domain}`（スラッグ重複時は `{slug}--{i}.{domain}`） |
//! | パスワード | `{seed}-{cache,users,db}-{i}` |

use crate::model::{Credentials, GenerationConfig, InstancePlan, LabelSet, ServiceRole};
use tracing::debug;

/// インスタンス `id` の計画を作成
///
/// `1 <= id <= config.instance_count` が前提条件。
/// 設定は `GenerationConfig::validate` 済みであること。
pub fn plan(id: u32, config: &GenerationConfig, labels: &LabelSet) -> InstancePlan {
    debug_assert!(
        (1..=config.instance_count).contains(&id),
        "instance id {} out of range 1..={}",
        id,
        config.instance_count
    );

    let label = labels.label_for(id).clone();
    let server_name = format!("{}.{}", labels.host_name_for(id), config.domain);

    let seed = &config.secrets.credential_seed;
    let credentials = Credentials {
        cache_password: format!("{}-cache-{}", seed, id),
        users_password: format!("{}-users-{}", seed, id),
        db_password: format!("{}-db-{}", seed, id),
    };

    let service_names = ServiceRole::ALL
        .iter()
        .map(|role| (*role, role.service_name(id)))
        .collect();

    let plan = InstancePlan {
        id,
        label,
        http_port: offset_port(config.base_ports.http_base, id),
        upstream_service_port: offset_port(config.base_ports.upstream_db_port_base, id),
        network_name: format!("net-{}", id),
        volume_name: format!("data-{}", id),
        server_name,
        credentials,
        service_names,
    };

    debug!(
        id,
        label = %plan.label,
        http_port = plan.http_port,
        upstream_port = plan.upstream_service_port,
        "Planned instance"
    );
    plan
}

/// 全インスタンスを順に計画
pub fn plan_all(config: &GenerationConfig, labels: &LabelSet) -> Vec<InstancePlan> {
    (1..=config.instance_count)
        .map(|id| plan(id, config, labels))
        .collect()
}

/// 検証済み設定では飽和しない
fn offset_port(base: u16, id: u32) -> u16 {
    base.saturating_add(u16::try_from(id).unwrap_or(u16::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BasePorts, Label, Secrets};
    use std::collections::HashSet;

    fn labels(values: &[&str]) -> LabelSet {
        LabelSet::new(values.iter().filter_map(Label::new).collect()).unwrap()
    }

    fn config(instance_count: u32) -> GenerationConfig {
        GenerationConfig {
            instance_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_allocation_formulas() {
        let config = config(3);
        let plan = plan(2, &config, &labels(&["x", "y", "z"]));

        assert_eq!(plan.id, 2);
        assert_eq!(plan.label.as_str(), "y");
        assert_eq!(plan.http_port, 8082);
        assert_eq!(plan.upstream_service_port, 7002);
        assert_eq!(plan.network_name, "net-2");
        assert_eq!(plan.volume_name, "data-2");
        assert_eq!(plan.server_name, "y.example.com");
        assert_eq!(plan.service_name(ServiceRole::AppServer), "app-server-2");
        assert_eq!(plan.service_name(ServiceRole::DbInit), "db-init-2");
        assert_eq!(plan.service_names.len(), ServiceRole::ALL.len());
    }

    #[test]
    fn test_plan_is_deterministic() {
        let config = config(8);
        let labels = labels(&["a", "b", "c"]);

        for id in 1..=8 {
            assert_eq!(plan(id, &config, &labels), plan(id, &config, &labels));
        }
        assert_eq!(plan_all(&config, &labels), plan_all(&config, &labels));
    }

    #[test]
    fn test_identifiers_are_globally_unique() {
        let config = config(50);
        let plans = plan_all(&config, &labels(&["a", "b", "c"]));

        let http: HashSet<_> = plans.iter().map(|p| p.http_port).collect();
        let networks: HashSet<_> = plans.iter().map(|p| p.network_name.clone()).collect();
        let volumes: HashSet<_> = plans.iter().map(|p| p.volume_name.clone()).collect();
        let servers: HashSet<_> = plans.iter().map(|p| p.server_name.clone()).collect();
        let services: HashSet<_> = plans
            .iter()
            .flat_map(|p| p.service_names.values().cloned())
            .collect();

        assert_eq!(http.len(), 50);
        assert_eq!(networks.len(), 50);
        assert_eq!(volumes.len(), 50);
        assert_eq!(servers.len(), 50);
        assert_eq!(services.len(), 50 * ServiceRole::ALL.len());
    }

    #[test]
    fn test_credentials_are_distinct_and_non_empty() {
        let config = config(4);
        let plans = plan_all(&config, &labels(&["a"]));

        let mut seen = HashSet::new();
        for plan in &plans {
            let creds = &plan.credentials;
            for password in [
                &creds.cache_password,
                &creds.users_password,
                &creds.db_password,
            ] {
                assert!(!password.is_empty());
                assert!(seen.insert(password.clone()), "duplicate {}", password);
            }
        }
        assert_eq!(plans[0].credentials.cache_password, "pass-cache-1");
    }

    #[test]
    fn test_credential_seed_from_secrets() {
        let config = GenerationConfig {
            instance_count: 1,
            secrets: Secrets {
                upstream_password: "augur".to_string(),
                credential_seed: "knot".to_string(),
            },
            ..Default::default()
        };
        let plan = plan(1, &config, &labels(&["a"]));

        assert_eq!(plan.credentials.db_password, "knot-db-1");
    }

    #[test]
    fn test_reused_label_gets_suffixed_server_name() {
        let config = config(5);
        let plans = plan_all(&config, &labels(&["a", "b", "c"]));

        assert_eq!(plans[0].server_name, "a.example.com");
        assert_eq!(plans[3].label.as_str(), "a");
        assert_eq!(plans[3].server_name, "a--4.example.com");
        assert_eq!(plans[4].server_name, "b--5.example.com");
    }

    #[test]
    fn test_distinct_labels_never_share_a_server_name() {
        let plans = plan_all(&config(3), &labels(&["a", "a-3"]));

        let servers: Vec<_> = plans.iter().map(|p| p.server_name.as_str()).collect();
        assert_eq!(
            servers,
            vec!["a.example.com", "a-3.example.com", "a--3.example.com"]
        );
        assert!(crate::validator::validate(&plans).is_ok());
    }

    #[test]
    fn test_custom_base_ports() {
        let config = GenerationConfig {
            instance_count: 3,
            base_ports: BasePorts {
                http_base: 9000,
                upstream_db_port_base: 5430,
                redis_port_base: 6379,
            },
            ..Default::default()
        };
        let plans = plan_all(&config, &labels(&["x"]));

        let http: Vec<_> = plans.iter().map(|p| p.http_port).collect();
        let upstream: Vec<_> = plans.iter().map(|p| p.upstream_service_port).collect();
        assert_eq!(http, vec![9001, 9002, 9003]);
        assert_eq!(upstream, vec![5431, 5432, 5433]);
    }
}
