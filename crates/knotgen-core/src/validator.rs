//! トポロジー検証
//!
//! 全インスタンスの計画を一括で検査し、ホスト上で衝突するリソースを
//! 全て列挙します。書き込みの前に必ず完了させる同期点です。

use crate::error::ValidationError;
use crate::model::{Conflict, InstancePlan, ResourceKey};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 計画一式に重複が無いことを検証
///
/// 1件でも重複があれば、検出した全ての重複を含む `DuplicateResource` を返す。
#[tracing::instrument(skip(plans), fields(instances = plans.len()))]
pub fn validate(plans: &[InstancePlan]) -> Result<(), ValidationError> {
    let conflicts = find_conflicts(plans);

    if conflicts.is_empty() {
        info!("Topology validation passed");
        Ok(())
    } else {
        warn!(conflicts = conflicts.len(), "Topology validation failed");
        Err(ValidationError::DuplicateResource { conflicts })
    }
}

/// 重複しているリソースキーを全て列挙（キー順）
pub fn find_conflicts(plans: &[InstancePlan]) -> Vec<Conflict> {
    let mut owners: BTreeMap<ResourceKey, Vec<u32>> = BTreeMap::new();
    for plan in plans {
        for key in plan.resource_keys() {
            owners.entry(key).or_default().push(plan.id);
        }
    }

    owners
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, mut ids)| {
            ids.sort_unstable();
            ids.dedup();
            Conflict {
                key,
                instance_ids: ids,
            }
        })
        .collect()
}
