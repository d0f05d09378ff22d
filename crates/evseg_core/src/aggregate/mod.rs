use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{EntityGroup, EvidenceRecord};

/// Order in which entity groups are produced. Records inside a group always keep input order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    #[default]
    FirstSeen,
    Lexical,
}

/// Partition `records` by entity id. Every record lands in exactly one group.
pub fn group_by_entity(records: &[EvidenceRecord], order: GroupOrder) -> Vec<EntityGroup> {
    let mut groups: Vec<EntityGroup> = Vec::new();
    let mut index_by_entity: HashMap<&str, usize> = HashMap::new();

    for rec in records {
        let idx = *index_by_entity
            .entry(rec.entity_id.as_str())
            .or_insert_with(|| {
                groups.push(EntityGroup {
                    entity_id: rec.entity_id.clone(),
                    records: Vec::new(),
                });
                groups.len() - 1
            });
        groups[idx].records.push(rec.clone());
    }

    if order == GroupOrder::Lexical {
        // Entity ids are unique across groups, so an unstable sort is deterministic.
        groups.sort_unstable_by(|a, b| a.entity_id.cmp(&b.entity_id));
    }
    groups
}
