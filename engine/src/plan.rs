//! Routing of edits and deletes.
//!
//! A record in the local-origin set has never reached the server, so an edit
//! to it has to be submitted as a create and a delete needs no request at
//! all. Everything else goes to the server as-is.

use crate::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a write against an existing record goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WritePlan {
    /// Submit the local record as a create; on success it leaves local storage
    MigrateLocal { id: RecordId },
    /// Update the server's copy
    UpdateRemote { id: RecordId },
    /// Remove from local storage without a request
    DeleteLocal { id: RecordId },
    /// Delete the server's copy
    DeleteRemote { id: RecordId },
}

impl WritePlan {
    /// The record this plan targets.
    pub fn id(&self) -> RecordId {
        match self {
            WritePlan::MigrateLocal { id }
            | WritePlan::UpdateRemote { id }
            | WritePlan::DeleteLocal { id }
            | WritePlan::DeleteRemote { id } => *id,
        }
    }

    /// Whether carrying out the plan issues a request.
    pub fn needs_network(&self) -> bool {
        !matches!(self, WritePlan::DeleteLocal { .. })
    }
}

/// Plan an edit of record `id`.
pub fn plan_update(id: RecordId, local_ids: &BTreeSet<RecordId>) -> WritePlan {
    if local_ids.contains(&id) {
        WritePlan::MigrateLocal { id }
    } else {
        WritePlan::UpdateRemote { id }
    }
}

/// Plan a delete of record `id`.
pub fn plan_delete(id: RecordId, local_ids: &BTreeSet<RecordId>) -> WritePlan {
    if local_ids.contains(&id) {
        WritePlan::DeleteLocal { id }
    } else {
        WritePlan::DeleteRemote { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_of_local_record_migrates() {
        let local = BTreeSet::from([2, 3]);
        assert_eq!(plan_update(2, &local), WritePlan::MigrateLocal { id: 2 });
        assert_eq!(plan_update(1, &local), WritePlan::UpdateRemote { id: 1 });
    }

    #[test]
    fn delete_of_local_record_stays_offline() {
        let local = BTreeSet::from([2]);
        let plan = plan_delete(2, &local);
        assert_eq!(plan, WritePlan::DeleteLocal { id: 2 });
        assert!(!plan.needs_network());

        let plan = plan_delete(1, &local);
        assert_eq!(plan, WritePlan::DeleteRemote { id: 1 });
        assert!(plan.needs_network());
        assert_eq!(plan.id(), 1);
    }

    #[test]
    fn plan_serialization_format() {
        let json = serde_json::to_string(&WritePlan::MigrateLocal { id: 4 }).unwrap();
        assert_eq!(json, r#"{"type":"migrateLocal","id":4}"#);
    }
}
