//! Per-entity mediator between the backend and local fallback storage.
//!
//! An [`EntityReconciler`] owns the in-memory view of one entity type and
//! carries out every create, update and delete against it. Writes that
//! cannot reach the server are kept in local storage according to the
//! [`RetryPolicy`], and records kept that way are re-submitted as creates
//! the next time they are edited or when [`migrate_pending`] runs.
//!
//! Local storage is only read and written between awaits, never across one.
//!
//! [`migrate_pending`]: EntityReconciler::migrate_pending

use crate::error::{ConsoleError, Result};
use crate::remote::{RemoteError, RemoteStore};
use practice_engine::{
    is_legacy_local_id, next_local_id, plan_delete, plan_update, reconcile, EntitySchema, Error,
    Fields, KeyValueStorage, LocalFallbackStore, Record, RecordId, RetryPolicy, WritePlan,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Where a successful write landed.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The server accepted the write
    Remote(Record),
    /// The server could not take the write; it is kept locally
    Local { record: Record, cause: RemoteError },
}

impl WriteOutcome {
    pub fn record(&self) -> &Record {
        match self {
            WriteOutcome::Remote(record) | WriteOutcome::Local { record, .. } => record,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            WriteOutcome::Remote(record) | WriteOutcome::Local { record, .. } => record,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, WriteOutcome::Local { .. })
    }
}

/// Result of [`EntityReconciler::migrate_pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// `(local id, server id)` for every record that reached the server
    pub migrated: Vec<(RecordId, RecordId)>,
    /// Ids still kept locally
    pub pending: Vec<RecordId>,
    /// Local ids the server accepted without saying which record it made
    pub unidentified: Vec<RecordId>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Reconciler for one entity type.
pub struct EntityReconciler<R, S> {
    schema: EntitySchema,
    remote: R,
    local: LocalFallbackStore<S>,
    policy: RetryPolicy,
    view: Vec<Record>,
    known_remote_ids: BTreeSet<RecordId>,
    offline: bool,
}

impl<R: RemoteStore, S: KeyValueStorage> EntityReconciler<R, S> {
    pub fn new(
        schema: EntitySchema,
        remote: R,
        local: LocalFallbackStore<S>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            schema,
            remote,
            local,
            policy,
            view: Vec::new(),
            known_remote_ids: BTreeSet::new(),
            offline: false,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn local_store(&self) -> &LocalFallbackStore<S> {
        &self.local
    }

    /// Whether the last [`view`](Self::view) had to do without the server.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// The view as of the last operation, without a request.
    pub fn current(&self) -> &[Record] {
        &self.view
    }

    /// Ids of records that exist only locally.
    pub fn local_ids(&self) -> Result<BTreeSet<RecordId>> {
        Ok(self.local.load_local_ids(&self.schema.name)?)
    }

    /// Fetch the server's records and merge them with local ones.
    ///
    /// When the server is unreachable only local records are shown. Local
    /// records that had to be renumbered are saved under their new ids
    /// before this returns.
    pub async fn view(&mut self) -> Result<&[Record]> {
        let listed = self.remote.list(&self.schema.endpoint).await;

        let remote = match listed {
            Ok(raw) => {
                self.offline = false;
                let records = self.parse_list(raw);
                self.known_remote_ids = records.iter().map(|r| r.id).collect();
                records
            }
            Err(err) if self.policy.falls_back(err.class()) => {
                warn!(
                    entity = %self.schema.name,
                    error = %err,
                    "Server unavailable, showing local records only"
                );
                self.offline = true;
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        self.settle(remote)?;
        debug!(
            entity = %self.schema.name,
            records = self.view.len(),
            offline = self.offline,
            "View refreshed"
        );
        Ok(self.view.as_slice())
    }

    /// Create a record from form fields.
    ///
    /// Fields are validated before any request. A failure the retry policy
    /// deems fallback-worthy stores the record locally under the next
    /// sequential id; any other failure is returned.
    pub async fn create(&mut self, fields: Fields) -> Result<WriteOutcome> {
        self.schema.validate_fields(&fields)?;
        let fields = self.schema.with_defaults(&fields);
        let body = self.schema.fields_to_wire(&fields);

        match self.remote.create(&self.schema.endpoint, &body).await {
            Ok(response) => {
                let record = self.accepted(&body, &response, &fields).await?;
                info!(entity = %self.schema.name, id = record.id, "Created record");
                Ok(WriteOutcome::Remote(record))
            }
            Err(err) if self.policy.falls_back(err.class()) => {
                let id = self.next_local_id()?;
                let record = Record::new_local(id, fields);
                self.local.append(&self.schema.name, record.clone())?;
                warn!(
                    entity = %self.schema.name,
                    id,
                    error = %err,
                    "Create failed, record kept locally"
                );
                self.settle(self.remote_part())?;
                Ok(WriteOutcome::Local { record, cause: err })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Apply edits to a record.
    ///
    /// Editing a record that exists only locally submits it as a create; on
    /// success it leaves local storage and may come back under a new id. If
    /// that submission fails the edit is still saved locally, and the error
    /// is returned unless the policy treats it as fallback-worthy.
    ///
    /// Edits to server records are never kept locally: a failure leaves the
    /// view unchanged and is returned.
    pub async fn update(&mut self, id: RecordId, edits: Fields) -> Result<WriteOutcome> {
        let local_ids = self.local_ids()?;

        match plan_update(id, &local_ids) {
            WritePlan::MigrateLocal { id } => self.migrate(id, edits).await,
            _ => self.update_remote(id, edits).await,
        }
    }

    async fn migrate(&mut self, id: RecordId, edits: Fields) -> Result<WriteOutcome> {
        let existing = self
            .local
            .get(&self.schema.name, id)?
            .ok_or(Error::RecordNotFound(id))?;
        let fields = self.schema.with_defaults(&existing.merged_fields(&edits));
        self.schema.validate_fields(&fields)?;
        let body = self.schema.fields_to_wire(&fields);

        match self.remote.create(&self.schema.endpoint, &body).await {
            Ok(response) => {
                // The server has it now, whatever the response says
                self.local.remove(&self.schema.name, id)?;
                let record = self.accepted(&body, &response, &fields).await?;
                info!(
                    entity = %self.schema.name,
                    local_id = id,
                    id = record.id,
                    "Migrated local record"
                );
                Ok(WriteOutcome::Remote(record))
            }
            Err(err) => {
                let record = Record::new_local(id, fields);
                self.local.replace(&self.schema.name, record.clone())?;
                self.settle(self.remote_part())?;

                if self.policy.falls_back(err.class()) {
                    warn!(
                        entity = %self.schema.name,
                        id,
                        error = %err,
                        "Migration failed, edit kept locally"
                    );
                    Ok(WriteOutcome::Local { record, cause: err })
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn update_remote(&mut self, id: RecordId, edits: Fields) -> Result<WriteOutcome> {
        let fields = match self.view.iter().find(|r| r.id == id && !r.is_local()) {
            Some(current) => {
                let merged = current.merged_fields(&edits);
                self.schema.validate_fields(&merged)?;
                merged
            }
            None => {
                for (name, value) in &edits {
                    self.schema.require_field(name)?.validate(Some(value))?;
                }
                edits
            }
        };
        let body = self.schema.fields_to_wire(&fields);

        let response = self
            .remote
            .update(&self.schema.endpoint, id, &body)
            .await?;
        let record = self.schema.record_from_response(&body, &response, Some(id))?;
        info!(entity = %self.schema.name, id, "Updated record");

        self.known_remote_ids.insert(record.id);
        self.settle_with(record.clone())?;
        Ok(WriteOutcome::Remote(record))
    }

    /// Delete a record.
    ///
    /// A record that exists only locally is removed without a request. For
    /// server records a failure leaves the view unchanged; a server that no
    /// longer has the record counts as success.
    pub async fn delete(&mut self, id: RecordId) -> Result<()> {
        let local_ids = self.local_ids()?;

        match plan_delete(id, &local_ids) {
            WritePlan::DeleteLocal { id } => {
                self.local.remove(&self.schema.name, id)?;
                info!(entity = %self.schema.name, id, "Deleted local record");
                self.settle(self.remote_part())
            }
            _ => {
                let existed = self.remote.delete(&self.schema.endpoint, id).await?;
                if existed {
                    info!(entity = %self.schema.name, id, "Deleted record");
                } else {
                    debug!(entity = %self.schema.name, id, "Record was already gone");
                }
                self.known_remote_ids.remove(&id);
                self.view.retain(|r| r.is_local() || r.id != id);
                Ok(())
            }
        }
    }

    /// Re-submit every local record, lowest id first.
    ///
    /// Stops at the first fallback-worthy failure, since the rest would fail
    /// the same way. Records the server rejects outright stay local and are
    /// skipped.
    pub async fn migrate_pending(&mut self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        let mut attempted = BTreeSet::new();

        // Re-read each round: a migration can renumber the remaining records.
        loop {
            let next = self
                .local_ids()?
                .into_iter()
                .find(|id| !attempted.contains(id));
            let Some(id) = next else { break };
            attempted.insert(id);

            match self.update(id, Fields::new()).await {
                Ok(WriteOutcome::Remote(record)) => report.migrated.push((id, record.id)),
                Ok(WriteOutcome::Local { .. }) => break,
                Err(ConsoleError::Unidentified) => report.unidentified.push(id),
                Err(ConsoleError::Remote(err)) => {
                    warn!(entity = %self.schema.name, id, error = %err, "Server rejected local record");
                }
                Err(err) if err.is_validation() => {
                    warn!(entity = %self.schema.name, id, error = %err, "Local record is invalid");
                }
                Err(err) => return Err(err),
            }
        }

        report.pending = self.local_ids()?.into_iter().collect();
        info!(
            entity = %self.schema.name,
            migrated = report.migrated.len(),
            pending = report.pending.len(),
            "Migration finished"
        );
        Ok(report)
    }

    /// The record a successful create produced.
    ///
    /// When the response doesn't identify it, the server is listed again and
    /// the new record is the one whose id was not known before and whose
    /// fields match, or failing that the only new id.
    async fn accepted(
        &mut self,
        body: &serde_json::Value,
        response: &serde_json::Value,
        fields: &Fields,
    ) -> Result<Record> {
        match self.schema.record_from_response(body, response, None) {
            Ok(record) => {
                self.known_remote_ids.insert(record.id);
                self.settle_with(record.clone())?;
                return Ok(record);
            }
            Err(e) => {
                warn!(entity = %self.schema.name, error = %e, "Create response has no record, listing again");
            }
        }

        let before = std::mem::take(&mut self.known_remote_ids);
        let listed = self.remote.list(&self.schema.endpoint).await;
        let records = match listed {
            Ok(raw) => self.parse_list(raw),
            Err(err) => {
                warn!(entity = %self.schema.name, error = %err, "Could not list after create");
                self.known_remote_ids = before;
                self.settle(self.remote_part())?;
                return Err(ConsoleError::Unidentified);
            }
        };

        let fresh: Vec<&Record> = records.iter().filter(|r| !before.contains(&r.id)).collect();
        let created = fresh
            .iter()
            .filter(|r| r.fields == *fields)
            .max_by_key(|r| r.id)
            .or_else(|| match fresh.as_slice() {
                [only] => Some(only),
                _ => None,
            })
            .map(|r| (*r).clone());

        self.offline = false;
        self.known_remote_ids = records.iter().map(|r| r.id).collect();
        self.settle(records)?;
        created.ok_or(ConsoleError::Unidentified)
    }

    fn parse_list(&self, raw: Vec<serde_json::Value>) -> Vec<Record> {
        raw.iter()
            .filter_map(|item| match self.schema.record_from_wire(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(entity = %self.schema.name, error = %e, "Skipping unreadable server record");
                    None
                }
            })
            .collect()
    }

    fn next_local_id(&self) -> Result<RecordId> {
        let stored = self.local.load_all(&self.schema.name)?;
        let remote_ids: Vec<RecordId> = self
            .view
            .iter()
            .filter(|r| !r.is_local())
            .map(|r| r.id)
            .chain(self.known_remote_ids.iter().copied())
            .collect();
        let remote_high_water = remote_ids.iter().copied().max().unwrap_or(0);

        let local_ids = self
            .view
            .iter()
            .filter(|r| r.is_local())
            .chain(stored.iter())
            .map(|r| r.id)
            .filter(|id| !is_legacy_local_id(*id, remote_high_water));
        Ok(next_local_id(remote_ids.into_iter().chain(local_ids)))
    }

    fn remote_part(&self) -> Vec<Record> {
        self.view.iter().filter(|r| !r.is_local()).cloned().collect()
    }

    /// Rebuild the view with `record` added to, or replacing its entry in,
    /// the server records.
    fn settle_with(&mut self, record: Record) -> Result<()> {
        let mut remote = self.remote_part();
        match remote.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record,
            None => remote.push(record),
        }
        self.settle(remote)
    }

    /// Rebuild the view from server records and local storage, saving any
    /// renumbering back to storage.
    fn settle(&mut self, remote: Vec<Record>) -> Result<()> {
        let name = &self.schema.name;
        let stored = self.local.load_all(name)?;
        let stored_ids = self.local.load_local_ids(name)?;

        let result = reconcile(remote, stored, &self.known_remote_ids);
        if result.is_repaired() || stored_ids != result.local_ids {
            for change in &result.renumbered {
                warn!(entity = %name, from = change.from, to = change.to, "Renumbered local record");
            }
            self.local.replace_all(name, &result.local, &result.local_ids)?;
        }

        self.view = result.view;
        Ok(())
    }
}
