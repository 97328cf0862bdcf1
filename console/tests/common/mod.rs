//! Shared helpers for console integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use practice_console::{EntityReconciler, RemoteError, RemoteStore};
use practice_engine::{
    practice_schema, Fields, LocalFallbackStore, MemoryStorage, RecordId, RetryPolicy,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// In-memory backend that can be taken offline.
#[derive(Debug, Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    online: bool,
    records: BTreeMap<String, Vec<Value>>,
    id_fields: BTreeMap<String, String>,
    next_id: RecordId,
    failures: VecDeque<Option<RemoteError>>,
    requests: usize,
    bare_acks: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            online: true,
            records: BTreeMap::new(),
            id_fields: BTreeMap::new(),
            next_id: 1,
            failures: VecDeque::new(),
            requests: 0,
            bare_acks: false,
        }
    }
}

impl State {
    fn id_field(&self, endpoint: &str) -> String {
        self.id_fields
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| "id".to_string())
    }

    /// Count a request and decide whether it fails.
    fn begin(&mut self) -> Result<(), RemoteError> {
        self.requests += 1;
        if let Some(Some(err)) = self.failures.pop_front() {
            return Err(err);
        }
        if !self.online {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

impl FakeRemote {
    /// A backend that knows every entity of the practice schema.
    pub fn new() -> Arc<Self> {
        let remote = Self::default();
        {
            let mut state = remote.state.lock().unwrap();
            for entity in practice_schema().entities.values() {
                state
                    .id_fields
                    .insert(entity.endpoint.clone(), entity.id_field.clone());
            }
        }
        Arc::new(remote)
    }

    pub fn set_online(&self, online: bool) {
        self.state.lock().unwrap().online = online;
    }

    /// Id the next created record receives.
    pub fn set_next_id(&self, id: RecordId) {
        self.state.lock().unwrap().next_id = id;
    }

    /// Make the next request fail with `err`, whatever its kind.
    pub fn fail_next(&self, err: RemoteError) {
        self.state.lock().unwrap().failures.push_back(Some(err));
    }

    /// Let the next request through, so a queued failure hits the one after.
    pub fn pass_next(&self) {
        self.state.lock().unwrap().failures.push_back(None);
    }

    /// Answer creates with a message instead of the stored record.
    pub fn acknowledge_without_record(&self, on: bool) {
        self.state.lock().unwrap().bare_acks = on;
    }

    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    /// Store a record as the server has it.
    pub fn seed(&self, endpoint: &str, record: Value) {
        let mut state = self.state.lock().unwrap();
        let id_field = state.id_field(endpoint);
        if let Some(id) = record.get(&id_field).and_then(Value::as_i64) {
            state.next_id = state.next_id.max(id + 1);
        }
        state
            .records
            .entry(endpoint.to_string())
            .or_default()
            .push(record);
    }

    /// Remove a record behind the client's back.
    pub fn forget(&self, endpoint: &str, id: RecordId) {
        let mut state = self.state.lock().unwrap();
        let id_field = state.id_field(endpoint);
        if let Some(records) = state.records.get_mut(endpoint) {
            records.retain(|r| r.get(&id_field).and_then(Value::as_i64) != Some(id));
        }
    }

    pub fn records(&self, endpoint: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.begin()?;
        Ok(state.records.get(endpoint).cloned().unwrap_or_default())
    }

    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.begin()?;

        let id = state.next_id;
        state.next_id += 1;
        let id_field = state.id_field(endpoint);

        let mut record = body.clone();
        record[id_field.as_str()] = json!(id);
        state
            .records
            .entry(endpoint.to_string())
            .or_default()
            .push(record.clone());

        if state.bare_acks {
            return Ok(json!({"message": "Record created"}));
        }
        Ok(record)
    }

    async fn update(
        &self,
        endpoint: &str,
        id: RecordId,
        body: &Value,
    ) -> Result<Value, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.begin()?;

        let id_field = state.id_field(endpoint);
        let record = state
            .records
            .get_mut(endpoint)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get(&id_field).and_then(Value::as_i64) == Some(id))
            })
            .ok_or_else(|| RemoteError::Server {
                status: 404,
                body: json!({"message": "Not found"}).to_string(),
            })?;

        if let (Some(target), Some(edits)) = (record.as_object_mut(), body.as_object()) {
            for (key, value) in edits {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<bool, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.begin()?;

        let id_field = state.id_field(endpoint);
        let records = state.records.entry(endpoint.to_string()).or_default();
        let before = records.len();
        records.retain(|r| r.get(&id_field).and_then(Value::as_i64) != Some(id));
        Ok(records.len() < before)
    }
}

pub type TestReconciler = EntityReconciler<Arc<FakeRemote>, MemoryStorage>;

/// Reconciler for `entity` over `remote` with empty local storage.
pub fn reconciler(remote: &Arc<FakeRemote>, entity: &str) -> TestReconciler {
    reconciler_with(remote, entity, MemoryStorage::new(), RetryPolicy::default())
}

pub fn reconciler_with(
    remote: &Arc<FakeRemote>,
    entity: &str,
    storage: MemoryStorage,
    policy: RetryPolicy,
) -> TestReconciler {
    let schema = practice_schema().entity(entity).unwrap().clone();
    EntityReconciler::new(schema, remote.clone(), LocalFallbackStore::new(storage), policy)
}

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

/// Seed a location the way the backend stores it.
pub fn seed_location(remote: &FakeRemote, id: RecordId, name: &str) {
    remote.seed(
        "locations",
        json!({"LOCATION_ID": id, "LOCATION_NAME": name, "CITY": "Salem", "IS_ACTIVE": 1}),
    );
}

pub fn server_error(status: u16, body: Value) -> RemoteError {
    RemoteError::Server {
        status,
        body: body.to_string(),
    }
}
