//! List screen and form modal state.
//!
//! These hold what a presentation layer renders: the filter, the page
//! banner, and the modal's field values and messages. All record handling
//! goes through an [`EntityReconciler`].

use crate::error::ConsoleError;
use crate::reconciler::{EntityReconciler, WriteOutcome};
use crate::remote::RemoteStore;
use practice_engine::{filter_records, EntitySchema, Fields, KeyValueStorage, Record, RecordId};

/// Banner shown while records come from local storage only.
pub const OFFLINE_BANNER: &str = "Working offline. Showing records saved on this device.";

/// Notice shown after a write was kept locally.
pub const SAVED_LOCALLY_NOTICE: &str =
    "The server could not be reached. The record was saved on this device and will be submitted later.";

/// State of an entity list page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListScreen {
    /// Case-insensitive substring matched against the entity's search fields
    pub filter: String,
    /// Page-level message
    pub banner: Option<String>,
}

impl ListScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Reload the view. Failures become the banner.
    pub async fn refresh<R, S>(&mut self, reconciler: &mut EntityReconciler<R, S>) -> bool
    where
        R: RemoteStore,
        S: KeyValueStorage,
    {
        match reconciler.view().await {
            Ok(_) => {
                self.banner = reconciler.is_offline().then(|| OFFLINE_BANNER.to_string());
                true
            }
            Err(e) => {
                self.show_error(&e);
                false
            }
        }
    }

    /// Records of the current view that match the filter.
    pub fn visible<'a, R, S>(&self, reconciler: &'a EntityReconciler<R, S>) -> Vec<&'a Record>
    where
        R: RemoteStore,
        S: KeyValueStorage,
    {
        filter_records(reconciler.current(), reconciler.schema(), &self.filter)
    }

    /// Delete a record. Failures become the banner and leave the list as is.
    pub async fn delete<R, S>(&mut self, reconciler: &mut EntityReconciler<R, S>, id: RecordId) -> bool
    where
        R: RemoteStore,
        S: KeyValueStorage,
    {
        match reconciler.delete(id).await {
            Ok(()) => {
                self.banner = None;
                true
            }
            Err(e) => {
                self.show_error(&e);
                false
            }
        }
    }

    fn show_error(&mut self, error: &ConsoleError) {
        self.banner = Some(error.user_message());
    }
}

/// What submitting the form does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RecordId),
}

/// State of the create/edit modal.
#[derive(Debug, Clone, PartialEq)]
pub struct FormModal {
    pub mode: FormMode,
    pub fields: Fields,
    pub open: bool,
    /// Inline error shown in the modal
    pub error: Option<String>,
    /// Message left after the modal closes
    pub notice: Option<String>,
}

impl Default for FormModal {
    fn default() -> Self {
        Self {
            mode: FormMode::Create,
            fields: Fields::new(),
            open: false,
            error: None,
            notice: None,
        }
    }
}

impl FormModal {
    /// Open an empty form with every field at its default.
    pub fn open_create(schema: &EntitySchema) -> Self {
        Self {
            fields: schema.with_defaults(&Fields::new()),
            open: true,
            ..Self::default()
        }
    }

    /// Open a form pre-filled from a record.
    pub fn open_edit(record: &Record) -> Self {
        Self {
            mode: FormMode::Edit(record.id),
            fields: record.fields.clone(),
            open: true,
            ..Self::default()
        }
    }

    /// Open an empty edit form for a record that is not in the view.
    ///
    /// Only the fields that get set are sent.
    pub fn open_edit_by_id(id: RecordId) -> Self {
        Self {
            mode: FormMode::Edit(id),
            open: true,
            ..Self::default()
        }
    }

    /// Set a field from typed text. Parse errors are shown inline.
    pub fn set_input(&mut self, schema: &EntitySchema, field: &str, text: &str) -> bool {
        match schema
            .require_field(field)
            .and_then(|def| def.parse_input(text))
        {
            Ok(value) => {
                self.fields.insert(field.to_string(), value);
                self.error = None;
                true
            }
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }

    /// Submit the form.
    ///
    /// Invalid fields block submission without a request: every field when
    /// creating, the fields present when editing. On success the modal
    /// closes; on failure it stays open with the error.
    pub async fn submit<R, S>(
        &mut self,
        reconciler: &mut EntityReconciler<R, S>,
    ) -> Option<WriteOutcome>
    where
        R: RemoteStore,
        S: KeyValueStorage,
    {
        let schema = reconciler.schema();
        let checked = match self.mode {
            FormMode::Create => schema.validate_fields(&self.fields),
            FormMode::Edit(_) => self
                .fields
                .iter()
                .try_for_each(|(name, value)| schema.require_field(name)?.validate(Some(value))),
        };
        if let Err(e) = checked {
            self.error = Some(e.to_string());
            return None;
        }

        let fields = self.fields.clone();
        let result = match self.mode {
            FormMode::Create => reconciler.create(fields).await,
            FormMode::Edit(id) => reconciler.update(id, fields).await,
        };

        match result {
            Ok(outcome) => {
                self.open = false;
                self.error = None;
                self.notice = outcome
                    .is_local()
                    .then(|| SAVED_LOCALLY_NOTICE.to_string());
                Some(outcome)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_engine::practice_schema;
    use serde_json::json;

    #[test]
    fn open_create_fills_defaults() {
        let schema = practice_schema();
        let locations = schema.entity("locations").unwrap();
        let modal = FormModal::open_create(locations);

        assert!(modal.open);
        assert_eq!(modal.mode, FormMode::Create);
        assert_eq!(modal.fields["active"], json!(true));
        assert_eq!(modal.fields["name"], json!(""));
    }

    #[test]
    fn open_edit_copies_record() {
        let fields = json!({"name": "Main"}).as_object().cloned().unwrap();
        let modal = FormModal::open_edit(&Record::new_remote(4, fields));
        assert_eq!(modal.mode, FormMode::Edit(4));
        assert_eq!(modal.fields["name"], json!("Main"));
    }

    #[test]
    fn open_edit_by_id_starts_empty() {
        let modal = FormModal::open_edit_by_id(9);
        assert!(modal.open);
        assert_eq!(modal.mode, FormMode::Edit(9));
        assert!(modal.fields.is_empty());
    }

    #[test]
    fn set_input_parses_by_type() {
        let schema = practice_schema();
        let locations = schema.entity("locations").unwrap();
        let mut modal = FormModal::open_create(locations);

        assert!(modal.set_input(locations, "active", "no"));
        assert_eq!(modal.fields["active"], json!(false));

        assert!(!modal.set_input(locations, "active", "sometimes"));
        assert!(modal.error.is_some());

        assert!(modal.set_input(locations, "name", "Annex"));
        assert_eq!(modal.error, None);

        assert!(!modal.set_input(locations, "colour", "red"));
    }
}
