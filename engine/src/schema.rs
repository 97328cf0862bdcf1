//! Schema definition and validation.
//!
//! Every entity type the console manages has an [`EntitySchema`] describing
//! its fields, their types and defaults, and how each field is named on the
//! wire. The same schema validates form input before a request is made and
//! normalizes the records the server sends back.

use crate::{error::Result, EntityName, Error, FieldName, Fields, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    /// Boolean in the console, `0`/`1` on the wire
    Flag,
}

impl FieldType {
    /// Value used when a field is absent and declares no default of its own.
    pub fn default_value(self) -> Value {
        match self {
            FieldType::String => Value::String(String::new()),
            FieldType::Int => Value::from(0),
            FieldType::Float => Value::from(0.0),
            FieldType::Bool | FieldType::Flag => Value::Bool(false),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Flag => write!(f, "Flag"),
        }
    }
}

/// Definition of a field in an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name used by forms and local storage
    pub name: FieldName,
    /// Field name used in request and response bodies
    pub wire_name: String,
    /// Field type
    pub field_type: FieldType,
    /// Whether this field is required
    pub required: bool,
    /// Explicit default, overriding the type default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            field_type,
            required: true,
            default: None,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, field_type)
        }
    }

    /// Use a different name for this field on the wire.
    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Set the value used when the field is absent.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// The value this field takes when absent from both sources.
    pub fn fallback(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.default_value())
    }

    /// Validate a JSON value against this field definition.
    pub fn validate(&self, value: Option<&Value>) -> Result<()> {
        match value {
            None | Some(Value::Null) if self.required => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(s)) if self.required && s.trim().is_empty() => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            Some(v) => self.validate_type(v),
        }
    }

    fn validate_type(&self, value: &Value) -> Result<()> {
        let valid = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool | FieldType::Flag => value.is_boolean(),
        };

        if valid {
            Ok(())
        } else {
            Err(self.mismatch(value))
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::TypeMismatch {
            field: self.name.clone(),
            expected: self.field_type.to_string(),
            got: json_type_name(value).to_string(),
        }
    }

    /// Normalize a value received from the server.
    ///
    /// Servers are inconsistent about numeric strings and boolean encodings,
    /// so this accepts any unambiguous spelling of the declared type.
    pub fn from_wire(&self, value: Option<&Value>) -> Result<Value> {
        let value = match value {
            None | Some(Value::Null) => return Ok(self.fallback()),
            Some(v) => v,
        };

        let coerced = match (self.field_type, value) {
            (FieldType::String, Value::String(_)) => Some(value.clone()),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::Int, Value::Number(n)) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                        .map(|f| f as i64)
                })
                .map(Value::from),
            (FieldType::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (FieldType::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (FieldType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            (FieldType::Bool | FieldType::Flag, v) => coerce_bool(v).map(Value::Bool),
            _ => None,
        };

        coerced.ok_or_else(|| self.mismatch(value))
    }

    /// Encode a validated value for a request body.
    pub fn to_wire(&self, value: &Value) -> Value {
        match (self.field_type, value) {
            (FieldType::Flag, Value::Bool(b)) => Value::from(u8::from(*b)),
            _ => value.clone(),
        }
    }

    /// Parse text typed into a form.
    ///
    /// Blank input for an optional field yields its default; blank input for
    /// a required non-string field yields null so validation reports it.
    pub fn parse_input(&self, text: &str) -> Result<Value> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Ok(match self.field_type {
                FieldType::String => Value::String(String::new()),
                _ if self.required => Value::Null,
                _ => self.fallback(),
            });
        }

        match self.field_type {
            FieldType::String => Ok(Value::String(text.to_string())),
            FieldType::Int => trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| self.invalid_input("expected a whole number")),
            FieldType::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(|| self.invalid_input("expected a number")),
            FieldType::Bool | FieldType::Flag => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "n" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(self.invalid_input("expected yes or no")),
            },
        }
    }

    fn invalid_input(&self, reason: &str) -> Error {
        Error::InvalidInput {
            field: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn parse_id(value: Option<&Value>) -> Option<RecordId> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Schema for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Entity name, also the local storage key
    pub name: EntityName,
    /// Path segment under the API base address
    pub endpoint: String,
    /// Wire name of the identifier field
    pub id_field: String,
    /// Fields the list screen filter matches against
    pub search_fields: Vec<FieldName>,
    /// Field definitions
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Create a new entity schema.
    ///
    /// The endpoint defaults to the entity name, the id field to `id`, and
    /// the first field is searched.
    pub fn new(name: impl Into<EntityName>, fields: Vec<FieldDef>) -> Self {
        let name = name.into();
        let search_fields = fields.iter().take(1).map(|f| f.name.clone()).collect();
        Self {
            endpoint: name.clone(),
            name,
            id_field: "id".to_string(),
            search_fields,
            fields,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a field definition, failing for names the entity doesn't have.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// Validate form fields against this schema.
    pub fn validate_fields(&self, fields: &Fields) -> Result<()> {
        for name in fields.keys() {
            self.require_field(name)?;
        }

        for field in &self.fields {
            field.validate(fields.get(&field.name))?;
        }

        Ok(())
    }

    /// Fill every schema field, defaulting those that are absent or null.
    pub fn with_defaults(&self, fields: &Fields) -> Fields {
        self.fields
            .iter()
            .map(|def| {
                let value = match fields.get(&def.name) {
                    Some(v) if !v.is_null() => v.clone(),
                    _ => def.fallback(),
                };
                (def.name.clone(), value)
            })
            .collect()
    }

    /// Translate form fields into a request body.
    pub fn fields_to_wire(&self, fields: &Fields) -> Value {
        let body: Fields = self
            .fields
            .iter()
            .filter_map(|def| {
                fields
                    .get(&def.name)
                    .map(|v| (def.wire_name.clone(), def.to_wire(v)))
            })
            .collect();
        Value::Object(body)
    }

    /// Normalize a record as the server sends it.
    pub fn record_from_wire(&self, raw: &Value) -> Result<Record> {
        let obj = raw.as_object().ok_or_else(|| {
            Error::InvalidRecord(format!("{} record must be an object", self.name))
        })?;

        let id = parse_id(obj.get(&self.id_field)).ok_or_else(|| {
            Error::InvalidRecord(format!(
                "{} record has a missing or invalid '{}'",
                self.name, self.id_field
            ))
        })?;

        let mut fields = Fields::new();
        for def in &self.fields {
            fields.insert(def.name.clone(), def.from_wire(obj.get(&def.wire_name))?);
        }

        Ok(Record::new_remote(id, fields))
    }

    /// Build the record a write produced.
    ///
    /// The response overlays the body that was sent, so servers that only
    /// echo the new identifier still yield a complete record. A
    /// `{"data": {...}}` envelope is unwrapped. `known_id` supplies the id
    /// for updates whose response omits it.
    pub fn record_from_response(
        &self,
        sent: &Value,
        response: &Value,
        known_id: Option<RecordId>,
    ) -> Result<Record> {
        let mut merged = sent.as_object().cloned().unwrap_or_default();
        if let Some(id) = known_id {
            merged.insert(self.id_field.clone(), Value::from(id));
        }

        if let Value::Object(obj) = response {
            let body = match obj.get("data") {
                Some(Value::Object(inner)) => inner,
                _ => obj,
            };
            for (key, value) in body {
                merged.insert(key.clone(), value.clone());
            }
        }

        self.record_from_wire(&Value::Object(merged))
    }
}

/// Registry of every entity schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Entity schemas by name
    pub entities: BTreeMap<EntityName, EntitySchema>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity to the schema.
    pub fn add_entity(&mut self, entity: EntitySchema) -> &mut Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Builder-style method to add an entity.
    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.add_entity(entity);
        self
    }

    /// Get an entity schema by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// Get an entity schema, failing for unknown names.
    pub fn entity(&self, name: &str) -> Result<&EntitySchema> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Entity names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;
    use serde_json::json;

    fn clinics() -> EntitySchema {
        EntitySchema::new(
            "clinics",
            vec![
                FieldDef::required("name", FieldType::String).wire("CLINIC_NAME"),
                FieldDef::optional("rooms", FieldType::Int).wire("ROOM_COUNT"),
                FieldDef::optional("active", FieldType::Flag)
                    .wire("IS_ACTIVE")
                    .default_value(json!(true)),
            ],
        )
        .with_id_field("CLINIC_ID")
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn validate_valid_fields() {
        let schema = clinics();
        assert!(schema.validate_fields(&fields(json!({"name": "Main"}))).is_ok());
        assert!(schema
            .validate_fields(&fields(json!({"name": "Main", "rooms": 4, "active": false})))
            .is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let schema = clinics();
        let result = schema.validate_fields(&fields(json!({"rooms": 4})));
        assert!(matches!(result, Err(Error::MissingRequiredField(f)) if f == "name"));
    }

    #[test]
    fn validate_blank_required_string() {
        let schema = clinics();
        let result = schema.validate_fields(&fields(json!({"name": "   "})));
        assert!(matches!(result, Err(Error::MissingRequiredField(f)) if f == "name"));
    }

    #[test]
    fn validate_wrong_type() {
        let schema = clinics();
        let result = schema.validate_fields(&fields(json!({"name": "Main", "rooms": "four"})));
        assert!(matches!(result, Err(Error::TypeMismatch { field, .. }) if field == "rooms"));
    }

    #[test]
    fn validate_unknown_field() {
        let schema = clinics();
        let result = schema.validate_fields(&fields(json!({"name": "Main", "color": "red"})));
        assert!(matches!(result, Err(Error::UnknownField { field, .. }) if field == "color"));
    }

    #[test]
    fn with_defaults_fills_absent_fields() {
        let schema = clinics();
        let filled = schema.with_defaults(&fields(json!({"name": "Main", "rooms": null})));
        assert_eq!(
            Value::Object(filled),
            json!({"name": "Main", "rooms": 0, "active": true})
        );
    }

    #[test]
    fn record_from_wire_normalizes_flags_and_names() {
        let schema = clinics();
        let record = schema
            .record_from_wire(&json!({
                "CLINIC_ID": 7,
                "CLINIC_NAME": "Main",
                "ROOM_COUNT": "12",
                "IS_ACTIVE": 0,
                "UNRELATED": "dropped"
            }))
            .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.origin, Origin::Remote);
        assert_eq!(
            Value::Object(record.fields),
            json!({"name": "Main", "rooms": 12, "active": false})
        );
    }

    #[test]
    fn record_from_wire_defaults_missing_fields() {
        let schema = clinics();
        let record = schema
            .record_from_wire(&json!({"CLINIC_ID": "3", "CLINIC_NAME": "Annex"}))
            .unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.fields["rooms"], json!(0));
        assert_eq!(record.fields["active"], json!(true));
    }

    #[test]
    fn record_from_wire_rejects_missing_id() {
        let schema = clinics();
        let result = schema.record_from_wire(&json!({"CLINIC_NAME": "Main"}));
        assert!(matches!(result, Err(Error::InvalidRecord(_))));

        let result = schema.record_from_wire(&json!(["not", "an", "object"]));
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn record_from_wire_rejects_ambiguous_flag() {
        let schema = clinics();
        let result =
            schema.record_from_wire(&json!({"CLINIC_ID": 1, "CLINIC_NAME": "Main", "IS_ACTIVE": 7}));
        assert!(matches!(result, Err(Error::TypeMismatch { field, .. }) if field == "active"));
    }

    #[test]
    fn record_from_wire_rejects_out_of_range_int() {
        let schema = clinics();
        let result =
            schema.record_from_wire(&json!({"CLINIC_ID": 1, "CLINIC_NAME": "Main", "ROOM_COUNT": 1e20}));
        assert!(matches!(result, Err(Error::TypeMismatch { field, .. }) if field == "rooms"));

        let record = schema
            .record_from_wire(&json!({"CLINIC_ID": 1, "CLINIC_NAME": "Main", "ROOM_COUNT": 4.0}))
            .unwrap();
        assert_eq!(record.fields["rooms"], json!(4));
    }

    #[test]
    fn fields_to_wire_encodes_flags() {
        let schema = clinics();
        let body = schema.fields_to_wire(&fields(json!({"name": "Main", "active": true})));
        assert_eq!(body, json!({"CLINIC_NAME": "Main", "IS_ACTIVE": 1}));
    }

    #[test]
    fn record_from_partial_response() {
        let schema = clinics();
        let sent = json!({"CLINIC_NAME": "Main", "ROOM_COUNT": 2, "IS_ACTIVE": 1});

        let record = schema
            .record_from_response(&sent, &json!({"CLINIC_ID": 5}), None)
            .unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.fields["name"], json!("Main"));

        let record = schema
            .record_from_response(&sent, &json!({"data": {"CLINIC_ID": 6, "ROOM_COUNT": 3}}), None)
            .unwrap();
        assert_eq!(record.id, 6);
        assert_eq!(record.fields["rooms"], json!(3));
    }

    #[test]
    fn record_from_empty_update_response_uses_known_id() {
        let schema = clinics();
        let sent = json!({"CLINIC_NAME": "Renamed"});
        let record = schema
            .record_from_response(&sent, &Value::Null, Some(9))
            .unwrap();
        assert_eq!(record.id, 9);
        assert_eq!(record.fields["name"], json!("Renamed"));
    }

    #[test]
    fn parse_input_by_type() {
        let schema = clinics();
        let rooms = schema.field("rooms").unwrap();
        let active = schema.field("active").unwrap();
        let name = schema.field("name").unwrap();

        assert_eq!(rooms.parse_input(" 12 ").unwrap(), json!(12));
        assert_eq!(rooms.parse_input("").unwrap(), json!(0));
        assert!(matches!(
            rooms.parse_input("twelve"),
            Err(Error::InvalidInput { field, .. }) if field == "rooms"
        ));

        assert_eq!(active.parse_input("Yes").unwrap(), json!(true));
        assert_eq!(active.parse_input("off").unwrap(), json!(false));
        assert_eq!(active.parse_input("").unwrap(), json!(true));
        assert!(active.parse_input("maybe").is_err());

        assert_eq!(name.parse_input("North Clinic").unwrap(), json!("North Clinic"));
    }

    #[test]
    fn required_non_string_blank_input_is_null() {
        let field = FieldDef::required("npi", FieldType::Int);
        assert_eq!(field.parse_input("  ").unwrap(), Value::Null);
        assert!(field.validate(Some(&Value::Null)).is_err());
    }

    #[test]
    fn unknown_entity() {
        let schema = Schema::new().with_entity(clinics());
        assert!(schema.entity("clinics").is_ok());
        assert!(matches!(schema.entity("rooms"), Err(Error::UnknownEntity(e)) if e == "rooms"));
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["clinics"]);
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::String.to_string(), "String");
        assert_eq!(FieldType::Flag.to_string(), "Flag");
    }
}
