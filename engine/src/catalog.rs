//! Built-in entity types of the practice console.
//!
//! Locations are served by an older endpoint that uses upper-snake field
//! names and sends its active flag as `0`/`1`; every other entity uses
//! camelCase names and plain booleans.

use crate::{EntitySchema, FieldDef, FieldType, Schema};
use serde_json::json;

/// Schema with every entity the console manages.
pub fn practice_schema() -> Schema {
    Schema::new()
        .with_entity(organizations())
        .with_entity(businesses())
        .with_entity(locations())
        .with_entity(providers())
        .with_entity(insurances())
        .with_entity(users())
}

pub fn organizations() -> EntitySchema {
    EntitySchema::new(
        "organizations",
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::optional("domain", FieldType::String),
            FieldDef::optional("phone", FieldType::String),
            FieldDef::optional("active", FieldType::Bool).default_value(json!(true)),
        ],
    )
    .with_search_fields(&["name", "domain"])
}

pub fn businesses() -> EntitySchema {
    EntitySchema::new(
        "businesses",
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::optional("taxId", FieldType::String),
            FieldDef::optional("organizationId", FieldType::Int),
            FieldDef::optional("address", FieldType::String),
            FieldDef::optional("phone", FieldType::String),
            FieldDef::optional("email", FieldType::String),
            FieldDef::optional("active", FieldType::Bool).default_value(json!(true)),
        ],
    )
    .with_search_fields(&["name", "email"])
}

pub fn locations() -> EntitySchema {
    EntitySchema::new(
        "locations",
        vec![
            FieldDef::required("name", FieldType::String).wire("LOCATION_NAME"),
            FieldDef::optional("businessId", FieldType::Int).wire("BUSINESS_ID"),
            FieldDef::optional("address", FieldType::String).wire("ADDRESS"),
            FieldDef::optional("city", FieldType::String).wire("CITY"),
            FieldDef::optional("state", FieldType::String).wire("STATE"),
            FieldDef::optional("zip", FieldType::String).wire("ZIP_CODE"),
            FieldDef::optional("phone", FieldType::String).wire("PHONE"),
            FieldDef::optional("active", FieldType::Flag)
                .wire("IS_ACTIVE")
                .default_value(json!(true)),
        ],
    )
    .with_id_field("LOCATION_ID")
    .with_search_fields(&["name", "city"])
}

pub fn providers() -> EntitySchema {
    EntitySchema::new(
        "providers",
        vec![
            FieldDef::required("firstName", FieldType::String),
            FieldDef::required("lastName", FieldType::String),
            FieldDef::optional("npi", FieldType::String),
            FieldDef::optional("specialty", FieldType::String),
            FieldDef::optional("email", FieldType::String),
            FieldDef::optional("phone", FieldType::String),
            FieldDef::optional("locationId", FieldType::Int),
            FieldDef::optional("active", FieldType::Bool).default_value(json!(true)),
        ],
    )
    .with_search_fields(&["firstName", "lastName"])
}

pub fn insurances() -> EntitySchema {
    EntitySchema::new(
        "insurances",
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::optional("payerId", FieldType::String),
            FieldDef::optional("planType", FieldType::String),
            FieldDef::optional("phone", FieldType::String),
            FieldDef::optional("active", FieldType::Bool).default_value(json!(true)),
        ],
    )
    .with_search_fields(&["name", "payerId"])
}

pub fn users() -> EntitySchema {
    EntitySchema::new(
        "users",
        vec![
            FieldDef::required("email", FieldType::String),
            FieldDef::optional("firstName", FieldType::String),
            FieldDef::optional("lastName", FieldType::String),
            FieldDef::optional("role", FieldType::String).default_value(json!("staff")),
            FieldDef::optional("active", FieldType::Bool).default_value(json!(true)),
        ],
    )
    .with_search_fields(&["email", "lastName"])
}
