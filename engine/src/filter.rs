//! List filtering.

use crate::{EntitySchema, Record};

/// Case-insensitive substring match of `needle` against the given fields.
///
/// An empty (or all-whitespace) needle matches every record. Non-string
/// values are matched on their display text.
pub fn matches_filter(record: &Record, fields: &[String], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    fields
        .iter()
        .any(|field| record.display(field).to_lowercase().contains(&needle))
}

/// Records whose search fields match `needle`, in their original order.
pub fn filter_records<'a>(
    records: &'a [Record],
    schema: &EntitySchema,
    needle: &str,
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| matches_filter(r, &schema.search_fields, needle))
        .collect()
}
