//! Reconstructs a response tree from the store, driven by a pull pattern.
//!
//! Missing fields are skipped rather than failing, so a present root with
//! absent fields reads back as a partial tree; a link to an entity the
//! store doesn't hold reads back as null. Typename namespaces on
//! stored keys are stripped on the way out; a requested `__typename` leaf
//! is synthesized from the namespace when the record doesn't carry the
//! field itself.

use crate::{
    error::StoreError,
    store::{
        data::{EntityRecord, EntityRef, FieldValue, StoreData},
        store::StoreConfig
    },
    walk::FieldSelection
};
use serde_json::{Map, Value};

pub(crate) fn pull(
    data: &StoreData,
    config: &StoreConfig,
    pattern: &[FieldSelection],
    entity: &EntityRef
) -> Result<Option<Map<String, Value>>, StoreError> {
    let record = match data.get(entity) {
        Some(record) => record,
        None => return Ok(None)
    };
    pull_record(data, config, record, pattern).map(Some)
}

pub(crate) fn pull_record(
    data: &StoreData,
    config: &StoreConfig,
    record: &EntityRecord,
    pattern: &[FieldSelection]
) -> Result<Map<String, Value>, StoreError> {
    let mut out = Map::new();
    for selection in pattern {
        let out_key = selection.response_key().to_string();
        let field = lookup(record, &selection.field_key);

        if selection.is_leaf() {
            match field {
                Some(FieldValue::Scalar(value)) => {
                    out.insert(out_key, value.clone());
                }
                Some(FieldValue::Object(map)) => {
                    out.insert(out_key, Value::Object(map.clone()));
                }
                Some(FieldValue::ScalarList(items)) => {
                    out.insert(out_key, Value::Array(items.clone()));
                }
                // A link requested without a sub-selection reads as missing.
                Some(_) => {}
                None if selection.name == "__typename" => {
                    if let Some(typename) = record_typename(record) {
                        out.insert(out_key, Value::String(typename.to_string()));
                    }
                }
                None => {}
            }
            continue;
        }

        match field {
            Some(FieldValue::Ref(entity)) => {
                let value = match pull(data, config, &selection.children, entity)? {
                    Some(sub) => Value::Object(sub),
                    None => Value::Null
                };
                out.insert(out_key, value);
            }
            Some(FieldValue::RefList(entities)) => {
                let mut items = Vec::with_capacity(entities.len());
                for entity in entities {
                    items.push(match pull(data, config, &selection.children, entity)? {
                        Some(sub) => Value::Object(sub),
                        None => Value::Null
                    });
                }
                out.insert(out_key, Value::Array(items));
            }
            Some(FieldValue::RefMap(links)) => {
                let mut object = Map::new();
                for (name, entity) in links {
                    object.insert(
                        name.clone(),
                        match pull(data, config, &selection.children, entity)? {
                            Some(sub) => Value::Object(sub),
                            None => Value::Null
                        }
                    );
                }
                out.insert(out_key, Value::Object(object));
            }
            Some(FieldValue::Scalar(Value::Null)) => {
                out.insert(out_key, Value::Null);
            }
            Some(_) => return Err(StoreError::PullNotRef(selection.field_key.clone())),
            None => {}
        }
    }
    Ok(out)
}

fn lookup<'r>(record: &'r EntityRecord, key: &str) -> Option<&'r FieldValue> {
    record.get(key).or_else(|| {
        record.iter().find_map(|(stored, value)| {
            match split_namespace(stored) {
                Some((_, field)) if field == key => Some(value),
                _ => None
            }
        })
    })
}

fn record_typename(record: &EntityRecord) -> Option<&str> {
    record
        .keys()
        .find_map(|key| split_namespace(key).map(|(typename, _)| typename))
}

/// Split a stored key into its typename namespace and field key. Only a
/// leading GraphQL name counts as a namespace, so argument text containing
/// a slash never parses as one.
fn split_namespace(key: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = key.split_once('/')?;
    let mut chars = prefix.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((prefix, rest))
}
