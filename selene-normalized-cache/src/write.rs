//! Merges a server response into the store.
//!
//! The response is first rewritten in place: source keys (alias or field
//! name) become encoded field keys, maps carrying `__typename` have their
//! keys namespaced by it, and maps without an identifying field get a
//! path-derived cache marker. Rewrites run deepest path first so child maps
//! are in storage form before their parents are processed. The rewritten
//! tree is then split into flat entity records and merged key-wise,
//! last writer wins.

use crate::{
    error::StoreError,
    store::{
        data::{EntityRecord, EntityRef, FieldValue, StoreData},
        store::{StoreConfig, ROOT_MARKER}
    },
    walk::{self, FieldSelection}
};
use serde_json::{Map, Value};

pub(crate) fn write_response(
    config: &StoreConfig,
    data: &mut StoreData,
    response: &Value,
    pattern: &[FieldSelection],
    is_query: bool
) -> Result<EntityRecord, StoreError> {
    let object = match response.as_object() {
        Some(object) => object,
        None => return Ok(EntityRecord::default())
    };
    let mut root = Value::Object(object.clone());
    if is_query {
        if let Value::Object(map) = &mut root {
            map.insert(config.cache_key.clone(), Value::String(ROOT_MARKER.to_string()));
        }
    }

    let mut paths = walk::selection_paths(pattern);
    paths.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    for (path, selections) in &paths {
        apply_at_path(&mut root, pattern, path, selections, config)?;
    }

    let mut entities = Vec::new();
    let record = match root {
        Value::Object(map) => normalize_map(&map, config, &mut entities)?,
        _ => EntityRecord::default()
    };
    if is_query {
        entities.push((EntityRef::root(&config.cache_key), record.clone()));
    }
    let count = entities.len();
    for (entity, entity_record) in entities {
        data.merge(entity, entity_record);
    }
    tracing::trace!(entities = count, "normalized response");
    Ok(record)
}

/// Descend to every map at `path` and rewrite its fields. Navigation
/// resolves each path segment through the annotated selections of the
/// enclosing level, so aliased fields are found under their response key.
fn apply_at_path(
    value: &mut Value,
    level: &[FieldSelection],
    path: &[String],
    selections: &[&FieldSelection],
    config: &StoreConfig
) -> Result<(), StoreError> {
    match value {
        Value::Array(items) => {
            for item in items {
                apply_at_path(item, level, path, selections, config)?;
            }
            Ok(())
        }
        Value::Object(map) => match path.split_first() {
            Some((segment, rest)) => {
                for selection in level.iter().filter(|s| &s.name == segment) {
                    if let Some(child) = map.get_mut(selection.response_key()) {
                        apply_at_path(child, &selection.children, rest, selections, config)?;
                    }
                }
                Ok(())
            }
            None => rewrite_map(map, selections, config)
        },
        _ => Ok(())
    }
}

fn rewrite_map(
    map: &mut Map<String, Value>,
    selections: &[&FieldSelection],
    config: &StoreConfig
) -> Result<(), StoreError> {
    for selection in selections {
        let mut value = match map.remove(selection.response_key()) {
            Some(value) => value,
            None => continue
        };
        // Only maps the selection descends into become records; a map under
        // a terminal field is an opaque scalar and stays embedded.
        if !selection.is_leaf() {
            match &mut value {
                Value::Object(child) => rewrite_linked_map(child, selection, None, config),
                Value::Array(items) => {
                    for (index, item) in items.iter_mut().enumerate() {
                        if let Value::Object(child) = item {
                            rewrite_linked_map(child, selection, Some(index), config);
                        }
                    }
                }
                _ => {}
            }
        }
        map.insert(selection.field_key.clone(), value);
    }
    Ok(())
}

/// Storage-form rewrite of a map that sits under a selection: namespace its
/// keys by `__typename` when present, then attach a path-derived cache
/// marker when no identifying field remains.
fn rewrite_linked_map(
    map: &mut Map<String, Value>,
    selection: &FieldSelection,
    index: Option<usize>,
    config: &StoreConfig
) {
    let typename = map
        .get("__typename")
        .and_then(Value::as_str)
        .map(str::to_owned);
    if let Some(typename) = typename {
        let fields = std::mem::take(map);
        for (key, value) in fields {
            if key == "__typename" {
                continue;
            }
            map.insert(format!("{}/{}", typename, key), value);
        }
    }
    if !has_identity(map, config) {
        let marker = match index {
            Some(index) => format!("{}.{}", selection.namespaced_key, index),
            None => selection.namespaced_key.clone()
        };
        map.insert(config.cache_key.clone(), Value::String(marker));
    }
}

fn has_identity(map: &Map<String, Value>, config: &StoreConfig) -> bool {
    map.contains_key(&config.cache_key) || map.keys().any(|key| config.id_attrs.contains(key))
}

fn identify(map: &Map<String, Value>, config: &StoreConfig) -> Option<EntityRef> {
    for (key, value) in map {
        if config.id_attrs.contains(key) {
            if let Some(id) = scalar_identity(value) {
                return Some(EntityRef::new(key.clone(), id));
            }
        }
    }
    map.get(&config.cache_key)
        .and_then(Value::as_str)
        .map(|marker| EntityRef::new(config.cache_key.clone(), marker))
}

fn scalar_identity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None
    }
}

fn normalize_map(
    map: &Map<String, Value>,
    config: &StoreConfig,
    entities: &mut Vec<(EntityRef, EntityRecord)>
) -> Result<EntityRecord, StoreError> {
    let mut record = EntityRecord::default();
    for (key, value) in map {
        record.insert(key.clone(), normalize_value(key, value, config, entities)?);
    }
    Ok(record)
}

fn normalize_value(
    key: &str,
    value: &Value,
    config: &StoreConfig,
    entities: &mut Vec<(EntityRef, EntityRecord)>
) -> Result<FieldValue, StoreError> {
    match value {
        Value::Object(map) => {
            if let Some(entity) = identify(map, config) {
                let record = normalize_map(map, config, entities)?;
                entities.push((entity.clone(), record));
                return Ok(FieldValue::Ref(entity));
            }
            let entity_values = map
                .values()
                .filter(|value| is_entity_map(value, config))
                .count();
            if entity_values == 0 {
                Ok(FieldValue::Object(map.clone()))
            } else if entity_values == map.len() {
                let mut links = Vec::with_capacity(map.len());
                for (name, value) in map {
                    if let Value::Object(child) = value {
                        if let Some(entity) = identify(child, config) {
                            let record = normalize_map(child, config, entities)?;
                            entities.push((entity.clone(), record));
                            links.push((name.clone(), entity));
                        }
                    }
                }
                Ok(FieldValue::RefMap(links))
            } else {
                Err(StoreError::MixedEntityMap(key.to_string()))
            }
        }
        Value::Array(items) => {
            let entity_items = items
                .iter()
                .filter(|item| is_entity_map(item, config))
                .count();
            if entity_items == 0 {
                Ok(FieldValue::ScalarList(items.clone()))
            } else if entity_items == items.len() {
                let mut links = Vec::with_capacity(items.len());
                for item in items {
                    if let Value::Object(child) = item {
                        if let Some(entity) = identify(child, config) {
                            let record = normalize_map(child, config, entities)?;
                            entities.push((entity.clone(), record));
                            links.push(entity);
                        }
                    }
                }
                Ok(FieldValue::RefList(links))
            } else {
                Err(StoreError::MixedEntityMap(key.to_string()))
            }
        }
        other => Ok(FieldValue::Scalar(other.clone()))
    }
}

fn is_entity_map(value: &Value, config: &StoreConfig) -> bool {
    match value {
        Value::Object(map) => identify(map, config).is_some(),
        _ => false
    }
}
