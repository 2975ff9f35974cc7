use fnv::FnvBuildHasher;
use serde_json::{Map, Value};
use std::{collections::hash_map::Entry, fmt};

type HashMap<K, V> = std::collections::HashMap<K, V, FnvBuildHasher>;

/// An opaque identifier for a stored entity: the identifying field name
/// paired with its value. Two equal references denote the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub attr: String,
    pub value: String
}

impl EntityRef {
    pub fn new(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into()
        }
    }

    /// The synthetic root record all query results hang off of.
    pub fn root(cache_key: &str) -> Self {
        Self::new(cache_key, super::store::ROOT_MARKER)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.attr, self.value)
    }
}

/// A stored field value. Entities never embed each other: nesting always
/// goes through references.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A primitive value (string, number, boolean or null).
    Scalar(Value),
    /// A plain sub-map that holds no entities.
    Object(Map<String, Value>),
    /// A homogeneous sequence of primitives.
    ScalarList(Vec<Value>),
    /// A link to a single entity.
    Ref(EntityRef),
    /// A homogeneous sequence of entity links.
    RefList(Vec<EntityRef>),
    /// A sub-map whose values are all entity links.
    RefMap(Vec<(String, EntityRef)>)
}

/// A single entity's fields, keyed by encoded field key.
pub type EntityRecord = std::collections::HashMap<String, FieldValue, FnvBuildHasher>;

/// The flat entity map backing one store snapshot.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreData {
    entities: HashMap<EntityRef, EntityRecord>
}

impl StoreData {
    pub fn get(&self, entity: &EntityRef) -> Option<&EntityRecord> {
        self.entities.get(entity)
    }

    /// Key-wise last-writer-wins merge.
    pub fn merge(&mut self, entity: EntityRef, record: EntityRecord) {
        match self.entities.entry(entity) {
            Entry::Occupied(mut occupied) => occupied.get_mut().extend(record),
            Entry::Vacant(vacant) => {
                vacant.insert(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
