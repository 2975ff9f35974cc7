use crate::{
    error::StoreError,
    read,
    store::data::{EntityRecord, EntityRef, StoreData},
    walk::{self, FieldSelection, OperationContext, OperationKind},
    write, Document, Variables
};
use serde_json::Value;
use std::{collections::HashSet, sync::Arc};

/// The reserved field name carrying a record's cache marker, unless
/// overridden by [`StoreConfig::cache_key`].
pub const DEFAULT_CACHE_KEY: &str = "__cache";

/// Marker value of the synthetic root record.
pub(crate) const ROOT_MARKER: &str = "root";

/// Construction-time store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Field names treated as identifying fields, in stored (namespaced)
    /// form, e.g. `"Person/id"`.
    pub id_attrs: HashSet<String>,
    /// The reserved cache-marker field name.
    pub cache_key: String,
    /// Entities to seed the store with.
    pub entities: Vec<(EntityRef, EntityRecord)>
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_attrs: HashSet::new(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            entities: Vec::new()
        }
    }
}

impl StoreConfig {
    pub fn with_id_attrs<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        Self {
            id_attrs: attrs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// One immutable snapshot of the normalized cache.
///
/// A write never mutates the snapshot it runs against: it returns a new
/// one. Cloning is how callers keep the previous state around; the client
/// swaps snapshots in a single cell.
#[derive(Debug, Clone)]
pub struct Store {
    config: Arc<StoreConfig>,
    data: StoreData
}

impl Store {
    pub fn new(mut config: StoreConfig) -> Self {
        let mut data = StoreData::default();
        for (entity, record) in config.entities.drain(..) {
            data.merge(entity, record);
        }
        Self {
            config: Arc::new(config),
            data
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The reference of the synthetic root record.
    pub fn root_ref(&self) -> EntityRef {
        EntityRef::root(&self.config.cache_key)
    }

    /// Look up a stored entity record.
    pub fn entity(&self, entity: &EntityRef) -> Option<&EntityRecord> {
        self.data.get(entity)
    }

    /// Number of entities in this snapshot.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Denormalize the operation's selections starting at the root record.
    ///
    /// Returns `None` when the root record is absent. Missing fields read
    /// back as absent keys, so the tree may be partial; `return_partial`
    /// is accepted for interface parity but doesn't change that.
    pub fn read(
        &self,
        document: &Document,
        variables: &Variables,
        _return_partial: bool
    ) -> Result<Option<Value>, StoreError> {
        let pattern = self.pattern(document, variables)?;
        let result = read::pull(&self.data, &self.config, &pattern, &self.root_ref())?;
        tracing::trace!(hit = result.is_some(), "cache read");
        Ok(result.map(Value::Object))
    }

    /// Denormalize an operation against a top-level record that isn't
    /// stored under the root, e.g. a mutation result returned by
    /// [`Store::write`]. Entity links resolve through this snapshot, so the
    /// tree reflects merged state.
    pub fn read_response(
        &self,
        document: &Document,
        variables: &Variables,
        record: &EntityRecord
    ) -> Result<Option<Value>, StoreError> {
        let pattern = self.pattern(document, variables)?;
        let out = read::pull_record(&self.data, &self.config, record, &pattern)?;
        if out.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::Object(out)))
    }

    /// Normalize a response under the operation's selections and merge it.
    ///
    /// Returns the new snapshot together with the rewritten top-level
    /// record (stored under the root for queries, unstored for mutations).
    pub fn write(
        &self,
        data: &Value,
        document: &Document,
        variables: &Variables
    ) -> Result<(Store, EntityRecord), StoreError> {
        let operation = walk::operation(document)?;
        let ctx = OperationContext::new(variables, operation.variable_definitions);
        let fragments = walk::fragment_map(document);
        let pattern = walk::walk(operation.selection_set, &fragments, &ctx)?;
        let mut next = self.data.clone();
        let record = write::write_response(
            &self.config,
            &mut next,
            data,
            &pattern,
            operation.kind == OperationKind::Query
        )?;
        tracing::debug!(entities = next.len(), "cache write");
        Ok((
            Store {
                config: self.config.clone(),
                data: next
            },
            record
        ))
    }

    fn pattern(
        &self,
        document: &Document,
        variables: &Variables
    ) -> Result<Vec<FieldSelection>, StoreError> {
        let operation = walk::operation(document)?;
        let ctx = OperationContext::new(variables, operation.variable_definitions);
        let fragments = walk::fragment_map(document);
        walk::walk(operation.selection_set, &fragments, &ctx)
    }
}
