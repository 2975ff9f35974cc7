//! Traverses an operation's selection set, producing annotated selections.
//!
//! The annotated tree doubles as the reader's pull pattern; the writer
//! flattens it into per-path selection lists via [`selection_paths`].

use crate::{error::StoreError, keys, Document, Variables};
use graphql_parser::query::{
    Definition, Field, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    VariableDefinition
};
use serde_json::Value;
use std::collections::HashMap;

/// The kind of operation a document executes against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation
}

/// Lightweight description of the operation a document carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMeta {
    pub kind: OperationKind,
    pub name: Option<String>
}

/// Find the executable operation of a document. Only the first operation is
/// considered; subscriptions are not supported by the cache.
pub fn operation_meta(document: &Document) -> Result<OperationMeta, StoreError> {
    operation(document).map(|op| OperationMeta {
        kind: op.kind,
        name: op.name.map(str::to_owned)
    })
}

pub(crate) struct Operation<'d> {
    pub kind: OperationKind,
    pub name: Option<&'d str>,
    pub selection_set: &'d SelectionSet<'static, String>,
    pub variable_definitions: &'d [VariableDefinition<'static, String>]
}

pub(crate) fn operation(document: &Document) -> Result<Operation<'_>, StoreError> {
    for definition in &document.definitions {
        if let Definition::Operation(op) = definition {
            return match op {
                OperationDefinition::SelectionSet(set) => Ok(Operation {
                    kind: OperationKind::Query,
                    name: None,
                    selection_set: set,
                    variable_definitions: &[]
                }),
                OperationDefinition::Query(query) => Ok(Operation {
                    kind: OperationKind::Query,
                    name: query.name.as_deref(),
                    selection_set: &query.selection_set,
                    variable_definitions: &query.variable_definitions
                }),
                OperationDefinition::Mutation(mutation) => Ok(Operation {
                    kind: OperationKind::Mutation,
                    name: mutation.name.as_deref(),
                    selection_set: &mutation.selection_set,
                    variable_definitions: &mutation.variable_definitions
                }),
                OperationDefinition::Subscription(subscription) => {
                    Err(StoreError::UnsupportedOperation(format!(
                        "subscription {}",
                        subscription.name.as_deref().unwrap_or("<anonymous>")
                    )))
                }
            };
        }
    }
    Err(StoreError::UnsupportedOperation(
        "document contains no operation".into()
    ))
}

pub(crate) fn fragment_map(
    document: &Document
) -> HashMap<&str, &FragmentDefinition<'static, String>> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            _ => None
        })
        .collect()
}

/// Per-operation context: the caller's variable bindings plus the declared
/// defaults of the operation's variable list.
pub struct OperationContext<'a> {
    variables: &'a Variables,
    defaults: HashMap<String, Value>
}

impl<'a> OperationContext<'a> {
    pub fn new(
        variables: &'a Variables,
        definitions: &[VariableDefinition<'static, String>]
    ) -> Self {
        let defaults = definitions
            .iter()
            .filter_map(|definition| {
                definition
                    .default_value
                    .as_ref()
                    .map(|value| (definition.name.clone(), keys::literal_to_json(value)))
            })
            .collect();
        Self { variables, defaults }
    }

    /// Binding, else declared default, else null.
    pub(crate) fn resolve_variable(&self, name: &str) -> Value {
        self.variables
            .get(name)
            .or_else(|| self.defaults.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// A selection annotated with its storage keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    /// The unaliased field name.
    pub name: String,
    /// The response alias, when the selection carries one.
    pub alias: Option<String>,
    /// The encoded storage key for this selection.
    pub field_key: String,
    /// The dotted chain of field keys from the root, e.g. `root.viewer.profile`.
    pub namespaced_key: String,
    /// Whether arguments or non-standard directives contributed to the key.
    pub keyed: bool,
    /// Annotated child selections; empty for terminal fields.
    pub children: Vec<FieldSelection>
}

impl FieldSelection {
    /// The key this selection occupies in a response map.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Annotate an operation's selection set. Fragment spreads are expanded
/// against `fragments`; `@include`/`@skip` are evaluated against the
/// resolved variables and may drop selections.
pub(crate) fn walk(
    selection_set: &SelectionSet<'static, String>,
    fragments: &HashMap<&str, &FragmentDefinition<'static, String>>,
    ctx: &OperationContext<'_>
) -> Result<Vec<FieldSelection>, StoreError> {
    walk_set(selection_set, fragments, ctx, "root", &mut Vec::new())
}

fn walk_set(
    selection_set: &SelectionSet<'static, String>,
    fragments: &HashMap<&str, &FragmentDefinition<'static, String>>,
    ctx: &OperationContext<'_>,
    prefix: &str,
    active_spreads: &mut Vec<String>
) -> Result<Vec<FieldSelection>, StoreError> {
    let mut out = Vec::new();
    for item in &selection_set.items {
        match item {
            Selection::Field(field) => {
                if !selected(field, ctx) {
                    continue;
                }
                let field_key = keys::field_key(field, ctx)?;
                let namespaced_key = format!("{}.{}", prefix, field_key);
                let children =
                    walk_set(&field.selection_set, fragments, ctx, &namespaced_key, active_spreads)?;
                out.push(FieldSelection {
                    name: field.name.clone(),
                    alias: field.alias.clone(),
                    keyed: field_key != field.name,
                    field_key,
                    namespaced_key,
                    children
                });
            }
            Selection::FragmentSpread(spread) => {
                let fragment = fragments
                    .get(spread.fragment_name.as_str())
                    .ok_or_else(|| StoreError::UnknownFragment(spread.fragment_name.clone()))?;
                if active_spreads.contains(&spread.fragment_name) {
                    return Err(StoreError::InvalidPullForm(format!(
                        "fragment cycle through {}",
                        spread.fragment_name
                    )));
                }
                active_spreads.push(spread.fragment_name.clone());
                let mut inner =
                    walk_set(&fragment.selection_set, fragments, ctx, prefix, active_spreads)?;
                active_spreads.pop();
                out.append(&mut inner);
            }
            // Type conditions aren't evaluated (the cache has no schema);
            // inline fragments flatten into the enclosing selection list.
            Selection::InlineFragment(inline) => {
                let mut inner =
                    walk_set(&inline.selection_set, fragments, ctx, prefix, active_spreads)?;
                out.append(&mut inner);
            }
        }
    }
    Ok(out)
}

fn selected(field: &Field<'static, String>, ctx: &OperationContext<'_>) -> bool {
    for directive in &field.directives {
        let flag = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| keys::resolve_value(value, ctx))
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        match directive.name.as_str() {
            "include" if !flag => return false,
            "skip" if flag => return false,
            _ => {}
        }
    }
    true
}

/// Flatten an annotated tree into (response path, selections) pairs. The
/// path is the chain of unaliased field names; selections reached through
/// different parents at the same path are merged into one list.
pub(crate) fn selection_paths(
    tree: &[FieldSelection]
) -> Vec<(Vec<String>, Vec<&FieldSelection>)> {
    let mut out: Vec<(Vec<String>, Vec<&FieldSelection>)> = Vec::new();
    out.push((Vec::new(), tree.iter().collect()));
    collect_paths(tree, &Vec::new(), &mut out);
    out
}

fn collect_paths<'t>(
    level: &'t [FieldSelection],
    path: &Vec<String>,
    out: &mut Vec<(Vec<String>, Vec<&'t FieldSelection>)>
) {
    for selection in level {
        if selection.children.is_empty() {
            continue;
        }
        let mut child_path = path.clone();
        child_path.push(selection.name.clone());
        match out.iter_mut().find(|(existing, _)| existing == &child_path) {
            Some((_, selections)) => selections.extend(selection.children.iter()),
            None => out.push((child_path.clone(), selection.children.iter().collect()))
        }
        collect_paths(&selection.children, &child_path, out);
    }
}
