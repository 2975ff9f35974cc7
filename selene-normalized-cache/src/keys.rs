//! Derives the storage key for a selection from its field name, arguments
//! and non-standard directives.
//!
//! A bare selection keys under its field name. Arguments append a
//! `({"name":value,...})` suffix with values resolved against the caller's
//! variables; directives other than `include`/`skip` append `@name` (plus
//! their own argument suffix). The resulting string is canonical: the same
//! selection with the same variables always encodes to the same bytes.

use crate::{error::StoreError, walk::OperationContext};
use graphql_parser::query::{Directive, Field, Value as AstValue};
use serde_json::Value;

type Arguments = [(String, AstValue<'static, String>)];

pub(crate) fn field_key(
    field: &Field<'static, String>,
    ctx: &OperationContext<'_>
) -> Result<String, StoreError> {
    if field.name.is_empty() {
        return Err(StoreError::Encode("selection is missing a field name".into()));
    }
    let custom: Vec<&Directive<'static, String>> = field
        .directives
        .iter()
        .filter(|directive| directive.name != "include" && directive.name != "skip")
        .collect();
    if field.arguments.is_empty() && custom.is_empty() {
        return Ok(field.name.clone());
    }

    let mut key = field.name.clone();
    if !field.arguments.is_empty() {
        key.push('(');
        write_arguments(&mut key, &field.arguments, ctx)?;
        key.push(')');
    }
    for directive in custom {
        key.push('@');
        key.push_str(&directive.name);
        if !directive.arguments.is_empty() {
            key.push('(');
            write_arguments(&mut key, &directive.arguments, ctx)?;
            key.push(')');
        }
    }
    Ok(key)
}

fn write_arguments(
    out: &mut String,
    arguments: &Arguments,
    ctx: &OperationContext<'_>
) -> Result<(), StoreError> {
    out.push('{');
    for (index, (name, value)) in arguments.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_json(out, &Value::String(name.clone()))?;
        out.push(':');
        write_value(out, value, ctx)?;
    }
    out.push('}');
    Ok(())
}

fn write_value(
    out: &mut String,
    value: &AstValue<'static, String>,
    ctx: &OperationContext<'_>
) -> Result<(), StoreError> {
    match value {
        AstValue::Variable(name) => write_json(out, &ctx.resolve_variable(name)),
        AstValue::Int(n) => {
            out.push_str(&n.as_i64().unwrap_or_default().to_string());
            Ok(())
        }
        AstValue::Float(f) => write_json(
            out,
            &serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        ),
        AstValue::String(s) => write_json(out, &Value::String(s.clone())),
        AstValue::Boolean(b) => {
            out.push_str(if *b { "true" } else { "false" });
            Ok(())
        }
        AstValue::Null => {
            out.push_str("null");
            Ok(())
        }
        // Enums keep their source lexical form, unquoted.
        AstValue::Enum(name) => {
            out.push_str(name);
            Ok(())
        }
        AstValue::List(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item, ctx)?;
            }
            out.push(']');
            Ok(())
        }
        AstValue::Object(fields) => {
            out.push('{');
            for (index, (name, value)) in fields.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_json(out, &Value::String(name.clone()))?;
                out.push(':');
                write_value(out, value, ctx)?;
            }
            out.push('}');
            Ok(())
        }
    }
}

fn write_json(out: &mut String, value: &Value) -> Result<(), StoreError> {
    let rendered =
        serde_json::to_string(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    out.push_str(&rendered);
    Ok(())
}

/// Resolve an argument value against the operation context, turning
/// variables into their bound (or defaulted) values.
pub(crate) fn resolve_value(
    value: &AstValue<'static, String>,
    ctx: &OperationContext<'_>
) -> Value {
    match value {
        AstValue::Variable(name) => ctx.resolve_variable(name),
        other => literal_to_json(other)
    }
}

/// Convert a literal AST value to JSON. Variables resolve to null here;
/// use [`resolve_value`] when an operation context is available.
pub(crate) fn literal_to_json(value: &AstValue<'static, String>) -> Value {
    match value {
        AstValue::Variable(_) | AstValue::Null => Value::Null,
        AstValue::Int(n) => Value::from(n.as_i64().unwrap_or_default()),
        AstValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AstValue::String(s) => Value::String(s.clone()),
        AstValue::Boolean(b) => Value::Bool(*b),
        AstValue::Enum(name) => Value::String(name.clone()),
        AstValue::List(items) => Value::Array(items.iter().map(literal_to_json).collect()),
        AstValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), literal_to_json(value)))
                .collect()
        )
    }
}
