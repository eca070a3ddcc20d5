// Copyright 2025 Filetrail Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Expression evaluation over `serde_json` values

use crate::error::QueryError;
use crate::expression::{Ast, Comparator, Function};
use filetrail_core::{CancelCheck, CancellationToken};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// JMESPath truthiness: null, false and empty strings/arrays/objects are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Evaluate `ast` against `data`
///
/// Type mismatches (a field of an array, an index into an object) produce
/// null rather than an error. Only slice steps of zero and bad function
/// arguments are errors. `token` is polled between projected elements.
pub fn evaluate(ast: &Ast, data: &Value, token: &CancellationToken) -> Result<Value, QueryError> {
    match ast {
        Ast::Current => Ok(data.clone()),
        Ast::Field(name) => Ok(data.get(name.as_str()).cloned().unwrap_or(Value::Null)),
        Ast::Subexpr(lhs, rhs) | Ast::Pipe(lhs, rhs) => {
            let base = evaluate(lhs, data, token)?;
            evaluate(rhs, &base, token)
        }
        Ast::Index(index) => Ok(match data {
            Value::Array(items) => resolve_index(items.len(), *index)
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Ast::Slice { start, stop, step } => match data {
            Value::Array(items) => Ok(Value::Array(slice(items, *start, *stop, *step)?)),
            _ => Ok(Value::Null),
        },
        Ast::Projection(lhs, rhs) => match evaluate(lhs, data, token)? {
            Value::Array(items) => project(items.iter(), rhs, token),
            _ => Ok(Value::Null),
        },
        Ast::ObjectProjection(lhs, rhs) => match evaluate(lhs, data, token)? {
            Value::Object(map) => project(map.values(), rhs, token),
            _ => Ok(Value::Null),
        },
        Ast::FilterProjection {
            lhs,
            predicate,
            rhs,
        } => {
            let Value::Array(items) = evaluate(lhs, data, token)? else {
                return Ok(Value::Null);
            };
            let mut out = Vec::new();
            for item in &items {
                checkpoint(token)?;
                if is_truthy(&evaluate(predicate, item, token)?) {
                    let value = evaluate(rhs, item, token)?;
                    if !value.is_null() {
                        out.push(value);
                    }
                }
            }
            Ok(Value::Array(out))
        }
        Ast::Flatten(inner) => match evaluate(inner, data, token)? {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(nested) => out.extend(nested),
                        other => out.push(other),
                    }
                }
                Ok(Value::Array(out))
            }
            _ => Ok(Value::Null),
        },
        Ast::Comparison { op, lhs, rhs } => {
            let left = evaluate(lhs, data, token)?;
            let right = evaluate(rhs, data, token)?;
            Ok(compare(*op, &left, &right))
        }
        Ast::And(lhs, rhs) => {
            let left = evaluate(lhs, data, token)?;
            if is_truthy(&left) {
                evaluate(rhs, data, token)
            } else {
                Ok(left)
            }
        }
        Ast::Or(lhs, rhs) => {
            let left = evaluate(lhs, data, token)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(rhs, data, token)
            }
        }
        Ast::Not(inner) => Ok(Value::Bool(!is_truthy(&evaluate(inner, data, token)?))),
        Ast::Literal(value) => Ok(value.clone()),
        Ast::MultiList(items) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            items
                .iter()
                .map(|item| evaluate(item, data, token))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Ast::MultiHash(pairs) => {
            if data.is_null() {
                return Ok(Value::Null);
            }
            let mut map = Map::new();
            for (key, item) in pairs {
                map.insert(key.clone(), evaluate(item, data, token)?);
            }
            Ok(Value::Object(map))
        }
        Ast::Function { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, data, token))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &values)
        }
    }
}

fn checkpoint(token: &CancellationToken) -> Result<(), QueryError> {
    token.check().map_err(|_| QueryError::Cancelled)
}

fn project<'v>(
    items: impl Iterator<Item = &'v Value>,
    rhs: &Ast,
    token: &CancellationToken,
) -> Result<Value, QueryError> {
    let mut out = Vec::new();
    for item in items {
        checkpoint(token)?;
        let value = evaluate(rhs, item, token)?;
        if !value.is_null() {
            out.push(value);
        }
    }
    Ok(Value::Array(out))
}

/// Negative indices count from the end
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    if index >= 0 {
        let i = usize::try_from(index).ok()?;
        (i < len).then_some(i)
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

fn slice(
    items: &[Value],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<Value>, QueryError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(QueryError::InvalidArgument("slice step cannot be 0".to_string()));
    }

    let len = items.len() as i64;
    let adjust = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    let (mut i, stop) = if step > 0 {
        (
            start.map_or(0, |s| adjust(s, 0, len)),
            stop.map_or(len, |s| adjust(s, 0, len)),
        )
    } else {
        (
            start.map_or(len - 1, |s| adjust(s, -1, len - 1)),
            stop.map_or(-1, |s| adjust(s, -1, len - 1)),
        )
    };

    let mut out = Vec::new();
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if let Some(item) = usize::try_from(i).ok().and_then(|idx| items.get(idx)) {
            out.push(item.clone());
        }
        i += step;
    }
    Ok(out)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Ordering comparisons apply to number pairs and string pairs; anything else is null
fn compare(op: Comparator, left: &Value, right: &Value) -> Value {
    let ordering = match op {
        Comparator::Eq => return Value::Bool(values_equal(left, right)),
        Comparator::Ne => return Value::Bool(!values_equal(left, right)),
        _ => match (left, right) {
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(x, y)| x.partial_cmp(&y)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
    };

    match ordering {
        Some(ord) => Value::Bool(match op {
            Comparator::Lt => ord == Ordering::Less,
            Comparator::Le => ord != Ordering::Greater,
            Comparator::Gt => ord == Ordering::Greater,
            Comparator::Ge => ord != Ordering::Less,
            Comparator::Eq | Comparator::Ne => false,
        }),
        None => Value::Null,
    }
}

fn call(function: Function, args: &[Value]) -> Result<Value, QueryError> {
    match (function, args) {
        (Function::Length, [Value::String(s)]) => Ok(Value::from(s.chars().count())),
        (Function::Length, [Value::Array(items)]) => Ok(Value::from(items.len())),
        (Function::Length, [Value::Object(map)]) => Ok(Value::from(map.len())),
        (Function::Contains, [Value::Array(items), needle]) => {
            Ok(Value::Bool(items.iter().any(|item| values_equal(item, needle))))
        }
        (Function::Contains, [Value::String(s), Value::String(needle)]) => {
            Ok(Value::Bool(s.contains(needle.as_str())))
        }
        (Function::StartsWith, [Value::String(s), Value::String(prefix)]) => {
            Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        (Function::EndsWith, [Value::String(s), Value::String(suffix)]) => {
            Ok(Value::Bool(s.ends_with(suffix.as_str())))
        }
        (Function::ToString, [Value::String(s)]) => Ok(Value::String(s.clone())),
        (Function::ToString, [other]) => Ok(Value::String(other.to_string())),
        _ => Err(QueryError::InvalidArgument(format!(
            "{}() does not accept {}",
            function.name(),
            describe_types(args)
        ))),
    }
}

fn describe_types(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        })
        .collect::<Vec<_>>()
        .join(", ")
}
