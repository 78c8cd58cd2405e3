//! Applies server-side attribute changes to an entity's local copy of its attributes.
//!
//! Paths arrive leaf-first: the last element is the top-level attribute on the entity and the first is the key or index
//! of the container being changed, so resolving walks the path backwards from the entity's root map.
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AttrPathError {
    #[error("no attribute named {0:?}")]
    MissingKey(String),

    #[error("index {index} is out of range for a list of length {len}")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("path element {element} can't index into a {container}")]
    InvalidElement {
        element: Value,
        container: &'static str,
    },

    #[error("expected the path to lead to a {expected}, but found a {found}")]
    WrongContainer {
        expected: &'static str,
        found: &'static str,
    },

    #[error("can't pop from an empty list")]
    EmptyList,
}

enum Target<'a> {
    Map(&'a mut Map<String, Value>),
    List(&'a mut Vec<Value>),
}

impl Target<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Target::Map(_) => "map",
            Target::List(_) => "list",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn step<'a>(target: Target<'a>, element: &Value) -> Result<Target<'a>, AttrPathError> {
    let next = match (target, element) {
        (Target::Map(m), Value::String(key)) => m
            .get_mut(key)
            .ok_or_else(|| AttrPathError::MissingKey(key.clone()))?,
        (Target::List(l), Value::Number(n)) => {
            let index = n.as_u64().ok_or_else(|| AttrPathError::InvalidElement {
                element: element.clone(),
                container: "list",
            })?;
            let len = l.len();
            l.get_mut(index as usize)
                .ok_or(AttrPathError::IndexOutOfRange { index, len })?
        }
        (t, _) => {
            return Err(AttrPathError::InvalidElement {
                element: element.clone(),
                container: t.kind(),
            })
        }
    };

    match next {
        Value::Object(m) => Ok(Target::Map(m)),
        Value::Array(l) => Ok(Target::List(l)),
        other => Err(AttrPathError::WrongContainer {
            expected: "container",
            found: kind_of(other),
        }),
    }
}

fn resolve<'a>(root: &'a mut Map<String, Value>, path: &[Value]) -> Result<Target<'a>, AttrPathError> {
    let mut target = Target::Map(root);
    for element in path.iter().rev() {
        target = step(target, element)?;
    }
    Ok(target)
}

fn resolve_map<'a>(
    root: &'a mut Map<String, Value>,
    path: &[Value],
) -> Result<&'a mut Map<String, Value>, AttrPathError> {
    match resolve(root, path)? {
        Target::Map(m) => Ok(m),
        t => Err(AttrPathError::WrongContainer {
            expected: "map",
            found: t.kind(),
        }),
    }
}

fn resolve_list<'a>(
    root: &'a mut Map<String, Value>,
    path: &[Value],
) -> Result<&'a mut Vec<Value>, AttrPathError> {
    match resolve(root, path)? {
        Target::List(l) => Ok(l),
        t => Err(AttrPathError::WrongContainer {
            expected: "list",
            found: t.kind(),
        }),
    }
}

pub fn set_map_attr(
    root: &mut Map<String, Value>,
    path: &[Value],
    key: &str,
    value: Value,
) -> Result<(), AttrPathError> {
    resolve_map(root, path)?.insert(key.to_string(), value);
    Ok(())
}

/// Deleting a key which isn't there is not an error: the server's view already lacks it.
pub fn del_map_attr(root: &mut Map<String, Value>, path: &[Value], key: &str) -> Result<(), AttrPathError> {
    resolve_map(root, path)?.remove(key);
    Ok(())
}

pub fn set_list_attr(
    root: &mut Map<String, Value>,
    path: &[Value],
    index: u32,
    value: Value,
) -> Result<(), AttrPathError> {
    let list = resolve_list(root, path)?;
    let len = list.len();
    let slot = list
        .get_mut(index as usize)
        .ok_or(AttrPathError::IndexOutOfRange {
            index: index as u64,
            len,
        })?;
    *slot = value;
    Ok(())
}

pub fn pop_list_attr(root: &mut Map<String, Value>, path: &[Value]) -> Result<Value, AttrPathError> {
    resolve_list(root, path)?
        .pop()
        .ok_or(AttrPathError::EmptyList)
}

pub fn append_list_attr(root: &mut Map<String, Value>, path: &[Value], value: Value) -> Result<(), AttrPathError> {
    resolve_list(root, path)?.push(value);
    Ok(())
}
