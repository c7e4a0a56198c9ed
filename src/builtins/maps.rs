//! Map operations: hash-map, map/get, map/set!, map/has?, map/keys
//!
//! Tables are mutable, identity-compared, and keyed by keyword atoms.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::truth;

fn map_arg<'a>(
    op: &str,
    value: &'a Value,
) -> Result<&'a Rc<RefCell<HashMap<String, Value>>>, EvalError> {
    match value {
        Value::Table(map) => Ok(map),
        other => Err(EvalError::type_error(op, "map", other)),
    }
}

fn key_arg(op: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Atom(name) if name.starts_with(':') => Ok(name.to_string()),
        other => Err(EvalError::type_error(op, "keyword", other)),
    }
}

/// Creates a table from alternating keyword keys and values
pub fn builtin_hash_map(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::runtime(
            "hash-map",
            "expected an even number of key/value arguments",
        ));
    }
    let mut map = HashMap::new();
    for pair in args.chunks(2) {
        map.insert(key_arg("hash-map", &pair[0])?, pair[1].clone());
    }
    Ok(Value::Table(Rc::new(RefCell::new(map))))
}

/// Looks a key up; missing keys yield ()
pub fn builtin_map_get(args: &[Value]) -> Result<Value, EvalError> {
    let map = map_arg("map/get", &args[0])?;
    let key = key_arg("map/get", &args[1])?;
    Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Nil))
}

/// Inserts or replaces a key in place; returns the table
pub fn builtin_map_set(args: &[Value]) -> Result<Value, EvalError> {
    let map = map_arg("map/set!", &args[0])?;
    let key = key_arg("map/set!", &args[1])?;
    map.borrow_mut().insert(key, args[2].clone());
    Ok(args[0].clone())
}

pub fn builtin_map_has_p(args: &[Value]) -> Result<Value, EvalError> {
    let map = map_arg("map/has?", &args[0])?;
    let key = key_arg("map/has?", &args[1])?;
    Ok(truth(map.borrow().contains_key(&key)))
}

/// Returns the keys as a sorted list of keywords
pub fn builtin_map_keys(args: &[Value]) -> Result<Value, EvalError> {
    let map = map_arg("map/keys", &args[0])?;
    let mut keys: Vec<String> = map.borrow().keys().cloned().collect();
    keys.sort();
    Ok(Value::list_from_vec(
        keys.into_iter().map(Value::atom).collect(),
    ))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "hash-map", Arity::AtLeast(0), builtin_hash_map);
    super::define_primitive(env, "map/get", Arity::Exactly(2), builtin_map_get);
    super::define_primitive(env, "map/set!", Arity::Exactly(3), builtin_map_set);
    super::define_primitive(env, "map/has?", Arity::Exactly(2), builtin_map_has_p);
    super::define_primitive(env, "map/keys", Arity::Exactly(1), builtin_map_keys);
}
