//! File input: read-file
//!
//! OS errors propagate as runtime errors carrying the failing path.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

/// Reads a UTF-8 file into a string
pub fn builtin_read_file(args: &[Value]) -> Result<Value, EvalError> {
    let path = args[0]
        .as_str()
        .ok_or_else(|| EvalError::type_error("read-file", "str", &args[0]))?;
    let contents = std::fs::read_to_string(path)
        .map_err(|e| EvalError::runtime("read-file", format!("{}: {}", path, e)))?;
    Ok(Value::string(contents))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "read-file", Arity::Exactly(1), builtin_read_file);
}
