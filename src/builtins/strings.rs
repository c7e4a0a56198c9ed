//! String operations: str, str/len
//!
//! `str` renders and concatenates its arguments; string arguments
//! contribute their contents without the printer's surrounding quotes.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

/// Concatenates the printed form of every argument into one string
pub fn builtin_str(args: &[Value]) -> Result<Value, EvalError> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::Str(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
    }
    Ok(Value::string(out))
}

/// Returns the length of a string in Unicode scalar values
pub fn builtin_str_len(args: &[Value]) -> Result<Value, EvalError> {
    let s = args[0]
        .as_str()
        .ok_or_else(|| EvalError::type_error("str/len", "str", &args[0]))?;
    Ok(Value::Num(s.chars().count() as u64))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "str", Arity::AtLeast(0), builtin_str);
    super::define_primitive(env, "str/len", Arity::Exactly(1), builtin_str_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_concatenates() {
        let result = builtin_str(&[
            Value::string("n = "),
            Value::num(3),
            Value::string(", tag "),
            Value::atom(":a"),
        ])
        .unwrap();
        assert_eq!(result, Value::string("n = 3, tag :a"));
    }

    #[test]
    fn test_str_len() {
        assert_eq!(
            builtin_str_len(&[Value::string("hello")]).unwrap(),
            Value::num(5)
        );
        assert!(matches!(
            builtin_str_len(&[Value::num(1)]),
            Err(EvalError::TypeMismatch { .. })
        ));
    }
}
