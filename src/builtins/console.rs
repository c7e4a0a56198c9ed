//! Console output: print
//!
//! `print` writes its arguments space-separated followed by a newline.
//! String arguments are written raw, without the printer's quotes.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

pub fn builtin_print(args: &[Value]) -> Result<Value, EvalError> {
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            Value::Str(s) => s.to_string(),
            other => other.to_string(),
        })
        .collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Nil)
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "print", Arity::AtLeast(0), builtin_print);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_returns_nil() {
        assert!(builtin_print(&[Value::num(1), Value::string("x")])
            .unwrap()
            .is_nil());
    }
}
