// ABOUTME: Interpreter facade owning a root environment and loading the prelude

use crate::env::Environment;
use crate::error::EvalError;
use crate::eval::eval;
use crate::reader::read_str;
use crate::value::Value;
use std::rc::Rc;

const PRELUDE: &str = include_str!("stdlib/prelude.lisp");

/// One interpreter instance: a root environment seeded with primitives.
/// Instances are independent; nothing is shared between them.
pub struct Interpreter {
    env: Rc<Environment>,
}

impl Interpreter {
    /// Root environment with primitives and the prelude loaded
    pub fn new() -> Result<Self, EvalError> {
        let interp = Self::without_stdlib();
        interp.eval_source(PRELUDE)?;
        Ok(interp)
    }

    /// Root environment with primitives only
    pub fn without_stdlib() -> Self {
        Interpreter {
            env: Environment::new_root(),
        }
    }

    pub fn env(&self) -> Rc<Environment> {
        self.env.clone()
    }

    /// Read, expand, and evaluate every form in a source buffer,
    /// returning the last result.
    pub fn eval_source(&self, source: &str) -> Result<Value, EvalError> {
        let mut result = Value::Nil;
        for form in read_str(source)? {
            result = eval(form, self.env.clone())?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_loads() {
        let interp = Interpreter::new().unwrap();
        assert!(interp.env().lookup_value("list/map").is_some());
        assert!(interp.env().lookup_macro("defun").is_some());
    }

    #[test]
    fn test_instances_are_independent() {
        let a = Interpreter::new().unwrap();
        let b = Interpreter::new().unwrap();
        a.eval_source("(set* shared 1)").unwrap();
        assert!(b.env().lookup_value("shared").is_none());
    }

    #[test]
    fn test_eval_source_returns_last_form() {
        let interp = Interpreter::new().unwrap();
        let result = interp.eval_source("(let x 2) (+ x 3)").unwrap();
        assert_eq!(result, Value::num(5));
    }
}
