//! Comparison operations: =, <, >, <=, >=
//!
//! `=` is structural on any values; the ordering operators are numeric and
//! chain pairwise over their arguments. Predicates return `:true` or `()`.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

use super::truth;

/// Structural equality over all arguments
pub fn builtin_eq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn chain_compare(
    op: &'static str,
    args: &[Value],
    keep: fn(u64, u64) -> bool,
) -> Result<Value, EvalError> {
    for pair in args.windows(2) {
        let a = pair[0]
            .as_num()
            .ok_or_else(|| EvalError::type_error(op, "num", &pair[0]))?;
        let b = pair[1]
            .as_num()
            .ok_or_else(|| EvalError::type_error(op, "num", &pair[1]))?;
        if !keep(a, b) {
            return Ok(Value::Nil);
        }
    }
    Ok(truth(true))
}

pub fn builtin_lt(args: &[Value]) -> Result<Value, EvalError> {
    chain_compare("<", args, |a, b| a < b)
}

pub fn builtin_gt(args: &[Value]) -> Result<Value, EvalError> {
    chain_compare(">", args, |a, b| a > b)
}

pub fn builtin_le(args: &[Value]) -> Result<Value, EvalError> {
    chain_compare("<=", args, |a, b| a <= b)
}

pub fn builtin_ge(args: &[Value]) -> Result<Value, EvalError> {
    chain_compare(">=", args, |a, b| a >= b)
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "=", Arity::AtLeast(2), builtin_eq);
    super::define_primitive(env, "<", Arity::AtLeast(2), builtin_lt);
    super::define_primitive(env, ">", Arity::AtLeast(2), builtin_gt);
    super::define_primitive(env, "<=", Arity::AtLeast(2), builtin_le);
    super::define_primitive(env, ">=", Arity::AtLeast(2), builtin_ge);
}
