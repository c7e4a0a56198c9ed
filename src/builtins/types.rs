//! Type inspection: type-of, num?, str?, atom?, fn?

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

use super::truth;

/// Returns the value's type tag as a keyword, e.g. (type-of 3) => :num
pub fn builtin_type_of(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::atom(format!(":{}", args[0].type_name())))
}

pub fn builtin_num_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(matches!(args[0], Value::Num(_))))
}

pub fn builtin_str_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(matches!(args[0], Value::Str(_))))
}

pub fn builtin_atom_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(matches!(args[0], Value::Atom(_))))
}

/// True for anything the evaluator can apply
pub fn builtin_fn_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(matches!(
        args[0],
        Value::Closure(_) | Value::Primitive(_)
    )))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "type-of", Arity::Exactly(1), builtin_type_of);
    super::define_primitive(env, "num?", Arity::Exactly(1), builtin_num_p);
    super::define_primitive(env, "str?", Arity::Exactly(1), builtin_str_p);
    super::define_primitive(env, "atom?", Arity::Exactly(1), builtin_atom_p);
    super::define_primitive(env, "fn?", Arity::Exactly(1), builtin_fn_p);
}
