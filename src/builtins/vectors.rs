//! Vector operations: vec, vec/push!, vec/len, vec/get, vec/set!
//!
//! Vectors are mutable, identity-compared aggregates used by library code
//! where cons chains would be quadratic.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn vec_arg<'a>(op: &str, value: &'a Value) -> Result<&'a Rc<RefCell<Vec<Value>>>, EvalError> {
    match value {
        Value::Vector(items) => Ok(items),
        other => Err(EvalError::type_error(op, "vec", other)),
    }
}

fn index_arg(op: &str, value: &Value, len: usize) -> Result<usize, EvalError> {
    let n = value
        .as_num()
        .ok_or_else(|| EvalError::type_error(op, "num", value))?;
    let i = n as usize;
    if i >= len {
        return Err(EvalError::runtime(
            op,
            format!("index {} out of range for length {}", n, len),
        ));
    }
    Ok(i)
}

/// Creates a vector of the given elements
pub fn builtin_vec(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Vector(Rc::new(RefCell::new(args.to_vec()))))
}

/// Appends an element in place; returns the vector
pub fn builtin_vec_push(args: &[Value]) -> Result<Value, EvalError> {
    let items = vec_arg("vec/push!", &args[0])?;
    items.borrow_mut().push(args[1].clone());
    Ok(args[0].clone())
}

pub fn builtin_vec_len(args: &[Value]) -> Result<Value, EvalError> {
    let items = vec_arg("vec/len", &args[0])?;
    let len = items.borrow().len();
    Ok(Value::Num(len as u64))
}

pub fn builtin_vec_get(args: &[Value]) -> Result<Value, EvalError> {
    let items = vec_arg("vec/get", &args[0])?;
    let items = items.borrow();
    let i = index_arg("vec/get", &args[1], items.len())?;
    Ok(items[i].clone())
}

/// Replaces the element at an index in place; returns the vector
pub fn builtin_vec_set(args: &[Value]) -> Result<Value, EvalError> {
    let items = vec_arg("vec/set!", &args[0])?;
    let mut items_mut = items.borrow_mut();
    let i = index_arg("vec/set!", &args[1], items_mut.len())?;
    items_mut[i] = args[2].clone();
    drop(items_mut);
    Ok(args[0].clone())
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "vec", Arity::AtLeast(0), builtin_vec);
    super::define_primitive(env, "vec/push!", Arity::Exactly(2), builtin_vec_push);
    super::define_primitive(env, "vec/len", Arity::Exactly(1), builtin_vec_len);
    super::define_primitive(env, "vec/get", Arity::Exactly(2), builtin_vec_get);
    super::define_primitive(env, "vec/set!", Arity::Exactly(3), builtin_vec_set);
}
