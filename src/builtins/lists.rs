//! List operations: cons, head, tail, list, cons?, nil?
//!
//! Lists are right-nested cons chains terminated by `()`. `cons` accepts
//! any tail, so dotted pairs can be built; the chain-walking helpers reject
//! them.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

use super::truth;

/// Constructs a pair from a head and a tail
pub fn builtin_cons(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

/// Returns the head of a pair
pub fn builtin_head(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Cons(h, _) => Ok((**h).clone()),
        other => Err(EvalError::type_error("head", "cons", other)),
    }
}

/// Returns the tail of a pair
pub fn builtin_tail(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Cons(_, t) => Ok((**t).clone()),
        other => Err(EvalError::type_error("tail", "cons", other)),
    }
}

/// Creates a list containing the given elements in order
pub fn builtin_list(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::list_from_vec(args.to_vec()))
}

pub fn builtin_cons_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(args[0].is_cons()))
}

pub fn builtin_nil_p(args: &[Value]) -> Result<Value, EvalError> {
    Ok(truth(args[0].is_nil()))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "cons", Arity::Exactly(2), builtin_cons);
    super::define_primitive(env, "head", Arity::Exactly(1), builtin_head);
    super::define_primitive(env, "tail", Arity::Exactly(1), builtin_tail);
    super::define_primitive(env, "list", Arity::AtLeast(0), builtin_list);
    super::define_primitive(env, "cons?", Arity::Exactly(1), builtin_cons_p);
    super::define_primitive(env, "nil?", Arity::Exactly(1), builtin_nil_p);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cons_head_tail() {
        let pair = builtin_cons(&[Value::num(1), Value::Nil]).unwrap();
        assert_eq!(builtin_head(&[pair.clone()]).unwrap(), Value::num(1));
        assert!(builtin_tail(&[pair]).unwrap().is_nil());
    }

    #[test]
    fn test_head_of_num_is_type_error() {
        let result = builtin_head(&[Value::num(3)]);
        assert!(matches!(result, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_dotted_pair() {
        let pair = builtin_cons(&[Value::num(1), Value::num(2)]).unwrap();
        assert_eq!(builtin_tail(&[pair]).unwrap(), Value::num(2));
    }

    #[test]
    fn test_list_and_predicates() {
        let xs = builtin_list(&[Value::num(1), Value::num(2)]).unwrap();
        assert_eq!(builtin_cons_p(&[xs.clone()]).unwrap(), Value::atom(":true"));
        assert!(builtin_nil_p(&[xs]).unwrap().is_nil());
        assert_eq!(builtin_nil_p(&[Value::Nil]).unwrap(), Value::atom(":true"));
        assert!(builtin_list(&[]).unwrap().is_nil());
    }
}
