//! Arithmetic operations: +, -, *, /, %
//!
//! All arithmetic is over unsigned 64-bit integers. Overflow and underflow
//! are runtime errors rather than silent wraps; negation of a positive
//! number therefore has no result and `(- 1 2)` reports underflow.

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use std::rc::Rc;

fn num_arg(op: &str, value: &Value) -> Result<u64, EvalError> {
    value
        .as_num()
        .ok_or_else(|| EvalError::type_error(op, "num", value))
}

/// Returns the sum of all arguments; (+) is 0
pub fn builtin_add(args: &[Value]) -> Result<Value, EvalError> {
    let mut sum: u64 = 0;
    for arg in args {
        sum = sum
            .checked_add(num_arg("+", arg)?)
            .ok_or_else(|| EvalError::runtime("+", "integer overflow"))?;
    }
    Ok(Value::Num(sum))
}

/// Subtracts subsequent arguments from the first
pub fn builtin_sub(args: &[Value]) -> Result<Value, EvalError> {
    let mut result = num_arg("-", &args[0])?;
    for arg in &args[1..] {
        result = result
            .checked_sub(num_arg("-", arg)?)
            .ok_or_else(|| EvalError::runtime("-", "integer underflow"))?;
    }
    Ok(Value::Num(result))
}

/// Returns the product of all arguments; (*) is 1
pub fn builtin_mul(args: &[Value]) -> Result<Value, EvalError> {
    let mut product: u64 = 1;
    for arg in args {
        product = product
            .checked_mul(num_arg("*", arg)?)
            .ok_or_else(|| EvalError::runtime("*", "integer overflow"))?;
    }
    Ok(Value::Num(product))
}

/// Divides the first argument by subsequent arguments
pub fn builtin_div(args: &[Value]) -> Result<Value, EvalError> {
    let mut result = num_arg("/", &args[0])?;
    for arg in &args[1..] {
        let divisor = num_arg("/", arg)?;
        result = result
            .checked_div(divisor)
            .ok_or_else(|| EvalError::runtime("/", "division by zero"))?;
    }
    Ok(Value::Num(result))
}

/// Returns the remainder of dividing the first argument by the second
pub fn builtin_mod(args: &[Value]) -> Result<Value, EvalError> {
    let a = num_arg("%", &args[0])?;
    let b = num_arg("%", &args[1])?;
    a.checked_rem(b)
        .map(Value::Num)
        .ok_or_else(|| EvalError::runtime("%", "division by zero"))
}

pub fn register(env: &Rc<Environment>) {
    super::define_primitive(env, "+", Arity::AtLeast(0), builtin_add);
    super::define_primitive(env, "-", Arity::AtLeast(1), builtin_sub);
    super::define_primitive(env, "*", Arity::AtLeast(0), builtin_mul);
    super::define_primitive(env, "/", Arity::AtLeast(1), builtin_div);
    super::define_primitive(env, "%", Arity::Exactly(2), builtin_mod);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        let result = builtin_add(&[Value::num(1), Value::num(2), Value::num(3)]).unwrap();
        assert_eq!(result, Value::num(6));
        assert_eq!(builtin_add(&[]).unwrap(), Value::num(0));
    }

    #[test]
    fn test_add_type_error() {
        let result = builtin_add(&[Value::num(1), Value::atom("x")]);
        assert!(matches!(result, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_sub_underflow() {
        let result = builtin_sub(&[Value::num(1), Value::num(2)]);
        assert!(matches!(result, Err(EvalError::Runtime { .. })));
    }

    #[test]
    fn test_mul_overflow() {
        let result = builtin_mul(&[Value::num(u64::MAX), Value::num(2)]);
        assert!(matches!(result, Err(EvalError::Runtime { .. })));
    }

    #[test]
    fn test_div_and_mod() {
        assert_eq!(
            builtin_div(&[Value::num(20), Value::num(4)]).unwrap(),
            Value::num(5)
        );
        assert_eq!(
            builtin_mod(&[Value::num(17), Value::num(5)]).unwrap(),
            Value::num(2)
        );
        assert!(matches!(
            builtin_div(&[Value::num(1), Value::num(0)]),
            Err(EvalError::Runtime { .. })
        ));
    }
}
