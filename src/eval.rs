// ABOUTME: Tree-walking evaluator dispatching on the structural shape of a value

use crate::env::Environment;
use crate::error::EvalError;
use crate::expand::expand;
use crate::value::{Closure, Value};
use log::trace;
use std::rc::Rc;

/// Evaluate a form in an environment.
///
/// The loop re-enters itself for tail positions (`if` branches, the final
/// expression of a `block`, closure bodies) instead of recursing, so
/// accumulator-style library recursion does not grow the host stack.
pub fn eval(form: Value, env: Rc<Environment>) -> Result<Value, EvalError> {
    let mut expr = form;
    let mut current_env = env;
    loop {
        match &expr {
            // Self-evaluating values
            Value::Num(_) | Value::Str(_) | Value::Nil => return Ok(expr),
            Value::Closure(_)
            | Value::Macro(_)
            | Value::Primitive(_)
            | Value::Foreign(_)
            | Value::Vector(_)
            | Value::Table(_) => return Ok(expr),

            // A bare quoted value is its payload
            Value::Quote(inner) => return Ok((**inner).clone()),

            // Symbol lookup; keyword atoms self-evaluate
            Value::Atom(name) => {
                if name.starts_with(':') {
                    return Ok(expr.clone());
                }
                return current_env
                    .lookup_value(name)
                    .ok_or_else(|| EvalError::Unbound(name.to_string()));
            }

            Value::Cons(..) => {
                // One expansion pass at this layer; nested layers re-enter
                // the expander as they are evaluated.
                let expanded = expand(&current_env, &expr)?;
                if !expanded.is_cons() {
                    expr = expanded;
                    continue;
                }
                trace!("eval {}", expanded);
                let items = expanded.list_to_vec("eval")?;

                if let Some(name) = items[0].as_atom() {
                    match name {
                        "quote" => {
                            if items.len() != 2 {
                                return Err(EvalError::arity_error("quote", "1", items.len() - 1));
                            }
                            return Ok(items[1].clone());
                        }
                        "if" => {
                            if items.len() < 3 || items.len() > 4 {
                                return Err(EvalError::arity_error("if", "2-3", items.len() - 1));
                            }
                            let condition = eval(items[1].clone(), current_env.clone())?;
                            if !condition.is_nil() {
                                expr = items[2].clone();
                            } else if items.len() == 4 {
                                expr = items[3].clone();
                            } else {
                                return Ok(Value::Nil);
                            }
                            continue;
                        }
                        "block" | "begin" => {
                            if items.len() == 1 {
                                return Ok(Value::Nil);
                            }
                            for item in &items[1..items.len() - 1] {
                                eval(item.clone(), current_env.clone())?;
                            }
                            expr = items[items.len() - 1].clone();
                            continue;
                        }
                        "let" => {
                            let (name, init) = binder_args("let", &items)?;
                            let value = eval(init, current_env.clone())?;
                            current_env.define_value(&name, value);
                            return Ok(Value::Nil);
                        }
                        "set*" => {
                            let (name, init) = binder_args("set*", &items)?;
                            let value = eval(init, current_env.clone())?;
                            current_env.root().define_value(&name, value);
                            return Ok(Value::Nil);
                        }
                        "setm*" => {
                            let (name, init) = binder_args("setm*", &items)?;
                            let value = eval(init, current_env.clone())?;
                            let closure = match value {
                                Value::Closure(c) => c,
                                other => {
                                    return Err(EvalError::type_error("setm*", "closure", &other))
                                }
                            };
                            current_env.root().define_macro(&name, Value::Macro(closure));
                            return Ok(Value::Nil);
                        }
                        "fn*" => return eval_fn_star(&items, &current_env),
                        "set!" => {
                            let (name, init) = binder_args("set!", &items)?;
                            let value = eval(init, current_env.clone())?;
                            current_env.set_value(&name, value)?;
                            return Ok(Value::Nil);
                        }
                        "set" => {
                            // (set (id name) expr)
                            if items.len() != 3 {
                                return Err(EvalError::arity_error("set", "2", items.len() - 1));
                            }
                            let place = items[1].list_to_vec("set")?;
                            let name = match place.as_slice() {
                                [tag, target] if tag.as_atom() == Some("id") => target
                                    .as_atom()
                                    .ok_or_else(|| EvalError::type_error("set", "atom", target))?
                                    .to_string(),
                                _ => {
                                    return Err(EvalError::type_error(
                                        "set",
                                        "(id name) place",
                                        &items[1],
                                    ))
                                }
                            };
                            let value = eval(items[2].clone(), current_env.clone())?;
                            current_env.set_value(&name, value)?;
                            return Ok(Value::Nil);
                        }
                        "while" => {
                            if items.len() < 2 {
                                return Err(EvalError::arity_error(
                                    "while",
                                    "at least 1",
                                    items.len() - 1,
                                ));
                            }
                            loop {
                                let condition = eval(items[1].clone(), current_env.clone())?;
                                if condition.is_nil() {
                                    return Ok(Value::Nil);
                                }
                                for item in &items[2..] {
                                    eval(item.clone(), current_env.clone())?;
                                }
                            }
                        }
                        "throw" => {
                            if items.len() != 2 {
                                return Err(EvalError::arity_error("throw", "1", items.len() - 1));
                            }
                            let value = eval(items[1].clone(), current_env.clone())?;
                            return Err(EvalError::User(value));
                        }
                        _ => {}
                    }
                }

                // Function application
                let func = eval(items[0].clone(), current_env.clone())?;
                let mut args = Vec::with_capacity(items.len() - 1);
                for item in &items[1..] {
                    args.push(eval(item.clone(), current_env.clone())?);
                }

                match func {
                    Value::Closure(closure) => {
                        let frame = bind_call_frame(&closure, Value::Closure(closure.clone()), args)?;
                        // Tail call: loop on the last body expression
                        for item in &closure.body[..closure.body.len() - 1] {
                            eval(item.clone(), frame.clone())?;
                        }
                        expr = closure.body[closure.body.len() - 1].clone();
                        current_env = frame;
                        continue;
                    }
                    Value::Primitive(prim) => {
                        if !prim.arity.accepts(args.len()) {
                            return Err(EvalError::arity_error(
                                prim.name,
                                prim.arity.to_string(),
                                args.len(),
                            ));
                        }
                        return (prim.func)(&args);
                    }
                    other => return Err(EvalError::type_error("apply", "callable", &other)),
                }
            }
        }
    }
}

/// Apply a callable to already-gathered arguments.
///
/// This is the entry the expander uses to run a macro body over unevaluated
/// argument forms; macros bind their own name to the underlying closure so
/// they can recurse as ordinary functions.
pub fn apply(func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    match func {
        Value::Closure(closure) | Value::Macro(closure) => {
            let frame = bind_call_frame(closure, Value::Closure(closure.clone()), args)?;
            let mut result = Value::Nil;
            for item in &closure.body {
                result = eval(item.clone(), frame.clone())?;
            }
            Ok(result)
        }
        Value::Primitive(prim) => {
            if !prim.arity.accepts(args.len()) {
                return Err(EvalError::arity_error(
                    prim.name,
                    prim.arity.to_string(),
                    args.len(),
                ));
            }
            (prim.func)(&args)
        }
        other => Err(EvalError::type_error("apply", "callable", other)),
    }
}

/// Extract `name` and the init expression from `(op name expr)`
fn binder_args(op: &str, items: &[Value]) -> Result<(String, Value), EvalError> {
    if items.len() != 3 {
        return Err(EvalError::arity_error(op, "2", items.len() - 1));
    }
    let name = items[1]
        .as_atom()
        .ok_or_else(|| EvalError::type_error(op, "atom", &items[1]))?;
    Ok((name.to_string(), items[2].clone()))
}

/// Construct a closure from `(fn* name (a1 .. [&rest r]) body...)`
fn eval_fn_star(items: &[Value], env: &Rc<Environment>) -> Result<Value, EvalError> {
    if items.len() < 4 {
        return Err(EvalError::arity_error("fn*", "at least 3", items.len() - 1));
    }
    let name = items[1]
        .as_atom()
        .ok_or_else(|| EvalError::type_error("fn*", "atom", &items[1]))?;

    let formal_items = items[2].list_to_vec("fn*")?;
    let mut formals = Vec::new();
    let mut rest = None;
    let mut iter = formal_items.iter();
    while let Some(param) = iter.next() {
        let pname = param
            .as_atom()
            .ok_or_else(|| EvalError::type_error("fn*", "atom", param))?;
        if pname == "&rest" {
            let tail = iter
                .next()
                .ok_or_else(|| EvalError::runtime("fn*", "&rest requires a parameter name"))?;
            let tname = tail
                .as_atom()
                .ok_or_else(|| EvalError::type_error("fn*", "atom", tail))?;
            if iter.next().is_some() {
                return Err(EvalError::runtime("fn*", "&rest parameter must be last"));
            }
            rest = Some(tname.to_string());
            break;
        }
        formals.push(pname.to_string());
    }

    Ok(Value::Closure(Rc::new(Closure {
        name: Some(name.to_string()),
        formals,
        rest,
        body: items[3..].to_vec(),
        env: env.clone(),
    })))
}

/// Bind evaluated arguments into a fresh frame off the closure's captured
/// environment, splicing surplus arguments into the `&rest` list.
fn bind_call_frame(
    closure: &Closure,
    self_value: Value,
    args: Vec<Value>,
) -> Result<Rc<Environment>, EvalError> {
    let op = closure.name.as_deref().unwrap_or("fn*");
    if closure.rest.is_none() && args.len() != closure.formals.len() {
        return Err(EvalError::arity_error(
            op,
            closure.formals.len().to_string(),
            args.len(),
        ));
    }
    if closure.rest.is_some() && args.len() < closure.formals.len() {
        return Err(EvalError::arity_error(
            op,
            format!("at least {}", closure.formals.len()),
            args.len(),
        ));
    }

    let frame = Environment::child(closure.env.clone());
    if let Some(name) = &closure.name {
        frame.define_value(name, self_value);
    }
    let mut args = args.into_iter();
    for formal in &closure.formals {
        // Length checked above
        if let Some(arg) = args.next() {
            frame.define_value(formal, arg);
        }
    }
    if let Some(rest_name) = &closure.rest {
        frame.define_value(rest_name, Value::list_from_vec(args.collect()));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn run(env: &Rc<Environment>, source: &str) -> Result<Value, EvalError> {
        let mut result = Value::Nil;
        for form in read_str(source)? {
            result = eval(form, env.clone())?;
        }
        Ok(result)
    }

    fn run_ok(env: &Rc<Environment>, source: &str) -> Value {
        run(env, source).unwrap()
    }

    #[test]
    fn test_self_evaluating() {
        let env = Environment::new_root();
        assert_eq!(run_ok(&env, "42"), Value::num(42));
        assert_eq!(run_ok(&env, "\"hi\""), Value::string("hi"));
        assert_eq!(run_ok(&env, ":key"), Value::atom(":key"));
        assert!(run_ok(&env, "()").is_nil());
        assert!(run_ok(&env, "nil").is_nil());
    }

    #[test]
    fn test_unbound_symbol() {
        let env = Environment::new_root();
        assert!(matches!(
            run(&env, "ghost"),
            Err(EvalError::Unbound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_quote_returns_payload() {
        let env = Environment::new_root();
        assert_eq!(run_ok(&env, "'x"), Value::atom("x"));
        let quoted = run_ok(&env, "'(1 2)");
        assert_eq!(
            quoted.list_to_vec("test").unwrap(),
            vec![Value::num(1), Value::num(2)]
        );
        assert_eq!(run_ok(&env, "(quote x)"), Value::atom("x"));
    }

    #[test]
    fn test_if_nil_is_only_false() {
        let env = Environment::new_root();
        assert_eq!(run_ok(&env, "(if 1 10 20)"), Value::num(10));
        assert_eq!(run_ok(&env, "(if () 10 20)"), Value::num(20));
        assert_eq!(run_ok(&env, "(if 0 10 20)"), Value::num(10));
        assert!(run_ok(&env, "(if () 10)").is_nil());
    }

    #[test]
    fn test_block_returns_last() {
        let env = Environment::new_root();
        assert!(run_ok(&env, "(block)").is_nil());
        assert_eq!(run_ok(&env, "(block 1 2 3)"), Value::num(3));
        assert_eq!(run_ok(&env, "(begin 1 2)"), Value::num(2));
    }

    #[test]
    fn test_let_defines_in_current_frame() {
        let env = Environment::new_root();
        assert!(run_ok(&env, "(let x 5)").is_nil());
        assert_eq!(run_ok(&env, "x"), Value::num(5));
    }

    #[test]
    fn test_set_star_targets_root() {
        let env = Environment::new_root();
        // From inside a call frame, set* still lands at the root
        run_ok(
            &env,
            "(set* deffer (fn* deffer (v) (set* captured v)))
             (deffer 9)",
        );
        assert_eq!(run_ok(&env, "captured"), Value::num(9));
    }

    #[test]
    fn test_set_bang_updates_existing() {
        let env = Environment::new_root();
        run_ok(&env, "(let x 1) (set! x 2)");
        assert_eq!(run_ok(&env, "x"), Value::num(2));
        assert!(matches!(
            run(&env, "(set! ghost 1)"),
            Err(EvalError::Unbound(_))
        ));
    }

    #[test]
    fn test_set_place_form() {
        let env = Environment::new_root();
        run_ok(&env, "(let x 1) (set (id x) 7)");
        assert_eq!(run_ok(&env, "x"), Value::num(7));
    }

    #[test]
    fn test_fn_star_and_application() {
        let env = Environment::new_root();
        run_ok(&env, "(set* inc (fn* inc (x) (+ x 1)))");
        assert_eq!(run_ok(&env, "(inc 41)"), Value::num(42));
    }

    #[test]
    fn test_closure_self_reference() {
        let env = Environment::new_root();
        run_ok(
            &env,
            "(set* count (fn* count (n) (if (= n 0) 0 (count (- n 1)))))",
        );
        assert_eq!(run_ok(&env, "(count 10)"), Value::num(0));
    }

    #[test]
    fn test_lexical_capture() {
        let env = Environment::new_root();
        run_ok(
            &env,
            "(set* make-adder (fn* make-adder (n) (fn* adder (x) (+ x n))))
             (set* add5 (make-adder 5))",
        );
        assert_eq!(run_ok(&env, "(add5 10)"), Value::num(15));
        // The closure sees its definition site, not the caller's frame
        run_ok(&env, "(set* n 100)");
        assert_eq!(run_ok(&env, "(add5 10)"), Value::num(15));
    }

    #[test]
    fn test_rest_parameter_splices_into_list() {
        let env = Environment::new_root();
        run_ok(&env, "(set* gather (fn* gather (first &rest others) others))");
        assert_eq!(
            run_ok(&env, "(gather 1 2 3)")
                .list_to_vec("test")
                .unwrap(),
            vec![Value::num(2), Value::num(3)]
        );
        assert!(run_ok(&env, "(gather 1)").is_nil());
    }

    #[test]
    fn test_closure_arity_error() {
        let env = Environment::new_root();
        run_ok(&env, "(set* id (fn* id (x) x))");
        assert!(matches!(run(&env, "(id 1 2)"), Err(EvalError::Arity { .. })));
        assert!(matches!(run(&env, "(id)"), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn test_primitive_arity_error() {
        let env = Environment::new_root();
        assert!(matches!(
            run(&env, "(cons 1)"),
            Err(EvalError::Arity { .. })
        ));
    }

    #[test]
    fn test_non_callable_head() {
        let env = Environment::new_root();
        assert!(matches!(
            run(&env, "(3 1 2)"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_while_loops_until_nil() {
        let env = Environment::new_root();
        let result = run_ok(
            &env,
            "(let n 0)
             (while (< n 5) (set! n (+ n 1)))
             n",
        );
        assert_eq!(result, Value::num(5));
    }

    #[test]
    fn test_throw_raises_user_error() {
        let env = Environment::new_root();
        match run(&env, "(throw :boom)") {
            Err(EvalError::User(v)) => assert_eq!(v, Value::atom(":boom")),
            other => panic!("expected User error, got {:?}", other),
        }
    }

    #[test]
    fn test_deep_tail_recursion() {
        let env = Environment::new_root();
        run_ok(
            &env,
            "(set* sum (fn* sum (n acc) (if (= n 0) acc (sum (- n 1) (+ acc n)))))",
        );
        assert_eq!(run_ok(&env, "(sum 10 0)"), Value::num(55));
        // Would overflow the host stack without the trampoline
        assert_eq!(run_ok(&env, "(sum 100000 0)"), Value::num(5000050000));
    }

    #[test]
    fn test_setm_star_installs_macro() {
        let env = Environment::new_root();
        run_ok(
            &env,
            "(setm* twice (fn* twice (e) `(+ ,e ,e)))",
        );
        assert!(env.lookup_macro("twice").is_some());
        assert!(env.lookup_value("twice").is_none());
        assert_eq!(run_ok(&env, "(twice 21)"), Value::num(42));
    }

    #[test]
    fn test_setm_star_rejects_non_closure() {
        let env = Environment::new_root();
        assert!(matches!(
            run(&env, "(setm* m 5)"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_macro_receives_unevaluated_arguments() {
        let env = Environment::new_root();
        // The argument is a form, not a value: the macro quotes it as data
        run_ok(&env, "(setm* reflect (fn* reflect (e) `(quote ,e)))");
        let reflected = run_ok(&env, "(reflect (ghost 1 2))");
        assert_eq!(
            reflected.list_to_vec("test").unwrap(),
            vec![Value::atom("ghost"), Value::num(1), Value::num(2)]
        );
    }

    #[test]
    fn test_quasiquote_evaluates_unquotes_in_place() {
        let env = Environment::new_root();
        run_ok(&env, "(let x 5)");
        let result = run_ok(&env, "`(a ,x b)");
        assert_eq!(
            result.list_to_vec("test").unwrap(),
            vec![Value::atom("a"), Value::num(5), Value::atom("b")]
        );
    }

    #[test]
    fn test_apply_primitive() {
        let env = Environment::new_root();
        let plus = env.lookup_value("+").unwrap();
        assert_eq!(
            apply(&plus, vec![Value::num(1), Value::num(2)]).unwrap(),
            Value::num(3)
        );
    }
}
