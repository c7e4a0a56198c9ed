// ABOUTME: Macro expander rewriting forms before evaluation, including quasiquotation

use crate::env::Environment;
use crate::error::EvalError;
use crate::eval;
use crate::value::Value;
use log::debug;
use std::rc::Rc;

/// Expand a form at the current layer.
///
/// Non-cons forms pass through unchanged, except the reader's `Quote`
/// surface form which is rewritten to the list `(quote x)` so everything
/// downstream sees one shape. Idempotent on macro-free input.
pub fn expand(env: &Rc<Environment>, form: &Value) -> Result<Value, EvalError> {
    match form {
        Value::Quote(inner) => Ok(Value::list_from_vec(vec![
            Value::atom("quote"),
            (**inner).clone(),
        ])),
        Value::Cons(..) => expand_cons(env, form),
        _ => Ok(form.clone()),
    }
}

fn expand_cons(env: &Rc<Environment>, form: &Value) -> Result<Value, EvalError> {
    let items = form.list_to_vec("expand")?;

    if let Some(name) = items[0].as_atom() {
        match name {
            // Quoted data is opaque to the expander
            "quote" => return Ok(form.clone()),
            "quasi-quote" => {
                if items.len() != 2 {
                    return Err(EvalError::arity_error("quasi-quote", "1", items.len() - 1));
                }
                return quasiquote(&items[1]);
            }
            _ => {}
        }

        // Head bound in the macro namespace: apply the stored closure to the
        // unevaluated argument forms and expand whatever comes back, until
        // the head is no longer a macro.
        if let Some(mac) = env.lookup_macro(name) {
            debug!("expanding macro {}", name);
            let args = items[1..].to_vec();
            let rewritten = eval::apply(&mac, args)?;
            return expand(env, &rewritten);
        }

        // Special forms expand only the sub-expressions that are evaluated;
        // binder names and formal lists stay untouched.
        match name {
            "fn*" => {
                let mut out = items.clone();
                for slot in out.iter_mut().skip(3) {
                    *slot = expand(env, slot)?;
                }
                return Ok(Value::list_from_vec(out));
            }
            "let" | "set*" | "setm*" | "set!" | "set" => {
                let mut out = items.clone();
                if let Some(slot) = out.get_mut(2) {
                    *slot = expand(env, slot)?;
                }
                return Ok(Value::list_from_vec(out));
            }
            "if" | "block" | "begin" | "while" | "throw" => {
                let mut out = items.clone();
                for slot in out.iter_mut().skip(1) {
                    *slot = expand(env, slot)?;
                }
                return Ok(Value::list_from_vec(out));
            }
            _ => {}
        }
    }

    // Ordinary combination: expand the head and every element
    let mut out = items;
    for slot in out.iter_mut() {
        *slot = expand(env, slot)?;
    }
    Ok(Value::list_from_vec(out))
}

/// Walk a quasiquoted template, producing the code that constructs it.
///
/// `(unquote e)` positions yield `e` itself, evaluated in place when the
/// constructed code runs. A nested `quasi-quote` inside a template is the
/// reader-shortcut spelling of the same substitution and is treated
/// identically. Every other cons becomes `(cons A B)`; leaves become
/// `(quote leaf)`.
fn quasiquote(template: &Value) -> Result<Value, EvalError> {
    match template {
        Value::Quote(inner) => {
            // Rebuild the surface form as its (quote x) spelling and walk that
            let as_list =
                Value::list_from_vec(vec![Value::atom("quote"), (**inner).clone()]);
            quasiquote(&as_list)
        }
        Value::Cons(head, tail) => {
            if let Some(name) = head.as_atom() {
                if name == "unquote" || name == "quasi-quote" {
                    let items = template.list_to_vec("unquote")?;
                    if items.len() != 2 {
                        return Err(EvalError::arity_error(name, "1", items.len() - 1));
                    }
                    return Ok(items[1].clone());
                }
            }
            Ok(Value::list_from_vec(vec![
                Value::atom("cons"),
                quasiquote(head)?,
                quasiquote(tail)?,
            ]))
        }
        leaf => Ok(Value::list_from_vec(vec![
            Value::atom("quote"),
            leaf.clone(),
        ])),
    }
}
