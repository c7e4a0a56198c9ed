// ABOUTME: Environment module for lexical scopes with split value/macro namespaces

use crate::error::EvalError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lexical scope frame. Each frame holds two disjoint namespaces: one for
/// value bindings and one for macro bindings. A name may live in both at
/// once; the evaluator picks the namespace by syntactic position.
#[derive(Debug)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    macros: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates an empty frame with no parent
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            macros: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a root frame seeded with every primitive
    pub fn new_root() -> Rc<Self> {
        let env = Environment::new();
        env.define_value("nil", Value::Nil);
        crate::builtins::register_builtins(&env);
        crate::ffi::register(&env);
        env
    }

    /// Creates a child frame with `parent` as its lookup fallback
    pub fn child(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            macros: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Walks to the outermost frame, the target of `set*` and `setm*`
    pub fn root(self: &Rc<Self>) -> Rc<Environment> {
        let mut cur = self.clone();
        while let Some(parent) = cur.parent.clone() {
            cur = parent;
        }
        cur
    }

    /// Binds a value in THIS frame, shadowing any outer binding
    pub fn define_value(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    /// Binds a macro in THIS frame's macro namespace
    pub fn define_macro(&self, name: &str, value: Value) {
        self.macros.borrow_mut().insert(name.to_string(), value);
    }

    /// Looks a symbol up in this frame and then the parent chain
    pub fn lookup_value(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(ref parent) = self.parent {
            return parent.lookup_value(name);
        }
        None
    }

    /// Looks a macro up in this frame and then the parent chain
    pub fn lookup_macro(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.macros.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(ref parent) = self.parent {
            return parent.lookup_macro(name);
        }
        None
    }

    /// Replaces the nearest existing binding of `name`
    pub fn set_value(&self, name: &str, value: Value) -> Result<(), EvalError> {
        if self.values.borrow().contains_key(name) {
            self.values.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(ref parent) = self.parent {
            return parent.set_value(name, value);
        }
        Err(EvalError::Unbound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let env = Environment::new();
        env.define_value("x", Value::num(42));

        match env.lookup_value("x") {
            Some(Value::Num(n)) => assert_eq!(n, 42),
            _ => panic!("Expected Num(42)"),
        }
    }

    #[test]
    fn test_unbound_symbol() {
        let env = Environment::new();
        assert!(env.lookup_value("undefined").is_none());
    }

    #[test]
    fn test_shadowing() {
        let parent = Environment::new();
        parent.define_value("x", Value::num(42));

        let child = Environment::child(parent);
        child.define_value("x", Value::num(100));

        match child.lookup_value("x") {
            Some(Value::Num(n)) => assert_eq!(n, 100),
            _ => panic!("Expected Num(100)"),
        }
    }

    #[test]
    fn test_parent_lookup() {
        let parent = Environment::new();
        parent.define_value("x", Value::num(42));

        let child = Environment::child(parent);
        match child.lookup_value("x") {
            Some(Value::Num(n)) => assert_eq!(n, 42),
            _ => panic!("Expected Num(42)"),
        }
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let env = Environment::new();
        env.define_value("map", Value::num(1));
        assert!(env.lookup_macro("map").is_none());

        env.define_macro("map", Value::num(2));
        match env.lookup_value("map") {
            Some(Value::Num(n)) => assert_eq!(n, 1),
            _ => panic!("value binding clobbered by macro binding"),
        }
        match env.lookup_macro("map") {
            Some(Value::Num(n)) => assert_eq!(n, 2),
            _ => panic!("macro binding missing"),
        }
    }

    #[test]
    fn test_set_value_replaces_nearest_binding() {
        let parent = Environment::new();
        parent.define_value("x", Value::num(1));
        let child = Environment::child(parent.clone());

        child.set_value("x", Value::num(2)).unwrap();
        match parent.lookup_value("x") {
            Some(Value::Num(n)) => assert_eq!(n, 2),
            _ => panic!("Expected parent binding updated"),
        }
    }

    #[test]
    fn test_set_value_unbound() {
        let env = Environment::new();
        assert!(matches!(
            env.set_value("ghost", Value::Nil),
            Err(EvalError::Unbound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_root_walks_chain() {
        let root = Environment::new();
        root.define_value("x", Value::num(1));
        let mid = Environment::child(root);
        let leaf = Environment::child(mid);

        leaf.root().define_value("y", Value::num(2));
        match leaf.lookup_value("y") {
            Some(Value::Num(n)) => assert_eq!(n, 2),
            _ => panic!("Expected root definition visible from leaf"),
        }
    }
}
