// ABOUTME: Value types representing code and data in the interpreter

use crate::env::Environment;
use crate::error::EvalError;
use crate::ffi::ForeignValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The uniform tagged representation of every runtime object.
///
/// Aggregate structure is shared through `Rc`; nothing is mutated after
/// construction except the interiors of `Vector` and `Table` (through their
/// primitives) and environment frames (through environment operations).
#[derive(Debug, Clone)]
pub enum Value {
    /// The empty list, doubling as logical false
    Nil,
    Num(u64),
    /// Symbol; names beginning with `:` are self-evaluating keywords
    Atom(Rc<str>),
    Str(Rc<str>),
    /// The only reader-producible aggregate; lists are right-nested
    /// cons chains terminated by `Nil`
    Cons(Rc<Value>, Rc<Value>),
    /// Surface form of `'x`; rewritten to `(quote x)` on first expansion
    Quote(Rc<Value>),
    Closure(Rc<Closure>),
    /// A closure living in the macro namespace; never returned as a
    /// first-class value from evaluation
    Macro(Rc<Closure>),
    Primitive(Primitive),
    Foreign(Rc<ForeignValue>),
    Vector(Rc<RefCell<Vec<Value>>>),
    Table(Rc<RefCell<HashMap<String, Value>>>),
}

/// A function produced by `fn*`, capturing its defining environment.
#[derive(Debug)]
pub struct Closure {
    /// Bound to the closure itself inside its call frames
    pub name: Option<String>,
    pub formals: Vec<String>,
    /// Collects surplus arguments into a list when present
    pub rest: Option<String>,
    pub body: Vec<Value>,
    pub env: Rc<Environment>,
}

/// A host-side callable with a name tag and arity descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub arity: Arity,
    pub func: fn(&[Value]) -> Result<Value, EvalError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::Between(lo, hi) => n >= lo && n <= hi,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Arity::Exactly(k) => write!(f, "{}", k),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
            Arity::Between(lo, hi) => write!(f, "{}-{}", lo, hi),
        }
    }
}

impl Primitive {
    pub const fn new(
        name: &'static str,
        arity: Arity,
        func: fn(&[Value]) -> Result<Value, EvalError>,
    ) -> Self {
        Primitive { name, arity, func }
    }
}

// ============================================================================
// Constructors and accessors
// ============================================================================

impl Value {
    pub fn nil() -> Value {
        Value::Nil
    }

    pub fn num(n: u64) -> Value {
        Value::Num(n)
    }

    pub fn atom(name: impl AsRef<str>) -> Value {
        Value::Atom(Rc::from(name.as_ref()))
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn cons(head: Value, tail: Value) -> Value {
        Value::Cons(Rc::new(head), Rc::new(tail))
    }

    pub fn quoted(inner: Value) -> Value {
        Value::Quote(Rc::new(inner))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_cons(&self) -> bool {
        matches!(self, Value::Cons(..))
    }

    /// True for `Nil` and for cons chains with a list tail at every level
    pub fn is_list(&self) -> bool {
        let mut cur = self;
        loop {
            match cur {
                Value::Nil => return true,
                Value::Cons(_, tail) => cur = tail,
                _ => return false,
            }
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Value::Atom(name) if name.starts_with(':'))
    }

    pub fn head(&self) -> Option<&Value> {
        match self {
            Value::Cons(h, _) => Some(h),
            _ => None,
        }
    }

    pub fn tail(&self) -> Option<&Value> {
        match self {
            Value::Cons(_, t) => Some(t),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<u64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Num(_) => "num",
            Value::Atom(_) => "atom",
            Value::Str(_) => "str",
            Value::Cons(..) => "cons",
            Value::Quote(_) => "quote",
            Value::Closure(_) => "closure",
            Value::Macro(_) => "macro",
            Value::Primitive(_) => "primitive",
            Value::Foreign(_) => "foreign",
            Value::Vector(_) => "vec",
            Value::Table(_) => "map",
        }
    }

    /// Build a right-nested cons chain terminated by `Nil`
    pub fn list_from_vec(items: Vec<Value>) -> Value {
        let mut list = Value::Nil;
        for item in items.into_iter().rev() {
            list = Value::cons(item, list);
        }
        list
    }

    /// Flatten a cons chain into a vector; a dotted tail is a type error
    pub fn list_to_vec(&self, op: &str) -> Result<Vec<Value>, EvalError> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Value::Nil => return Ok(items),
                Value::Cons(h, t) => {
                    items.push((**h).clone());
                    cur = t;
                }
                other => return Err(EvalError::type_error(op, "list", other)),
            }
        }
    }
}

// ============================================================================
// Structural equality
// ============================================================================

/// If `v` is the two-element list `(quote x)`, return `x`.
fn quote_payload(v: &Value) -> Option<&Value> {
    let (head, tail) = match v {
        Value::Cons(h, t) => (h.as_ref(), t.as_ref()),
        _ => return None,
    };
    match (head, tail) {
        (Value::Atom(name), Value::Cons(x, rest))
            if name.as_ref() == "quote" && rest.is_nil() =>
        {
            Some(x)
        }
        _ => None,
    }
}

impl PartialEq for Value {
    /// Deep on atoms, numbers, strings, quote, and cons trees; identity on
    /// closures, primitives, foreign handles, vectors, and tables.
    /// `Quote(x)` and the list `(quote x)` compare equal.
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Quote(a), Value::Quote(b)) => a.as_ref() == b.as_ref(),
            (Value::Quote(a), _) => quote_payload(other) == Some(a.as_ref()),
            (_, Value::Quote(b)) => quote_payload(self) == Some(b.as_ref()),
            (Value::Cons(h1, t1), Value::Cons(h2, t2)) => {
                h1.as_ref() == h2.as_ref() && t1.as_ref() == t2.as_ref()
            }
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Macro(a), Value::Macro(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => {
                a.name == b.name && a.func as usize == b.func as usize
            }
            (Value::Foreign(a), Value::Foreign(b)) => Rc::ptr_eq(a, b),
            (Value::Vector(a), Value::Vector(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// Printer
// ============================================================================

fn escape_str(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            _ => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// Reader shorthand for a two-element `(quote x)` / `(quasi-quote x)` /
/// `(unquote x)` list: the prefix character and the payload.
fn reader_sugar(v: &Value) -> Option<(&'static str, &Value)> {
    let (head, tail) = match v {
        Value::Cons(h, t) => (h.as_ref(), t.as_ref()),
        _ => return None,
    };
    let prefix = match head.as_atom()? {
        "quote" => "'",
        "quasi-quote" => "`",
        "unquote" => ",",
        _ => return None,
    };
    match tail {
        Value::Cons(x, rest) if rest.is_nil() => Some((prefix, x)),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Num(n) => write!(f, "{}", n),
            Value::Atom(name) => write!(f, "{}", name),
            Value::Str(s) => escape_str(s, f),
            Value::Quote(inner) => write!(f, "'{}", inner),
            Value::Cons(head, tail) => {
                if let Some((prefix, payload)) = reader_sugar(self) {
                    return write!(f, "{}{}", prefix, payload);
                }
                write!(f, "({}", head)?;
                let mut cur = tail.as_ref();
                loop {
                    match cur {
                        Value::Nil => break,
                        Value::Cons(h, t) => {
                            write!(f, " {}", h)?;
                            cur = t;
                        }
                        other => {
                            // Dotted pair
                            write!(f, " . {}", other)?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "#<closure:{}>", name),
                None => write!(f, "#<closure>"),
            },
            Value::Macro(c) => match &c.name {
                Some(name) => write!(f, "#<macro:{}>", name),
                None => write!(f, "#<macro>"),
            },
            Value::Primitive(p) => write!(f, "#<primitive:{}>", p.name),
            Value::Foreign(handle) => write!(f, "{}", handle),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Table(map) => {
                write!(f, "{{")?;
                let map = map.borrow();
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by_key(|(k, _)| k.as_str());
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<Value>) -> Value {
        Value::list_from_vec(items)
    }

    #[test]
    fn test_list_display() {
        let simple = list(vec![Value::num(1), Value::num(2), Value::num(3)]);
        assert_eq!(format!("{}", simple), "(1 2 3)");

        let nested = list(vec![
            Value::num(1),
            list(vec![Value::num(2), Value::num(3)]),
            Value::num(4),
        ]);
        assert_eq!(format!("{}", nested), "(1 (2 3) 4)");

        assert_eq!(format!("{}", Value::Nil), "()");
    }

    #[test]
    fn test_dotted_pair_display() {
        let pair = Value::cons(Value::num(1), Value::num(2));
        assert_eq!(format!("{}", pair), "(1 . 2)");
    }

    #[test]
    fn test_quote_display_shorthand() {
        let surface = Value::quoted(Value::atom("x"));
        assert_eq!(format!("{}", surface), "'x");

        let expanded = list(vec![Value::atom("quote"), Value::atom("x")]);
        assert_eq!(format!("{}", expanded), "'x");

        let template = list(vec![Value::atom("quasi-quote"), Value::atom("x")]);
        assert_eq!(format!("{}", template), "`x");
    }

    #[test]
    fn test_string_display_escapes() {
        let s = Value::string("a\"b\\c\nd");
        assert_eq!(format!("{}", s), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn test_structural_equality() {
        let a = list(vec![Value::num(1), Value::atom("x"), Value::string("s")]);
        let b = list(vec![Value::num(1), Value::atom("x"), Value::string("s")]);
        assert_eq!(a, b);

        let c = list(vec![Value::num(1), Value::atom("y")]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_quote_equals_quote_list() {
        let surface = Value::quoted(Value::atom("x"));
        let expanded = list(vec![Value::atom("quote"), Value::atom("x")]);
        assert_eq!(surface, expanded);
        assert_eq!(expanded, surface);
    }

    #[test]
    fn test_list_round_trip() {
        let items = vec![Value::num(1), Value::num(2), Value::num(3)];
        let chain = Value::list_from_vec(items.clone());
        let back = chain.list_to_vec("test").unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_list_to_vec_rejects_dotted_tail() {
        let pair = Value::cons(Value::num(1), Value::num(2));
        assert!(matches!(
            pair.list_to_vec("test"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_is_list() {
        assert!(Value::Nil.is_list());
        assert!(list(vec![Value::num(1)]).is_list());
        assert!(!Value::cons(Value::num(1), Value::num(2)).is_list());
        assert!(!Value::num(1).is_list());
    }

    #[test]
    fn test_keyword_detection() {
        assert!(Value::atom(":key").is_keyword());
        assert!(!Value::atom("key").is_keyword());
        assert!(!Value::num(1).is_keyword());
    }
}
