// ABOUTME: C-ABI foreign function bridge built on libloading

use crate::env::Environment;
use crate::error::EvalError;
use crate::value::{Arity, Value};
use libloading::Library;
use log::debug;
use std::ffi::{c_char, CStr, CString};
use std::fmt;
use std::rc::Rc;

/// Calls are dispatched through a fixed set of transmuted signatures
const MAX_FFI_ARGS: usize = 6;

/// Marshalled element types of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    /// C `long`, carried as the Num payload
    Int,
    /// NUL-terminated byte pointer, carried as Str
    Str,
    /// Void; only valid as a return type
    Void,
}

impl FfiType {
    fn from_name(name: &str) -> Result<FfiType, EvalError> {
        match name {
            "int" => Ok(FfiType::Int),
            "string" => Ok(FfiType::Str),
            "nil" => Ok(FfiType::Void),
            other => Err(EvalError::Ffi(format!("unsupported type: {}", other))),
        }
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfiType::Int => write!(f, "int"),
            FfiType::Str => write!(f, "string"),
            FfiType::Void => write!(f, "nil"),
        }
    }
}

/// An opaque native handle. Function handles keep their library alive
/// through the shared `Rc`, so a resolved symbol never outlives the
/// object it was loaded from; dropping the last handle unloads it.
pub enum ForeignValue {
    Library {
        path: String,
        lib: Rc<Library>,
    },
    Function {
        name: String,
        ret: FfiType,
        params: Vec<FfiType>,
        addr: *const (),
        _lib: Rc<Library>,
    },
}

impl fmt::Display for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignValue::Library { path, .. } => write!(f, "#<foreign:lib:{}>", path),
            ForeignValue::Function { name, params, .. } => {
                write!(f, "#<foreign:fn:{}/{}>", name, params.len())
            }
        }
    }
}

impl fmt::Debug for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

fn string_arg(op: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Atom(name) => Ok(name.to_string()),
        other => Err(EvalError::type_error(op, "str", other)),
    }
}

/// (ffi/open path) -> library handle
fn builtin_ffi_open(args: &[Value]) -> Result<Value, EvalError> {
    let path = string_arg("ffi/open", &args[0])?;
    debug!("ffi/open {}", path);
    let lib = unsafe { Library::new(&path) }
        .map_err(|e| EvalError::Ffi(format!("cannot open {}: {}", path, e)))?;
    Ok(Value::Foreign(Rc::new(ForeignValue::Library {
        path,
        lib: Rc::new(lib),
    })))
}

/// (ffi/get lib name (ret arg...)) -> function handle
///
/// The first element of the type list is the return type; the rest
/// describe the parameters in order.
fn builtin_ffi_get(args: &[Value]) -> Result<Value, EvalError> {
    let (path, lib) = match &args[0] {
        Value::Foreign(handle) => match handle.as_ref() {
            ForeignValue::Library { path, lib } => (path.clone(), lib.clone()),
            other => {
                return Err(EvalError::Ffi(format!(
                    "ffi/get expects a library handle, got {}",
                    other
                )))
            }
        },
        other => return Err(EvalError::type_error("ffi/get", "foreign", other)),
    };

    let name = string_arg("ffi/get", &args[1])?;
    let signature = args[2].list_to_vec("ffi/get")?;
    if signature.is_empty() {
        return Err(EvalError::Ffi("missing return type".to_string()));
    }

    let mut types = Vec::with_capacity(signature.len());
    for item in &signature {
        let tname = item
            .as_atom()
            .ok_or_else(|| EvalError::type_error("ffi/get", "atom", item))?;
        types.push(FfiType::from_name(tname)?);
    }
    let ret = types[0];
    let params = types[1..].to_vec();
    if params.contains(&FfiType::Void) {
        return Err(EvalError::Ffi(
            "nil is only valid as a return type".to_string(),
        ));
    }
    if params.len() > MAX_FFI_ARGS {
        return Err(EvalError::Ffi(format!(
            "{}: at most {} arguments are supported",
            name, MAX_FFI_ARGS
        )));
    }

    let mut symbol = name.clone().into_bytes();
    symbol.push(0);
    let addr: *const () = unsafe {
        let sym: libloading::Symbol<*const ()> = lib
            .get(&symbol)
            .map_err(|e| EvalError::Ffi(format!("symbol {} not found in {}: {}", name, path, e)))?;
        *sym
    };
    debug!("ffi/get {}:{} ({:?} -> {:?})", path, name, params, ret);

    Ok(Value::Foreign(Rc::new(ForeignValue::Function {
        name,
        ret,
        params,
        addr,
        _lib: lib,
    })))
}

/// (ffi/apply fn (arg...)) -> marshalled call result
fn builtin_ffi_apply(args: &[Value]) -> Result<Value, EvalError> {
    let (name, ret, params, addr) = match &args[0] {
        Value::Foreign(handle) => match handle.as_ref() {
            ForeignValue::Function {
                name,
                ret,
                params,
                addr,
                ..
            } => (name.clone(), *ret, params.clone(), *addr),
            other => {
                return Err(EvalError::Ffi(format!(
                    "ffi/apply expects a function handle, got {}",
                    other
                )))
            }
        },
        other => return Err(EvalError::type_error("ffi/apply", "foreign", other)),
    };

    let call_args = args[1].list_to_vec("ffi/apply")?;
    if call_args.len() != params.len() {
        return Err(EvalError::Ffi(format!(
            "{}: expected {} arguments, got {}",
            name,
            params.len(),
            call_args.len()
        )));
    }

    // CStrings must stay alive for the duration of the call
    let mut owned_strings = Vec::new();
    let mut words = Vec::with_capacity(call_args.len());
    for (i, (arg, ty)) in call_args.iter().zip(params.iter()).enumerate() {
        match (ty, arg) {
            (FfiType::Int, Value::Num(n)) => words.push(*n),
            (FfiType::Str, Value::Str(s)) => {
                let c = CString::new(s.as_ref()).map_err(|_| {
                    EvalError::Ffi(format!("{}: argument {} contains NUL", name, i + 1))
                })?;
                words.push(c.as_ptr() as u64);
                owned_strings.push(c);
            }
            (ty, other) => {
                return Err(EvalError::Ffi(format!(
                    "{}: argument {} expected {}, got {}",
                    name,
                    i + 1,
                    ty,
                    other.type_name()
                )))
            }
        }
    }

    debug!("ffi/apply {}/{}", name, words.len());
    let raw = unsafe { call_raw(addr, &words) };

    Ok(match ret {
        FfiType::Void => Value::Nil,
        FfiType::Int => Value::Num(raw),
        FfiType::Str => {
            if raw == 0 {
                Value::Nil
            } else {
                let s = unsafe { CStr::from_ptr(raw as *const c_char) };
                Value::string(s.to_string_lossy())
            }
        }
    })
}

/// Invoke a native entry point with word-sized arguments.
///
/// # Safety
/// `addr` must point to a C function whose true signature matches the
/// word count; the declared types were validated at `ffi/get` time.
unsafe fn call_raw(addr: *const (), words: &[u64]) -> u64 {
    use std::mem::transmute;
    match *words {
        [] => transmute::<*const (), extern "C" fn() -> u64>(addr)(),
        [a] => transmute::<*const (), extern "C" fn(u64) -> u64>(addr)(a),
        [a, b] => transmute::<*const (), extern "C" fn(u64, u64) -> u64>(addr)(a, b),
        [a, b, c] => transmute::<*const (), extern "C" fn(u64, u64, u64) -> u64>(addr)(a, b, c),
        [a, b, c, d] => {
            transmute::<*const (), extern "C" fn(u64, u64, u64, u64) -> u64>(addr)(a, b, c, d)
        }
        [a, b, c, d, e] => transmute::<*const (), extern "C" fn(u64, u64, u64, u64, u64) -> u64>(
            addr,
        )(a, b, c, d, e),
        [a, b, c, d, e, f] => transmute::<
            *const (),
            extern "C" fn(u64, u64, u64, u64, u64, u64) -> u64,
        >(addr)(a, b, c, d, e, f),
        // Count is bounded at ffi/get time
        _ => unreachable!("ffi argument count exceeds {}", MAX_FFI_ARGS),
    }
}

/// Register the bridge primitives in the environment
pub fn register(env: &Rc<Environment>) {
    crate::builtins::define_primitive(env, "ffi/open", Arity::Exactly(1), builtin_ffi_open);
    crate::builtins::define_primitive(env, "ffi/get", Arity::Exactly(3), builtin_ffi_get);
    crate::builtins::define_primitive(env, "ffi/apply", Arity::Exactly(2), builtin_ffi_apply);
}
