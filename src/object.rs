//! Runtime value model and the environment chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::Block;

/// A value produced by evaluation.
///
/// Aggregates are reference counted, so binding or passing an array, hash
/// or function shares the underlying storage. Run-time failures are the
/// `Error` variant, carried through evaluation like any other value.
#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(String),
    Array(Rc<Vec<Object>>),
    Hash(Rc<HashMap<HashKey, HashPair>>),
    Function(Rc<Function>),
    Builtin(Builtin),
    ReturnValue(Box<Object>),
    Error(String),
}

/// Type tags, rendered in diagnostics.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ObjectKind {
    Integer,
    Boolean,
    Null,
    Str,
    Array,
    Hash,
    Function,
    Builtin,
    ReturnValue,
    Error,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Integer => write!(f, "INTEGER"),
            ObjectKind::Boolean => write!(f, "BOOLEAN"),
            ObjectKind::Null => write!(f, "NULL"),
            ObjectKind::Str => write!(f, "STRING"),
            ObjectKind::Array => write!(f, "ARRAY"),
            ObjectKind::Hash => write!(f, "HASH"),
            ObjectKind::Function => write!(f, "FUNCTION"),
            ObjectKind::Builtin => write!(f, "BUILTIN"),
            ObjectKind::ReturnValue => write!(f, "RETURN_VALUE"),
            ObjectKind::Error => write!(f, "ERROR"),
        }
    }
}

/// A user-defined function together with the environment captured at its
/// definition site. Free variables in the body resolve against that
/// environment on every call.
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Block,
    pub env: Rc<Environment>,
}

// The captured environment may contain the function itself, so Debug
// stays on this side of the cycle.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish()
    }
}

/// A built-in function. Built-ins receive their evaluated arguments plus
/// the evaluator's output sink (only `puts` writes to it).
pub type BuiltinFn = fn(Vec<Object>, &mut dyn Write) -> Object;

#[derive(Clone, Copy)]
pub struct Builtin(pub BuiltinFn);

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin")
    }
}

/// Key under which a hashable object is stored in a hash.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct HashKey {
    pub kind: ObjectKind,
    pub value: u64,
}

/// A stored hash entry. The original key object is kept alongside the
/// value so the hash can render itself.
#[derive(Debug, PartialEq, Clone)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Integer(_) => ObjectKind::Integer,
            Object::Boolean(_) => ObjectKind::Boolean,
            Object::Null => ObjectKind::Null,
            Object::Str(_) => ObjectKind::Str,
            Object::Array(_) => ObjectKind::Array,
            Object::Hash(_) => ObjectKind::Hash,
            Object::Function(_) => ObjectKind::Function,
            Object::Builtin(_) => ObjectKind::Builtin,
            Object::ReturnValue(_) => ObjectKind::ReturnValue,
            Object::Error(_) => ObjectKind::Error,
        }
    }

    /// Renders the object for the REPL and `puts`.
    pub fn inspect(&self) -> String {
        match self {
            Object::Integer(value) => value.to_string(),
            Object::Boolean(value) => value.to_string(),
            Object::Null => "null".to_string(),
            Object::Str(value) => value.clone(),
            Object::Array(elements) => {
                let elements = elements.iter().map(Object::inspect).collect::<Vec<_>>();
                format!("[{}]", elements.join(", "))
            }
            Object::Hash(pairs) => {
                let pairs = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect::<Vec<_>>();
                format!("{{{}}}", pairs.join(", "))
            }
            Object::Function(func) => {
                format!("fn({}) {{\n{}\n}}", func.parameters.join(", "), func.body)
            }
            Object::Builtin(_) => "builtin function".to_string(),
            Object::ReturnValue(value) => value.inspect(),
            Object::Error(message) => format!("ERROR: {}", message),
        }
    }

    /// Everything is truthy except `false` and `null`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// Only integers, booleans and strings can key a hash.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Object::Integer(value) => *value as u64,
            Object::Boolean(value) => *value as u64,
            Object::Str(value) => fnv1a(value.as_bytes()),
            _ => return None,
        };
        Some(HashKey {
            kind: self.kind(),
            value,
        })
    }
}

// Structural equality for embedders and tests; the language's own `==` is
// decided in the evaluator.
impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Hash(a), Object::Hash(b)) => a == b,
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.0 as usize == b.0 as usize,
            (Object::ReturnValue(a), Object::ReturnValue(b)) => a == b,
            (Object::Error(a), Object::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// FNV-1a, 64 bit.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Maps identifier names to values. Lookup walks the `outer` chain;
/// writes always go to the current frame, so an inner `let` shadows
/// rather than mutates.
#[derive(Debug)]
pub struct Environment {
    store: RefCell<HashMap<String, Object>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Environment> {
        Rc::new(Environment {
            store: RefCell::new(HashMap::new()),
            outer: None,
        })
    }

    /// Creates the frame for a function call, enclosed by the closure's
    /// captured environment.
    pub fn new_enclosed(outer: Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            store: RefCell::new(HashMap::new()),
            outer: Some(outer),
        })
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        match self.store.borrow().get(name) {
            Some(obj) => Some(obj.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }

    pub fn set(&self, name: impl Into<String>, val: Object) {
        self.store.borrow_mut().insert(name.into(), val);
    }
}
