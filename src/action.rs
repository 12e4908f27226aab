//! Action records exchanged between tester, model and implementation.
//!
//! An [`Action`] is an immutable name plus an ordered argument list.
//! Equality, ordering and hashing are structural, so actions can be used as
//! map or bag keys and compared literally when replaying recorded traces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An argument value carried by an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Action(Box<Action>),
}

impl Value {
    /// The integer payload, if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string payload, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Action> for Value {
    fn from(a: Action) -> Self {
        Value::Action(Box::new(a))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_separated(f, items)?;
                f.write_str("]")
            }
            Value::Action(a) => write!(f, "{a}"),
        }
    }
}

/// A named, argument-carrying action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    name: String,
    #[serde(default)]
    args: Vec<Value>,
}

impl Action {
    /// Create an action from a name and its arguments.
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Create an action without arguments.
    pub fn nullary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// The action symbol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_separated(f, &self.args)?;
        f.write_str(")")
    }
}

fn write_separated(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

/// Build an [`Action`] from a name and argument expressions.
///
/// Each argument is converted with `Value::from`.
///
/// ```
/// use mbt_conform::{action, Action, Value};
///
/// let a = action!("Receive", "a", "hi", "b");
/// assert_eq!(a.name(), "Receive");
/// assert_eq!(a.arg(1), Some(&Value::from("hi")));
/// assert_eq!(action!("Timeout"), Action::nullary("Timeout"));
/// ```
#[macro_export]
macro_rules! action {
    ($name:expr $(, $arg:expr)* $(,)?) => {{
        let args: ::std::vec::Vec<$crate::Value> = ::std::vec![$($crate::Value::from($arg)),*];
        $crate::Action::new($name, args)
    }};
}
