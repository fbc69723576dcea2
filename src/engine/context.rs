//! Context capability set and reflection adapters.
//!
//! The renderer never sees concrete data types. It talks to the context
//! stack through [`ContextValue`], a narrow capability table a host
//! implements once per value system. Adapters for native Rust types,
//! `serde_json::Value` and key-value maps ship with the crate; anything
//! else plugs in the same way.

use std::collections::{BTreeMap, HashMap};

/// Discriminator for an opaque data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Nil,
    Bool,
    Integer,
    Float,
    String,
    Enum,
    Struct,
    Sequence,
    Tuple,
    Optional,
    Lambda,
}

/// The capability table the renderer uses to inspect host data.
///
/// Every method except [`kind`](ContextValue::kind) has a conservative
/// default, so an adapter only implements the capabilities its kind
/// actually answers: structs expose [`member`](ContextValue::member),
/// sequences [`len`](ContextValue::len) and
/// [`index`](ContextValue::index), and so on.
///
/// # Examples
///
/// ```rust
/// use mustache_pipeline::{ContextValue, Template, ValueKind};
/// use std::collections::HashMap;
///
/// let mut data: HashMap<String, String> = HashMap::new();
/// data.insert("name".to_string(), "World".to_string());
///
/// let template = Template::parse("Hello {{name}}!").unwrap();
/// let out = template.render_to_string(&data, &Default::default()).unwrap();
/// assert_eq!(out, "Hello World!");
/// assert_eq!(data.kind(), ValueKind::Struct);
/// ```
pub trait ContextValue {
    fn kind(&self) -> ValueKind;

    /// Fetch a named member of a struct-like value.
    fn member(&self, _name: &str) -> Option<&dyn ContextValue> {
        None
    }

    /// Number of elements of a sequence or tuple.
    fn len(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch an element of a sequence or tuple by position.
    fn index(&self, _index: usize) -> Option<&dyn ContextValue> {
        None
    }

    /// The inner value of a present optional, `None` when absent.
    fn unwrap_optional(&self) -> Option<&dyn ContextValue> {
        None
    }

    /// Byte view of a string value.
    fn as_str(&self) -> Option<&str> {
        None
    }

    fn as_bool(&self) -> Option<bool> {
        None
    }

    fn as_integer(&self) -> Option<i128> {
        None
    }

    fn as_float(&self) -> Option<f64> {
        None
    }

    /// Tag name of an enum-like value; interpolations render it verbatim.
    fn enum_tag(&self) -> Option<&str> {
        None
    }

    /// Invoke a lambda with the raw tag body (empty for interpolation
    /// tags). `None` is a swallowed failure: the lambda contributes empty
    /// output and rendering continues.
    fn invoke(&self, _raw_body: &str) -> Option<String> {
        None
    }
}

/* ---------- native type adapters ----------------------------------------- */

impl ContextValue for bool {
    fn kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn as_bool(&self) -> Option<bool> {
        Some(*self)
    }
}

macro_rules! integer_adapter {
    ($($ty:ty),*) => {
        $(impl ContextValue for $ty {
            fn kind(&self) -> ValueKind {
                ValueKind::Integer
            }

            fn as_integer(&self) -> Option<i128> {
                Some(*self as i128)
            }
        })*
    };
}

integer_adapter!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_adapter {
    ($($ty:ty),*) => {
        $(impl ContextValue for $ty {
            fn kind(&self) -> ValueKind {
                ValueKind::Float
            }

            fn as_float(&self) -> Option<f64> {
                Some(*self as f64)
            }
        })*
    };
}

float_adapter!(f32, f64);

impl ContextValue for str {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn as_str(&self) -> Option<&str> {
        Some(self)
    }
}

impl ContextValue for String {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn as_str(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: ContextValue> ContextValue for Option<T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Optional
    }

    fn unwrap_optional(&self) -> Option<&dyn ContextValue> {
        self.as_ref().map(|inner| inner as &dyn ContextValue)
    }
}

impl<T: ContextValue> ContextValue for [T] {
    fn kind(&self) -> ValueKind {
        ValueKind::Sequence
    }

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        self.get(index).map(|item| item as &dyn ContextValue)
    }
}

impl<T: ContextValue> ContextValue for Vec<T> {
    fn kind(&self) -> ValueKind {
        ValueKind::Sequence
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        self.get(index).map(|item| item as &dyn ContextValue)
    }
}

impl<A: ContextValue, B: ContextValue> ContextValue for (A, B) {
    fn kind(&self) -> ValueKind {
        ValueKind::Tuple
    }

    fn len(&self) -> usize {
        2
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        match index {
            0 => Some(&self.0),
            1 => Some(&self.1),
            _ => None,
        }
    }
}

impl<A: ContextValue, B: ContextValue, C: ContextValue> ContextValue for (A, B, C) {
    fn kind(&self) -> ValueKind {
        ValueKind::Tuple
    }

    fn len(&self) -> usize {
        3
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        match index {
            0 => Some(&self.0),
            1 => Some(&self.1),
            2 => Some(&self.2),
            _ => None,
        }
    }
}

impl<V: ContextValue> ContextValue for HashMap<String, V> {
    fn kind(&self) -> ValueKind {
        ValueKind::Struct
    }

    fn member(&self, name: &str) -> Option<&dyn ContextValue> {
        self.get(name).map(|value| value as &dyn ContextValue)
    }
}

impl<V: ContextValue> ContextValue for BTreeMap<String, V> {
    fn kind(&self) -> ValueKind {
        ValueKind::Struct
    }

    fn member(&self, name: &str) -> Option<&dyn ContextValue> {
        self.get(name).map(|value| value as &dyn ContextValue)
    }
}

impl ContextValue for Box<dyn ContextValue> {
    fn kind(&self) -> ValueKind {
        (**self).kind()
    }

    fn member(&self, name: &str) -> Option<&dyn ContextValue> {
        (**self).member(name)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        (**self).index(index)
    }

    fn unwrap_optional(&self) -> Option<&dyn ContextValue> {
        (**self).unwrap_optional()
    }

    fn as_str(&self) -> Option<&str> {
        (**self).as_str()
    }

    fn as_bool(&self) -> Option<bool> {
        (**self).as_bool()
    }

    fn as_integer(&self) -> Option<i128> {
        (**self).as_integer()
    }

    fn as_float(&self) -> Option<f64> {
        (**self).as_float()
    }

    fn enum_tag(&self) -> Option<&str> {
        (**self).enum_tag()
    }

    fn invoke(&self, raw_body: &str) -> Option<String> {
        (**self).invoke(raw_body)
    }
}

/* ---------- JSON adapter -------------------------------------------------- */

impl ContextValue for serde_json::Value {
    fn kind(&self) -> ValueKind {
        match self {
            serde_json::Value::Null => ValueKind::Nil,
            serde_json::Value::Bool(_) => ValueKind::Bool,
            serde_json::Value::Number(n) => {
                if n.is_f64() {
                    ValueKind::Float
                } else {
                    ValueKind::Integer
                }
            }
            serde_json::Value::String(_) => ValueKind::String,
            serde_json::Value::Array(_) => ValueKind::Sequence,
            serde_json::Value::Object(_) => ValueKind::Struct,
        }
    }

    fn member(&self, name: &str) -> Option<&dyn ContextValue> {
        self.as_object()
            .and_then(|object| object.get(name))
            .map(|value| value as &dyn ContextValue)
    }

    fn len(&self) -> usize {
        self.as_array().map_or(0, Vec::len)
    }

    fn index(&self, index: usize) -> Option<&dyn ContextValue> {
        self.as_array()
            .and_then(|array| array.get(index))
            .map(|value| value as &dyn ContextValue)
    }

    fn as_str(&self) -> Option<&str> {
        serde_json::Value::as_str(self)
    }

    fn as_bool(&self) -> Option<bool> {
        serde_json::Value::as_bool(self)
    }

    fn as_integer(&self) -> Option<i128> {
        match self {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        serde_json::Value::as_f64(self)
    }
}

/* ---------- lambdas ------------------------------------------------------- */

/// A host-provided callable usable anywhere a context value is.
///
/// The renderer hands the lambda the raw tag body (the unrendered bytes
/// between a section's tags, or the empty string for interpolation tags)
/// and re-parses whatever comes back as a template with the delimiters
/// current at the tag.
///
/// # Examples
///
/// ```rust
/// use mustache_pipeline::{ContextValue, Lambda, Template};
/// use std::collections::HashMap;
///
/// let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
/// data.insert("name".to_string(), Box::new("World".to_string()));
/// data.insert(
///     "shout".to_string(),
///     Box::new(Lambda::new(|body: &str| format!("{}!!", body.trim()))),
/// );
///
/// let template = Template::parse("{{#shout}}hello {{name}}{{/shout}}").unwrap();
/// let out = template.render_to_string(&data, &Default::default()).unwrap();
/// assert_eq!(out, "hello World!!");
/// ```
pub struct Lambda {
    f: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl Lambda {
    /// Wrap an infallible lambda.
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Lambda {
            f: Box::new(move |raw| Some(f(raw))),
        }
    }

    /// Wrap a lambda that may fail. A `None` return is swallowed: the tag
    /// contributes empty output and rendering continues.
    pub fn fallible(f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Lambda { f: Box::new(f) }
    }
}

impl ContextValue for Lambda {
    fn kind(&self) -> ValueKind {
        ValueKind::Lambda
    }

    fn invoke(&self, raw_body: &str) -> Option<String> {
        (self.f)(raw_body)
    }
}
