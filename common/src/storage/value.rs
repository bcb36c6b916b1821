//! Savable value types and typed keys.
//!
//! The store holds a closed set of value representations ([`PreferenceValue`]).
//! [`PreferenceType`] ties each supported Rust type to its variant, and
//! [`Key`] names one slot in the store together with the type stored there.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

/// A value as held by the store.
#[derive(Clone, Debug, PartialEq)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    StringSet(BTreeSet<String>),
    Bytes(Bytes),
}

impl PreferenceValue {
    /// Name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PreferenceValue::Bool(_) => bool::TYPE_NAME,
            PreferenceValue::Int(_) => i32::TYPE_NAME,
            PreferenceValue::Long(_) => i64::TYPE_NAME,
            PreferenceValue::Float(_) => f32::TYPE_NAME,
            PreferenceValue::Double(_) => f64::TYPE_NAME,
            PreferenceValue::String(_) => String::TYPE_NAME,
            PreferenceValue::StringSet(_) => <BTreeSet<String>>::TYPE_NAME,
            PreferenceValue::Bytes(_) => Bytes::TYPE_NAME,
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceValue::Bool(v) => write!(f, "{}", v),
            PreferenceValue::Int(v) => write!(f, "{}", v),
            PreferenceValue::Long(v) => write!(f, "{}", v),
            PreferenceValue::Float(v) => write!(f, "{}", v),
            PreferenceValue::Double(v) => write!(f, "{}", v),
            PreferenceValue::String(v) => write!(f, "{:?}", v),
            PreferenceValue::StringSet(v) => write!(f, "{:?}", v),
            PreferenceValue::Bytes(v) => write!(f, "{} bytes", v.len()),
        }
    }
}

/// A Rust type the store can hold natively.
pub trait PreferenceType: Clone + fmt::Debug + Send + Sync + 'static {
    /// Name of the stored representation, used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Wraps the value in its stored representation.
    fn into_value(self) -> PreferenceValue;

    /// Extracts the value, or `None` if `value` holds a different type.
    fn from_value(value: &PreferenceValue) -> Option<Self>;
}

macro_rules! preference_type {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl PreferenceType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn into_value(self) -> PreferenceValue {
                PreferenceValue::$variant(self)
            }

            fn from_value(value: &PreferenceValue) -> Option<Self> {
                match value {
                    PreferenceValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

preference_type!(bool, Bool, "bool");
preference_type!(i32, Int, "int");
preference_type!(i64, Long, "long");
preference_type!(f32, Float, "float");
preference_type!(f64, Double, "double");
preference_type!(String, String, "string");
preference_type!(BTreeSet<String>, StringSet, "string_set");
preference_type!(Bytes, Bytes, "bytes");

/// Strongly-typed name of one slot in the store.
///
/// Keys compare and hash by name only; the type parameter records what the
/// slot holds.
pub struct Key<T> {
    name: Arc<str>,
    _type: PhantomData<fn() -> T>,
}

impl<T: PreferenceType> Key<T> {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            _type: PhantomData,
        }
    }
}

impl<T> Key<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

pub fn bool_key(name: &str) -> Key<bool> {
    Key::new(name)
}

pub fn int_key(name: &str) -> Key<i32> {
    Key::new(name)
}

pub fn long_key(name: &str) -> Key<i64> {
    Key::new(name)
}

pub fn float_key(name: &str) -> Key<f32> {
    Key::new(name)
}

pub fn double_key(name: &str) -> Key<f64> {
    Key::new(name)
}

pub fn string_key(name: &str) -> Key<String> {
    Key::new(name)
}

pub fn string_set_key(name: &str) -> Key<BTreeSet<String>> {
    Key::new(name)
}

pub fn bytes_key(name: &str) -> Key<Bytes> {
    Key::new(name)
}
