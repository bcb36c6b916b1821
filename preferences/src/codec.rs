//! Conversions between the types callers work with and the types the store
//! can hold.
//!
//! A [`Codec`] encodes an external value into its savable form and decodes it
//! back. Decoding may fail, in which case readers fall back to the entry's
//! default; a stored value that cannot be decoded never surfaces as an error.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;
use common::PreferenceType;
use strum::IntoEnumIterator;
use url::Url;

/// Stored in place of an absent URI or timestamp.
///
/// An external value whose text form is empty cannot be told apart from
/// "no value" and reads back as the default.
pub const DEFAULT_STRING_VALUE: &str = "";

/// Stored for an enum value that has no ordinal. Never decodes to a variant.
pub const UNKNOWN_ORDINAL: i32 = -1;

/// Separator used by list flows unless another is given.
pub const DEFAULT_LIST_SEPARATOR: &str = ",";

const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const LOCAL_DATE_TIME_PARSE_FORMATS: [&str; 3] = [
    LOCAL_DATE_TIME_FORMAT,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Two-way conversion between an external type `E` and a savable type.
pub trait Codec<E>: Send + Sync + 'static {
    type Savable: PreferenceType;

    fn encode(&self, value: &E) -> Self::Savable;

    /// Returns `None` when `savable` does not represent any `E`.
    fn decode(&self, savable: Self::Savable) -> Option<E>;
}

/// Declaration-order index of an enum variant.
///
/// Implemented for every enum deriving [`strum::EnumIter`] and `PartialEq`.
pub trait Ordinal: Sized {
    /// Returns `None` when the value equals none of the iterated variants,
    /// as with a data-carrying variant whose payload differs from the one
    /// the iterator yields.
    fn ordinal(&self) -> Option<i32>;

    /// Returns the variant at `ordinal`, or `None` if out of range.
    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

impl<E> Ordinal for E
where
    E: IntoEnumIterator + PartialEq,
{
    fn ordinal(&self) -> Option<i32> {
        let index = E::iter().position(|variant| variant == *self)?;
        i32::try_from(index).ok()
    }

    fn from_ordinal(ordinal: i32) -> Option<Self> {
        let index = usize::try_from(ordinal).ok()?;
        E::iter().nth(index)
    }
}

/// `Option<Url>` as a string. `None` and [`DEFAULT_STRING_VALUE`] map to each
/// other; a string that does not parse as a URL decodes to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriCodec;

impl Codec<Option<Url>> for UriCodec {
    type Savable = String;

    fn encode(&self, value: &Option<Url>) -> String {
        match value {
            Some(url) => url.to_string(),
            None => DEFAULT_STRING_VALUE.to_string(),
        }
    }

    fn decode(&self, savable: String) -> Option<Option<Url>> {
        if savable == DEFAULT_STRING_VALUE {
            return None;
        }
        match Url::parse(&savable) {
            Ok(url) => Some(Some(url)),
            Err(err) => {
                tracing::warn!(value = %savable, error = %err, "stored URI does not parse");
                None
            }
        }
    }
}

/// `Option<NaiveDateTime>` as ISO-8601 local date-time text, for example
/// `2024-03-01T12:30:00`.
///
/// Decoding also accepts a space instead of `T` and the minute-precision form
/// `2024-03-01T12:30`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDateTimeCodec;

impl Codec<Option<NaiveDateTime>> for LocalDateTimeCodec {
    type Savable = String;

    fn encode(&self, value: &Option<NaiveDateTime>) -> String {
        match value {
            Some(date_time) => date_time.format(LOCAL_DATE_TIME_FORMAT).to_string(),
            None => DEFAULT_STRING_VALUE.to_string(),
        }
    }

    fn decode(&self, savable: String) -> Option<Option<NaiveDateTime>> {
        if savable == DEFAULT_STRING_VALUE {
            return None;
        }
        let parsed = LOCAL_DATE_TIME_PARSE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&savable, format).ok());
        if parsed.is_none() {
            tracing::warn!(value = %savable, "stored local date-time does not parse");
        }
        parsed.map(Some)
    }
}

/// An enum as its [`Ordinal`]. Out-of-range ordinals decode to `None`.
///
/// A value without an ordinal encodes as [`UNKNOWN_ORDINAL`]. Saves go
/// through [`PreferencesRepository::save_enum`](crate::PreferencesRepository::save_enum),
/// which rejects such a value instead of storing it.
pub struct EnumCodec<E> {
    _enum: PhantomData<fn() -> E>,
}

impl<E> EnumCodec<E> {
    pub fn new() -> Self {
        Self { _enum: PhantomData }
    }
}

impl<E> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Codec<E> for EnumCodec<E>
where
    E: Ordinal + 'static,
{
    type Savable = i32;

    fn encode(&self, value: &E) -> i32 {
        value.ordinal().unwrap_or(UNKNOWN_ORDINAL)
    }

    fn decode(&self, savable: i32) -> Option<E> {
        E::from_ordinal(savable)
    }
}

type ElementSerializer<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type ElementDeserializer<T> = Arc<dyn Fn(&str) -> T + Send + Sync>;

/// A list joined into one string.
///
/// Elements must never contain the separator once serialized; such a list
/// does not survive a round trip. The empty string decodes to the empty list,
/// so a list holding a single element that serializes to `""` reads back
/// empty.
pub struct ListCodec<T> {
    separator: String,
    serialize: ElementSerializer<T>,
    deserialize: ElementDeserializer<T>,
}

impl<T> ListCodec<T> {
    pub fn new<S, D>(separator: impl Into<String>, serialize: S, deserialize: D) -> Self
    where
        S: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> T + Send + Sync + 'static,
    {
        Self {
            separator: separator.into(),
            serialize: Arc::new(serialize),
            deserialize: Arc::new(deserialize),
        }
    }

    /// A codec using [`DEFAULT_LIST_SEPARATOR`].
    pub fn with_default_separator<S, D>(serialize: S, deserialize: D) -> Self
    where
        S: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> T + Send + Sync + 'static,
    {
        Self::new(DEFAULT_LIST_SEPARATOR, serialize, deserialize)
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl<T: 'static> Codec<Vec<T>> for ListCodec<T> {
    type Savable = String;

    fn encode(&self, value: &Vec<T>) -> String {
        value
            .iter()
            .map(|element| (self.serialize)(element))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    fn decode(&self, savable: String) -> Option<Vec<T>> {
        if savable.is_empty() {
            return Some(Vec::new());
        }
        Some(
            savable
                .split(self.separator.as_str())
                .map(|element| (self.deserialize)(element))
                .collect(),
        )
    }
}

type ToSavable<E, S> = Arc<dyn Fn(&E) -> S + Send + Sync>;
type ToExternal<E, S> = Arc<dyn Fn(S) -> E + Send + Sync>;

/// A codec built from a pair of conversion closures. Decoding always
/// succeeds.
pub struct FnCodec<E, S> {
    to_savable: ToSavable<E, S>,
    to_external: ToExternal<E, S>,
}

impl<E, S> FnCodec<E, S> {
    pub fn new<F, G>(to_savable: F, to_external: G) -> Self
    where
        F: Fn(&E) -> S + Send + Sync + 'static,
        G: Fn(S) -> E + Send + Sync + 'static,
    {
        Self {
            to_savable: Arc::new(to_savable),
            to_external: Arc::new(to_external),
        }
    }
}

impl<E, S> Codec<E> for FnCodec<E, S>
where
    E: 'static,
    S: PreferenceType,
{
    type Savable = S;

    fn encode(&self, value: &E) -> S {
        (self.to_savable)(value)
    }

    fn decode(&self, savable: S) -> Option<E> {
        Some((self.to_external)(savable))
    }
}
