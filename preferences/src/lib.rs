//! Typed, defaultable, savable preferences over a transactional key-value
//! store.
//!
//! # Key Concepts
//!
//! - **PreferencesRepository**: the facade over one store. It hands out
//!   [`Flow`](storeflow::Flow)s that always emit a usable value, saves values
//!   in store transactions, and builds [`StoreFlow`](storeflow::StoreFlow)s
//!   that carry both.
//! - **Entry**: a typed key plus the supplier of its default. [`UriEntry`],
//!   [`LocalDateTimeEntry`] and [`EnumEntry`] persist their values as strings
//!   or ordinals.
//! - **Codec**: converts between the type callers use and the type the store
//!   holds. Whatever a codec cannot decode reads as the default.
//! - **StoreFlowMap**: application keys mapped to entries, read as one flow
//!   per key and saved in a single transaction.
//!
//! # Example
//!
//! ```ignore
//! use common::{int_key, string_key};
//! use preferences::{Config, PreferencesRepository};
//! use storeflow::{Scope, SharingStarted};
//!
//! let repository = PreferencesRepository::open(Config::default()).await?;
//!
//! let homepage = repository.uri_store_flow(&string_key("homepage"), || None);
//! homepage.save(Some("https://example.com".parse()?)).await?;
//!
//! let scope = Scope::new();
//! let launches = repository
//!     .store_flow(&int_key("launches"), || 0)
//!     .state_in(&scope, SharingStarted::Eagerly);
//! println!("launched {} times", launches.value());
//! ```

mod codec;
mod config;
mod entry;
mod error;
mod map;
mod repository;

pub use codec::{
    Codec, DEFAULT_LIST_SEPARATOR, DEFAULT_STRING_VALUE, EnumCodec, FnCodec, ListCodec,
    LocalDateTimeCodec, Ordinal, UNKNOWN_ORDINAL, UriCodec,
};
pub use config::Config;
pub use entry::{DefaultFn, Entry, EnumEntry, LocalDateTimeEntry, UriEntry};
pub use error::{Error, Result};
pub use map::{StoreFlowMap, StoreStateFlowMap};
pub use repository::{PreferencesRepository, RepositoryBuilder};
