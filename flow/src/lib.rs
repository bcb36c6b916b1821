//! Reactive values over a persisted store.
//!
//! A [`StoreFlow`] wraps a continuously updating [`Flow`] of one persisted
//! value together with the value's default and an operation to save a new
//! value. It can be promoted to a [`StoreStateFlow`], a cached current-value
//! holder that lives in a [`Scope`] and follows its upstream according to a
//! [`SharingStarted`] policy.
//!
//! # Example
//!
//! ```ignore
//! use storeflow::{Scope, SharingStarted};
//!
//! let scope = Scope::new();
//! let theme = repository.theme();                 // StoreFlow<Theme>
//! let state = theme.state_in(&scope, SharingStarted::Eagerly);
//!
//! println!("current theme: {:?}", state.value());
//! state.save(Theme::Dark).await?;
//!
//! // Stop following the store.
//! scope.cancel();
//! ```

mod error;
mod flow;
mod scope;
mod state;
mod store_flow;

pub use error::{Error, Result};
pub use flow::Flow;
pub use scope::{Scope, SharingStarted};
pub use state::StoreStateFlow;
pub use store_flow::{SaveFn, StoreFlow};
