//! Temp data storage
//!
//! A per-session key/value carryover whose entries survive exactly one
//! subsequent request unless they are kept or written again.
//!
//! # Core Concepts
//!
//! - [`TempDataStore`]: the narrow get/set contract consumed by property sync
//! - [`TempDataDictionary`]: request-scoped dictionary with read-once semantics
//! - [`TempDataProvider`]: persistence seam between requests
//! - [`SessionTempDataProvider`]: in-memory, session-keyed provider
//! - [`TempDataDictionaryFactory`]: resolves the dictionary for a request
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tempdata_store::{RequestContext, SessionId, SessionTempDataProvider, TempDataDictionaryFactory};
//!
//! let factory = TempDataDictionaryFactory::new(Arc::new(SessionTempDataProvider::new()));
//! let mut ctx = RequestContext::new(SessionId::new("user-1"));
//!
//! let temp_data = factory.get_temp_data(&mut ctx)?;
//! temp_data.set("Message", serde_json::json!("saved"))?;
//! factory.save(&mut ctx)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod dictionary;
mod error;
mod factory;
mod provider;
mod store;
mod value;

pub use dictionary::TempDataDictionary;
pub use error::{StoreError, StoreResult};
pub use factory::{RequestContext, TempDataDictionaryFactory};
pub use provider::{SessionTempDataProvider, TempDataProvider};
pub use store::TempDataStore;
pub use value::{SessionId, TempValue, TempValues};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
