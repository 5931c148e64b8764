//! Temp data property synchronisation
//!
//! Carries selected fields of a request's subject over to the session's next
//! request through temp data.
//!
//! # Core Concepts
//!
//! - [`PropertySyncFilter`]: load before the subject runs, save changes after
//! - [`FieldDescriptor`]: one synchronised field and its accessor
//! - [`TempDataFields`]: how a subject type lists its fields
//! - [`FieldMetadataCache`]: field sets built once per subject type
//! - [`ActionInvoker`]: drives the hooks in request order
//!
//! # Example
//!
//! ```rust,ignore
//! use tempdata_props::{FieldDescriptor, FilterConfig, PropertySyncFilterFactory, TempDataFields};
//!
//! #[derive(Default)]
//! struct Checkout {
//!     notice: Option<String>,
//! }
//!
//! impl TempDataFields for Checkout {
//!     fn temp_data_fields() -> Vec<FieldDescriptor<Self>> {
//!         vec![FieldDescriptor::optional(
//!             "Notice",
//!             |c: &Checkout| &c.notice,
//!             |c: &mut Checkout| &mut c.notice,
//!         )]
//!     }
//! }
//!
//! let factory = PropertySyncFilterFactory::new(FilterConfig::default());
//! let mut filter = factory.create::<Checkout>()?;
//! let mut checkout = Checkout::default();
//!
//! filter.load(&mut temp_data, &mut checkout)?;
//! checkout.notice = Some("Order placed".into());
//! filter.save_changes(&mut temp_data, Some(&checkout))?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod field;
mod filter;
mod metadata;
mod pipeline;

pub use config::{FilterConfig, DEFAULT_KEY_PREFIX};
pub use error::{AccessError, FieldError, SyncError, SyncResult};
pub use field::{FieldAccessor, FieldDescriptor, FieldSet};
pub use filter::{FilterState, PropertySyncFilter, PropertySyncFilterFactory, Snapshot};
pub use metadata::{FieldMetadataCache, TempDataFields};
pub use pipeline::{ActionFilter, ActionInvoker, SaveTempDataCallback};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
