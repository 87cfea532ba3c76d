//! Mercado is a persistence layer for multi-store e-commerce platforms.
//!
//! Entity managers map domain items (customer addresses, customer property
//! types) onto relational tables through SQL templates held in external
//! configuration. Every record belongs to exactly one site, every search is
//! scoped to the sites visible from the current one, and every write stamps
//! the editor identity supplied by the [`Context`].

pub mod common;
pub mod config;
pub mod context;
pub mod criteria;
pub mod customer;
pub mod database;
pub mod error;
pub mod schema;

pub use common::address::{AddressItem, AddressManager};
pub use common::{create_manager, Manager};
pub use config::Config;
pub use context::{Context, Locale};
pub use criteria::{
    CompareOp, Condition, ParamType, SearchAttribute, SearchCriteria, SortDirection,
};
pub use customer::property_type::{CustomerPropertyTypeManager, PropertyTypeItem};
pub use database::DatabaseManager;
pub use error::{StoreError, StoreResult};
