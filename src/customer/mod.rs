pub mod address;
pub mod property_type;

pub use property_type::{CustomerPropertyTypeManager, PropertyTypeItem};
