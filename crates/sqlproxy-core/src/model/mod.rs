//! Value model: runtime values and their storage type tags

pub mod type_tag;
pub mod value;

pub use type_tag::TypeTag;
pub use value::Value;
