pub mod native;
pub mod types;
pub mod values;

pub use native::NativeType;
pub use types::{EnumMember, JsonParams, NestedField, TupleElement, TypeNode};
pub use values::Value;
