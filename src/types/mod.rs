pub mod type_code;
pub use type_code::*;

pub mod field_type;
pub use field_type::*;

pub mod json_value;
pub use json_value::*;

pub mod datum;
pub use datum::*;
