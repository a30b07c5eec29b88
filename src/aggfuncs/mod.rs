pub mod agg_error;
pub use agg_error::*;

pub mod mem_usage;
pub use mem_usage::*;

pub mod projection;
pub use projection::*;

pub mod agg_func;
pub use agg_func::*;

pub mod partial_result;
pub use partial_result::*;

pub mod aggregate_registry;
pub use aggregate_registry::*;

pub mod functions;
pub use functions::*;
