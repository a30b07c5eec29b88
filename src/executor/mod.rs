pub mod config;
pub use config::*;

pub mod mem_quota;
pub use mem_quota::*;

pub mod helpers;
pub use helpers::*;

pub mod hash_agg;
pub use hash_agg::*;
