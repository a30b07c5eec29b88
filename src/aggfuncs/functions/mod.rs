pub mod count_impl;
pub use count_impl::*;

pub mod sum_impl;
pub use sum_impl::*;

pub mod avg_impl;
pub use avg_impl::*;

pub mod json_arrayagg_impl;
pub use json_arrayagg_impl::*;

pub mod json_objectagg_impl;
pub use json_objectagg_impl::*;
