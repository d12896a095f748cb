//! Cell-level coercions used by the field mapper.
//!
//! - **numeric**: finite number parsing
//! - **categorical**: lookup resolution with a compact-key fallback
//! - **date**: fixed-format date parsing

pub mod categorical;
pub mod date;
pub mod numeric;

pub use categorical::{OTHER_CATEGORY, compact_key, resolve_category};
pub use date::parse_date;
pub use numeric::parse_f64;
