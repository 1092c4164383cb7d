//! Database module for PostgreSQL persistence.

mod pool;
mod scores;

pub use pool::*;
pub use scores::*;
