//! Matrix factorizations for precomputed message systems

pub mod incomplete;
pub mod regularized;
pub mod row_store;

pub use self::incomplete::*;
pub use self::regularized::*;
pub use self::row_store::RowStore;
