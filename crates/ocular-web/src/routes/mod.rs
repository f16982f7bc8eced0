//! Route handlers.

pub mod page;
pub mod session;
