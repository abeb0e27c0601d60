//! Command implementations

pub(crate) mod common;
pub(crate) mod plugin;
pub(crate) mod query;
pub(crate) mod schema;
