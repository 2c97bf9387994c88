//! Application services: fetch strategy, canonical pipeline and feed sessions.

pub mod aggregate;
pub mod epoch;
pub mod error;
pub(crate) mod lock;
pub mod pagination;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod store;
pub mod strategy;
