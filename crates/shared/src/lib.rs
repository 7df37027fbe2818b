//! Shared types for the bizdesk client: wire models, the GraphQL operation
//! catalogue and the error taxonomy.

pub mod error;
pub mod models;
pub mod operations;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use protocol::*;
