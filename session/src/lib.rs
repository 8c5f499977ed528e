//! Persistence of opaque web-session payloads in a single SQL table.
//!
//! The session layer talks to [`store::SessionStore`]; [`store::sql_store::SqlSessionStore`]
//! is the implementation over an sqlx `AnyPool`.
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use config::{SaveStrategy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use model::{SessionId, SessionRecord};
pub use schema::{SchemaStatus, SessionTable};
pub use store::SessionStore;
pub use store::sql_store::SqlSessionStore;
