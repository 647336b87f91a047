//! Session registry and the cross-session state it guards

pub mod assets;
pub mod connections;
pub mod manager;

pub use assets::AssetRefCount;
pub use connections::ConnectionRegistry;
pub use manager::{Collaborators, JoinOutcome, SessionManager, FIRST_SESSION_ID};
