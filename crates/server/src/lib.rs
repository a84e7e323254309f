//! Thin external adapter around the avatar runtime core (spec §6):
//! HTTP/WS surface, process wiring, and coordinated shutdown. The wire
//! format itself is out of the core's contract, so this crate stays
//! deliberately small next to the crates it wires together.

pub mod error;
pub mod http;
pub mod runtime;
pub mod state;

pub use error::ServerError;
pub use http::create_router;
pub use runtime::RuntimeHandles;
pub use state::AppState;
