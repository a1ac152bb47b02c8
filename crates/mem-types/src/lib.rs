//! Core types and traits for the memory HTTP service.
//!
//! Request DTOs carry the wire defaults (`default_user`, limit 10); the
//! `MemoryClient` trait is the seam between the HTTP layer and a backend.

mod dto;
mod record;
mod traits;

pub use dto::*;
pub use record::*;
pub use traits::*;
