//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity matching the table and the
//! input DTOs used by its repository.

pub mod one_time;
pub mod refresh_token;
pub mod user;
