// handlers/protected/auth/mod.rs - Account handlers for the authenticated user

pub mod password;
pub mod profile;

pub use password::password_put;
pub use profile::{profile_get, profile_put};
