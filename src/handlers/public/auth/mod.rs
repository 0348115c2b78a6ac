// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login;
pub mod register;
pub mod register_organization;

pub use login::login_post;
pub use register::register_post;
pub use register_organization::register_organization_post;
