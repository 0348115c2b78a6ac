// handlers/elevated/organizations/mod.rs - System-wide organization management

pub mod create;
pub mod delete;
pub mod list;
pub mod stats;
pub mod toggle_status;

pub use create::organizations_post;
pub use delete::organization_delete;
pub use list::organizations_get;
pub use stats::organizations_stats_get;
pub use toggle_status::organization_toggle_status_patch;
