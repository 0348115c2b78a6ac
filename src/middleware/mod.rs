pub mod auth;
pub mod extract;
pub mod gate;
pub mod organization;
pub mod response;

pub use auth::{authenticate, CurrentUser};
pub use extract::{ValidJson, ValidPath, ValidQuery};
pub use gate::{authorize, Gate, CLINIC_MANAGERS};
pub use organization::{require_organization, OrganizationScope};
pub use response::{ApiResponse, ApiResult};
