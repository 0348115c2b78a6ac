//! Business rules for each resource. Handlers extract the caller and the
//! organization scope, then hand off to one of these services.

pub mod auth_service;
pub mod organization_service;
pub mod patient_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use organization_service::OrganizationService;
pub use patient_service::PatientService;
pub use user_service::UserService;

use crate::config::PaginationConfig;
use crate::database::models::Pagination;
use crate::error::ApiError;
use crate::validation::FieldErrors;

/// Page and limit from a query string, clamped to the configured bounds
pub fn resolve_pagination(page: Option<u32>, limit: Option<u32>, config: &PaginationConfig) -> Pagination {
    let limit = limit
        .unwrap_or(config.default_limit)
        .min(config.max_limit)
        .max(1);
    Pagination::new(page.unwrap_or(1), limit)
}

/// Turn collected field errors into a single validation failure
pub(crate) fn check_fields(errors: FieldErrors) -> Result<(), ApiError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(ApiError::validation_error("Validation failed", Some(errors.into_map())))
}

/// Reject a create once `current` rows already fill the plan's `max`
pub(crate) fn ensure_capacity(current: i64, max: i32, what: &str) -> Result<(), ApiError> {
    if current >= i64::from(max) {
        return Err(ApiError::forbidden(format!(
            "Plan limit reached: at most {} {} allowed for this subscription",
            max, what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig { default_limit: 10, max_limit: 100 }
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = resolve_pagination(None, None, &config());
        assert_eq!((p.page, p.limit), (1, 10));

        let p = resolve_pagination(Some(3), Some(1_000), &config());
        assert_eq!((p.page, p.limit), (3, 100));

        let p = resolve_pagination(Some(0), Some(0), &config());
        assert_eq!((p.page, p.limit), (1, 1));
    }

    #[test]
    fn capacity_is_exclusive_of_the_limit() {
        assert!(ensure_capacity(4, 5, "users").is_ok());
        assert!(matches!(ensure_capacity(5, 5, "users"), Err(ApiError::Forbidden(_))));
    }
}
