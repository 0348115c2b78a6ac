pub mod common;
pub mod organization;
pub mod patient;
pub mod user;

pub use common::{nullable, Address, Page, Pagination, PaginationMeta};
pub use organization::{
    Organization, OrganizationChanges, OrganizationFilter, OrganizationQuery, OrganizationRow, Subscription,
    SubscriptionChanges,
};
pub use patient::{EmergencyContact, Insurance, MedicalInfo, Patient, PatientChanges, PatientFilter, PatientQuery, PatientRow};
pub use user::{ProfileChanges, User, UserChanges, UserFilter, UserProfile, UserQuery, UserRow};
