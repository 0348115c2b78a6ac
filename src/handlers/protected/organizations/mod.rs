// handlers/protected/organizations/mod.rs - Organization views for members
//
// `show` and `update` are reachable by any authenticated user; the service
// decides between system caller, member and stranger. `my` and `my_stats`
// run under organization scope.

pub mod my;
pub mod my_stats;
pub mod show;
pub mod update;

pub use my::my_get;
pub use my_stats::my_stats_get;
pub use show::organization_get;
pub use update::organization_put;
