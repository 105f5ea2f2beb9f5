/// Background jobs for analytics-service
pub mod dashboard_poller;

pub use dashboard_poller::{
    spawn_dashboard_poller, DashboardHandle, DashboardPollerConfig, DashboardState,
};
