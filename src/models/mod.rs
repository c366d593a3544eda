pub mod affiliate;
pub mod dashboard;
pub mod sale;

pub use affiliate::AffiliateSummary;
pub use dashboard::DashboardMetrics;
pub use sale::{Sale, SaleStatus};
