pub mod affiliates;
pub mod filter;
pub mod metrics;

pub use affiliates::{search_affiliates, summarize_affiliates};
pub use filter::{filter_sales, payment_methods, DateRange, MethodSelection, SalesFilter};
pub use metrics::{compute_metrics, percent_change, totals, Totals};
