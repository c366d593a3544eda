pub mod affiliates;
pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod params;
pub mod sales;
pub mod ws;
