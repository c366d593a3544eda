pub mod auth;
pub mod client;
pub mod realtime;
pub mod rest_client;
pub mod source;
pub mod types;

pub use auth::{inspect_api_key, KeyClaims, KeyError};
pub use client::SupabaseClient;
pub use rest_client::RestClient;
pub use source::{
    select_as, ChangeEvent, DataError, DataSource, Filter, FilterOp, Ordering, SelectQuery,
    Subscription,
};
