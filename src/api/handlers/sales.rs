use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analytics::{filter_sales, payment_methods, MethodSelection, SalesFilter};
use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::format::{format_brl, format_datetime, status_label};
use crate::models::Sale;
use crate::AppState;

use super::params::{parse_date_range, parse_list};

#[derive(Debug, Default, Deserialize)]
pub struct SalesParams {
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma-separated payment methods. Absent selects every observed method.
    pub methods: Option<String>,
}

#[derive(Serialize)]
pub struct SaleRow {
    #[serde(flatten)]
    pub sale: Sale,
    pub price_display: String,
    pub created_at_display: String,
    pub status_label: &'static str,
}

impl From<Sale> for SaleRow {
    fn from(sale: Sale) -> Self {
        Self {
            price_display: format_brl(sale.price),
            created_at_display: format_datetime(sale.created_at),
            status_label: status_label(sale.status),
            sale,
        }
    }
}

#[derive(Serialize)]
pub struct SalesPage {
    pub sales: Vec<SaleRow>,
    pub total: usize,
    pub payment_methods: Vec<String>,
    pub selected_methods: Vec<String>,
    pub loading: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SalesParams>,
) -> Result<Json<ApiResponse<SalesPage>>, AppError> {
    let date_range = parse_date_range(params.from.as_deref(), params.to.as_deref())?;
    let feed = state.sales.snapshot();

    let observed = payment_methods(&feed.data);
    let mut selection = match params.methods.as_deref() {
        Some(raw) => MethodSelection::with_selected(parse_list(Some(raw))),
        None => MethodSelection::new(),
    };
    selection.sync(&observed);

    let filter = SalesFilter {
        search: params.search.unwrap_or_default(),
        date_range,
        payment_methods: selection.selected().clone(),
    };
    let filtered = filter_sales(&feed.data, &filter);

    tracing::debug!(
        total = feed.data.len(),
        matched = filtered.len(),
        "Sales filtered"
    );

    let page = SalesPage {
        total: filtered.len(),
        sales: filtered.into_iter().map(SaleRow::from).collect(),
        payment_methods: observed,
        selected_methods: selection.selected().iter().cloned().collect(),
        loading: feed.is_loading(),
    };
    Ok(Json(ApiResponse::with_error(page, feed.error)))
}

#[derive(Serialize)]
pub struct RefetchAck {
    pub sales: bool,
    pub metrics: bool,
}

/// Ask both feeds to re-query now.
pub async fn refetch(State(state): State<AppState>) -> Result<Json<ApiResponse<RefetchAck>>, AppError> {
    let ack = RefetchAck {
        sales: state.sales.refetch().await,
        metrics: state.metrics.refetch().await,
    };
    if !ack.sales && !ack.metrics {
        return Err(AppError::Unavailable("feeds are not running".into()));
    }
    tracing::info!(sales = ack.sales, metrics = ack.metrics, "Manual refetch requested");
    Ok(Json(ApiResponse::ok(ack)))
}
