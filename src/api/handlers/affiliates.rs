use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analytics::{filter_sales, search_affiliates, summarize_affiliates, SalesFilter};
use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::format::{format_brl, format_count};
use crate::models::AffiliateSummary;
use crate::AppState;

use super::params::parse_date_range;

#[derive(Debug, Default, Deserialize)]
pub struct AffiliateParams {
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct AffiliateRow {
    #[serde(flatten)]
    pub summary: AffiliateSummary,
    pub sales_display: String,
    pub revenue_display: String,
    pub refunds_display: String,
}

impl From<AffiliateSummary> for AffiliateRow {
    fn from(summary: AffiliateSummary) -> Self {
        Self {
            sales_display: format_count(summary.sales),
            revenue_display: format_brl(summary.revenue),
            refunds_display: format_brl(summary.refunds),
            summary,
        }
    }
}

/// Affiliate rollups derived from the live sales feed.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AffiliateParams>,
) -> Result<Json<ApiResponse<Vec<AffiliateRow>>>, AppError> {
    let date_range = parse_date_range(params.from.as_deref(), params.to.as_deref())?;
    let feed = state.sales.snapshot();

    let in_range = if date_range.is_unset() {
        summarize_affiliates(&feed.data)
    } else {
        let filter = SalesFilter {
            date_range,
            ..Default::default()
        };
        summarize_affiliates(&filter_sales(&feed.data, &filter))
    };

    let rows = search_affiliates(in_range, params.search.as_deref().unwrap_or_default())
        .into_iter()
        .map(AffiliateRow::from)
        .collect();
    Ok(Json(ApiResponse::with_error(rows, feed.error)))
}
