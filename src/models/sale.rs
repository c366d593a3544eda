use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SaleStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a sale. Values the backend sends that we do not
/// recognise (or a null) decode to `Unknown` instead of failing the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Approved,
    Refunded,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Approved => "approved",
            SaleStatus::Refunded => "refunded",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sale: one row of the `sales` table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cartpanda_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_id: String,
    pub price: Decimal,
    #[serde(default = "default_currency", deserialize_with = "currency_or_default")]
    pub currency: String,

    // Monetary normalization (null until backfilled)
    #[serde(default)]
    pub amount_brl: Option<Decimal>,
    #[serde(default)]
    pub amount_usd: Option<Decimal>,
    #[serde(default)]
    pub fx_rate_brl_usd: Option<Decimal>,
    #[serde(default)]
    pub fx_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fx_source: Option<String>,
    #[serde(default)]
    pub payment_currency: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SaleStatus,

    #[serde(default)]
    pub affiliate_code: Option<String>,
    #[serde(default)]
    pub affiliate_name: Option<String>,
    #[serde(default)]
    pub commission_value: Option<Decimal>,
    #[serde(default)]
    pub commission_usd: Option<Decimal>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transaction_id: String,
    #[serde(default)]
    pub webhook_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Amount counted toward revenue: the USD-normalized amount when it has
    /// been backfilled, otherwise the raw price.
    pub fn revenue_amount(&self) -> Decimal {
        self.amount_usd.unwrap_or(self.price)
    }

    /// Affiliate code, with blank strings treated as absent.
    pub fn affiliate(&self) -> Option<&str> {
        self.affiliate_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

fn default_currency() -> String {
    "BRL".into()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn currency_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|c| !c.is_empty())
        .unwrap_or_else(default_currency))
}
