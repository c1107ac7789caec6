use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One fund from the regulator's registry export.
///
/// Natural key: `cnpj` (tax ID, digits only). Attribute fields that come
/// from columns the normalizer may fail to coerce are optional; they load
/// as NULL rather than failing the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRecord {
    pub cnpj: String,
    pub corporate_name: String,
    pub fund_class: Option<String>,
    pub registered_on: Option<NaiveDate>,
    pub status: Option<String>,
    pub net_asset_value: Option<f64>,
    pub quota_holders: Option<i64>,
    pub exclusive_fund: Option<bool>,
    pub loaded_at: DateTime<Utc>,
}

/// One bond price quote for a security on a reference date.
///
/// Natural key: (`security_code`, `reference_date`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondQuote {
    pub security_code: String,
    pub reference_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub bid_yield: Option<f64>,
    pub ask_yield: Option<f64>,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub loaded_at: DateTime<Utc>,
}

/// One registered issuer from the regulatory filings snapshot.
///
/// Natural key: `cnpj`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerRecord {
    pub cnpj: String,
    pub name: String,
    pub category: Option<String>,
    pub registration_status: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub loaded_at: DateTime<Utc>,
}
