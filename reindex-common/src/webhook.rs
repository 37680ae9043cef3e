use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// The items webhook the production indexer listens on.
pub const PRODUCTION_ENDPOINT: &str =
    "https://omnicanal.simanscs.com/omnicanal/ecommerce/v1/webhook/items";

/// Value used by the indexer for every field it does not read.
const PLACEHOLDER: &str = "string";

/// Enumeration of errors related to selecting where, and for which country, notifications go.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("{0} is not a valid environment, expected one of: qa, production")]
    ParseEnvironmentError(String),
    #[error("{0} is not a supported country code")]
    ParseCountryError(String),
    #[error("no endpoint is configured for the {0} environment")]
    EndpointNotConfigured(Environment),
}

/// Indexing environments a run can target.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Environment {
    Qa,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_ref() {
            "qa" => Ok(Environment::Qa),
            "production" | "prod" => Ok(Environment::Production),
            invalid => Err(TargetError::ParseEnvironmentError(invalid.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Environment::Qa => write!(f, "qa"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Country codes the indexer accepts. Forwarded verbatim in every notification.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Country {
    #[default]
    SV,
    GT,
    CR,
    NI,
    HN,
}

impl FromStr for Country {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_ref() {
            "SV" => Ok(Country::SV),
            "GT" => Ok(Country::GT),
            "CR" => Ok(Country::CR),
            "NI" => Ok(Country::NI),
            "HN" => Ok(Country::HN),
            invalid => Err(TargetError::ParseCountryError(invalid.to_owned())),
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            Country::SV => "SV",
            Country::GT => "GT",
            Country::CR => "CR",
            Country::NI => "NI",
            Country::HN => "HN",
        };
        write!(f, "{code}")
    }
}

/// The base URLs available to choose from, one per `Environment`.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub qa: Option<Url>,
    pub production: Url,
}

impl Endpoints {
    pub fn resolve(&self, environment: Environment) -> Result<&Url, TargetError> {
        match environment {
            Environment::Qa => self
                .qa
                .as_ref()
                .ok_or(TargetError::EndpointNotConfigured(environment)),
            Environment::Production => Ok(&self.production),
        }
    }
}

/// The body of a single item change notification.
/// Only `country`, `product_id` and `date_modified` vary between calls.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNotification {
    pub country: Country,
    pub id_sku: String,
    pub product_id: String,
    pub an: String,
    pub id_affiliate: String,
    pub seller_chain: String,
    pub date_modified: DateTime<Utc>,
    pub stock_modified: bool,
    pub price_modified: bool,
    pub has_stock_keeping_unit_modified: bool,
    pub has_stock_keeping_unit_removed_from_affiliate: bool,
    pub active: bool,
}

impl ItemNotification {
    /// Build a notification for `product_id`, stamped with the current time.
    pub fn new(product_id: &str, country: Country) -> Self {
        Self::at(product_id, country, Utc::now())
    }

    pub fn at(product_id: &str, country: Country, date_modified: DateTime<Utc>) -> Self {
        Self {
            country,
            id_sku: PLACEHOLDER.to_owned(),
            product_id: product_id.to_owned(),
            an: PLACEHOLDER.to_owned(),
            id_affiliate: PLACEHOLDER.to_owned(),
            seller_chain: PLACEHOLDER.to_owned(),
            date_modified,
            stock_modified: true,
            price_modified: true,
            has_stock_keeping_unit_modified: true,
            has_stock_keeping_unit_removed_from_affiliate: true,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_notification_shape() {
        let date_modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let notification = ItemNotification::at("12345", Country::GT, date_modified);

        let value = serde_json::to_value(&notification).unwrap();

        assert_eq!(
            value,
            json!({
                "country": "GT",
                "idSku": "string",
                "productId": "12345",
                "an": "string",
                "idAffiliate": "string",
                "sellerChain": "string",
                "dateModified": "2024-05-01T12:30:00Z",
                "stockModified": true,
                "priceModified": true,
                "hasStockKeepingUnitModified": true,
                "hasStockKeepingUnitRemovedFromAffiliate": true,
                "active": true
            })
        );
    }

    #[test]
    fn test_parse_country() {
        assert_eq!("sv".parse::<Country>(), Ok(Country::SV));
        assert_eq!("CR".parse::<Country>(), Ok(Country::CR));
        assert_eq!(
            "MX".parse::<Country>(),
            Err(TargetError::ParseCountryError("MX".to_owned()))
        );
        assert_eq!(Country::default(), Country::SV);
    }

    #[test]
    fn test_parse_environment() {
        assert_eq!("QA".parse::<Environment>(), Ok(Environment::Qa));
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_resolve_endpoints() {
        let production: Url = PRODUCTION_ENDPOINT.parse().unwrap();
        let endpoints = Endpoints {
            qa: None,
            production: production.clone(),
        };

        assert_eq!(endpoints.resolve(Environment::Production), Ok(&production));
        assert_eq!(
            endpoints.resolve(Environment::Qa),
            Err(TargetError::EndpointNotConfigured(Environment::Qa))
        );
    }
}
