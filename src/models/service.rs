use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 240;
pub const MIN_PRICE_CENTS: i64 = 50;
pub const MAX_PRICE_CENTS: i64 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub category: ServiceCategory,
}

impl Service {
    /// Durations are multiples of 5 minutes, prices multiples of 50 cents.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("service name is required".to_string()));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes)
            || self.duration_minutes % 5 != 0
        {
            return Err(AppError::Validation(format!(
                "service duration must be a multiple of 5 between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if !(MIN_PRICE_CENTS..=MAX_PRICE_CENTS).contains(&self.price_cents)
            || self.price_cents % 50 != 0
        {
            return Err(AppError::Validation(
                "service price must be a multiple of 0.50 between 0.50 and 1000".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceCategory {
    Taglio,
    Barba,
    Combo,
    Colorazione,
    Trattamento,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Taglio => "TAGLIO",
            ServiceCategory::Barba => "BARBA",
            ServiceCategory::Combo => "COMBO",
            ServiceCategory::Colorazione => "COLORAZIONE",
            ServiceCategory::Trattamento => "TRATTAMENTO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TAGLIO" => Some(ServiceCategory::Taglio),
            "BARBA" => Some(ServiceCategory::Barba),
            "COMBO" => Some(ServiceCategory::Combo),
            "COLORAZIONE" => Some(ServiceCategory::Colorazione),
            "TRATTAMENTO" => Some(ServiceCategory::Trattamento),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(duration_minutes: i64, price_cents: i64) -> Service {
        Service {
            id: "svc".to_string(),
            name: "Taglio Classico".to_string(),
            description: None,
            duration_minutes,
            price_cents,
            category: ServiceCategory::Taglio,
        }
    }

    #[test]
    fn test_valid_service() {
        assert!(service(30, 2500).validate().is_ok());
        assert!(service(15, 50).validate().is_ok());
        assert!(service(240, 100_000).validate().is_ok());
    }

    #[test]
    fn test_duration_bounds_and_step() {
        assert!(service(10, 2500).validate().is_err());
        assert!(service(245, 2500).validate().is_err());
        assert!(service(32, 2500).validate().is_err());
    }

    #[test]
    fn test_price_bounds_and_step() {
        assert!(service(30, 0).validate().is_err());
        assert!(service(30, 2525).validate().is_err());
        assert!(service(30, 100_050).validate().is_err());
    }
}
