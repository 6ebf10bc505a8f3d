//! Currency codes, display metadata, and exchange-rate rows
//!
//! Stayline treats currency codes as an open set: operators can register
//! custom currencies per location, so codes are normalized strings rather
//! than a closed enum. Display metadata (symbol, name) for well-known ISO
//! 4217 codes lives in a single registry here so that no component carries
//! its own symbol literals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{LocationId, TenantId};

/// A normalized (uppercase, trimmed) currency code such as "USD" or "LKR"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a code, normalizing to trimmed uppercase
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// The US dollar, the pivot currency of every rate table
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_usd(&self) -> bool {
        self.0 == "USD"
    }

    /// True when no code was supplied at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display symbol for this code, falling back to the code itself
    pub fn symbol(&self) -> &str {
        CurrencyInfo::lookup(self)
            .map(|info| info.symbol)
            .unwrap_or(self.as_str())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Display metadata for a well-known currency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    /// ISO 4217 code
    pub code: &'static str,
    /// Display symbol
    pub symbol: &'static str,
    /// Human-readable name
    pub name: &'static str,
}

/// The single registry of well-known currency metadata.
///
/// Custom currencies registered by operators are not listed here; they fall
/// back to their code for display.
static CURRENCY_REGISTRY: &[CurrencyInfo] = &[
    CurrencyInfo { code: "USD", symbol: "$", name: "US Dollar" },
    CurrencyInfo { code: "EUR", symbol: "€", name: "Euro" },
    CurrencyInfo { code: "GBP", symbol: "£", name: "British Pound" },
    CurrencyInfo { code: "JPY", symbol: "¥", name: "Japanese Yen" },
    CurrencyInfo { code: "CNY", symbol: "¥", name: "Chinese Yuan" },
    CurrencyInfo { code: "CHF", symbol: "CHF", name: "Swiss Franc" },
    CurrencyInfo { code: "AUD", symbol: "A$", name: "Australian Dollar" },
    CurrencyInfo { code: "CAD", symbol: "C$", name: "Canadian Dollar" },
    CurrencyInfo { code: "SGD", symbol: "S$", name: "Singapore Dollar" },
    CurrencyInfo { code: "INR", symbol: "₹", name: "Indian Rupee" },
    CurrencyInfo { code: "LKR", symbol: "Rs", name: "Sri Lankan Rupee" },
    CurrencyInfo { code: "MVR", symbol: "Rf", name: "Maldivian Rufiyaa" },
    CurrencyInfo { code: "THB", symbol: "฿", name: "Thai Baht" },
    CurrencyInfo { code: "AED", symbol: "AED", name: "UAE Dirham" },
    CurrencyInfo { code: "MYR", symbol: "RM", name: "Malaysian Ringgit" },
];

impl CurrencyInfo {
    /// Look up metadata for a code
    pub fn lookup(code: &CurrencyCode) -> Option<&'static CurrencyInfo> {
        CURRENCY_REGISTRY.iter().find(|info| info.code == code.as_str())
    }

    /// All well-known currencies, for settings screens
    pub fn all() -> &'static [CurrencyInfo] {
        CURRENCY_REGISTRY
    }
}

/// One exchange-rate row: how many units of this currency one US dollar buys,
/// scoped to a (tenant, location) pair.
///
/// Invariants (enforced by the rate book, not this struct):
/// - exactly one row per (tenant, location, code)
/// - the USD row always has `usd_rate = 1` and is never mutated or deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub code: CurrencyCode,
    /// Units of this currency per 1 USD; always positive
    pub usd_rate: Decimal,
    /// User-created rows are deletable; system-seeded rows are not
    pub is_custom: bool,
}

impl CurrencyRate {
    pub fn new(
        tenant_id: TenantId,
        location_id: LocationId,
        code: CurrencyCode,
        usd_rate: Decimal,
        is_custom: bool,
    ) -> Self {
        Self {
            tenant_id,
            location_id,
            code,
            usd_rate,
            is_custom,
        }
    }

    /// The pinned USD row for a scope
    pub fn usd(tenant_id: TenantId, location_id: LocationId) -> Self {
        Self {
            tenant_id,
            location_id,
            code: CurrencyCode::usd(),
            usd_rate: Decimal::ONE,
            is_custom: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        assert_eq!(CurrencyCode::new(" usd "), CurrencyCode::usd());
        assert_eq!(CurrencyCode::new("lkr").as_str(), "LKR");
    }

    #[test]
    fn test_registry_lookup() {
        let info = CurrencyInfo::lookup(&CurrencyCode::new("LKR")).unwrap();
        assert_eq!(info.symbol, "Rs");
        assert_eq!(info.name, "Sri Lankan Rupee");
    }

    #[test]
    fn test_unknown_code_falls_back_to_itself() {
        let code = CurrencyCode::new("XYZ");
        assert!(CurrencyInfo::lookup(&code).is_none());
        assert_eq!(code.symbol(), "XYZ");
    }

    #[test]
    fn test_usd_row_is_pinned_at_one() {
        let row = CurrencyRate::usd(TenantId::new(), LocationId::new());
        assert_eq!(row.usd_rate, Decimal::ONE);
        assert!(!row.is_custom);
        assert!(row.code.is_usd());
    }
}
