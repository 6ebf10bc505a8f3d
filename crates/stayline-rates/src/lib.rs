//! Stayline Rates - Currency rate table and USD-pivot converter
//!
//! Every (tenant, location) pair owns its own table of exchange rates, each
//! row stating how many units of a currency one US dollar buys. Conversion
//! between any two currencies goes through the USD pivot:
//!
//! ```text
//! amount_usd = amount / usd_rate(from)
//! result     = amount_usd × usd_rate(to)
//! ```
//!
//! Full `Decimal` precision is kept through both hops; rounding to 2 decimal
//! places happens only at display or persistence boundaries.
//!
//! # Invariants
//!
//! 1. Exactly one row per (tenant, location, code)
//! 2. The USD row always has `usd_rate = 1` and is never mutated or deleted
//! 3. Non-USD custom rows are editable and deletable; system-seeded rows are
//!    editable but not deletable
//! 4. The first read for a scope lacking a USD row inserts one lazily

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use stayline_types::{CurrencyCode, CurrencyRate, LocationId, Money, Scope, TenantId};

/// Errors from rate lookups and rate-table mutations
#[derive(Debug, Clone, Error)]
pub enum RateError {
    /// No exchange rate row for this code in the scope's table
    #[error("no exchange rate for {code} at {scope}")]
    RateNotFound { code: CurrencyCode, scope: Scope },

    /// Attempt to change or delete the pinned USD row
    #[error("the USD rate is pinned at 1 and cannot be changed or deleted")]
    UsdRatePinned,

    /// Attempt to delete a system-seeded (non-custom) rate row
    #[error("system rate {code} cannot be deleted")]
    SeededRateProtected { code: CurrencyCode },

    /// Rates must be strictly positive to be usable as a pivot divisor
    #[error("invalid rate {rate} for {code}: rates must be positive")]
    InvalidRate { code: CurrencyCode, rate: Decimal },
}

pub type RateResult<T> = Result<T, RateError>;

/// In-session cache of per-scope rate rows, with the conversion math.
///
/// Callers hydrate it from the datastore per screen session and accept
/// staleness within that session; there is no cross-screen coordination
/// (last write wins).
#[derive(Default)]
pub struct RateBook {
    rows: RwLock<HashMap<Scope, HashMap<CurrencyCode, CurrencyRate>>>,
}

impl RateBook {
    /// Create an empty rate book
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Hydrate a scope's table from rows read out of the datastore.
    ///
    /// Bootstraps the pinned USD row if the fetched set lacks one, matching
    /// the lazy-creation contract of the backing table.
    pub fn load_scope(&self, tenant: TenantId, location: LocationId, fetched: Vec<CurrencyRate>) {
        let scope = Scope::new(tenant, location);
        let mut rows = self.rows.write();
        let table = rows.entry(scope).or_default();
        table.clear();
        for row in fetched {
            table.insert(row.code.clone(), row);
        }
        table
            .entry(CurrencyCode::usd())
            .or_insert_with(|| CurrencyRate::usd(tenant, location));
    }

    /// The USD row for a scope, inserting it on first read if missing
    pub fn ensure_usd(&self, tenant: TenantId, location: LocationId) -> CurrencyRate {
        let scope = Scope::new(tenant, location);
        let mut rows = self.rows.write();
        rows.entry(scope)
            .or_default()
            .entry(CurrencyCode::usd())
            .or_insert_with(|| {
                info!(%scope, "bootstrapping USD rate row");
                CurrencyRate::usd(tenant, location)
            })
            .clone()
    }

    /// Look up one rate row
    pub fn rate_for(
        &self,
        tenant: TenantId,
        location: LocationId,
        code: &CurrencyCode,
    ) -> RateResult<CurrencyRate> {
        let scope = Scope::new(tenant, location);
        if code.is_usd() {
            // reads always see the pinned row, creating it if needed
            return Ok(self.ensure_usd(tenant, location));
        }
        self.rows
            .read()
            .get(&scope)
            .and_then(|table| table.get(code))
            .cloned()
            .ok_or_else(|| RateError::RateNotFound {
                code: code.clone(),
                scope,
            })
    }

    /// All rows for a scope (settings screens), USD first
    pub fn rates_for(&self, tenant: TenantId, location: LocationId) -> Vec<CurrencyRate> {
        self.ensure_usd(tenant, location);
        let scope = Scope::new(tenant, location);
        let rows = self.rows.read();
        let mut out: Vec<CurrencyRate> = rows
            .get(&scope)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| {
            b.code
                .is_usd()
                .cmp(&a.code.is_usd())
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });
        out
    }

    /// Insert or update a rate row.
    ///
    /// The USD row is pinned: any attempt to set it to a rate other than 1
    /// is rejected unconditionally.
    pub fn upsert_rate(&self, row: CurrencyRate) -> RateResult<()> {
        if row.code.is_usd() && row.usd_rate != Decimal::ONE {
            return Err(RateError::UsdRatePinned);
        }
        if row.usd_rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate {
                code: row.code.clone(),
                rate: row.usd_rate,
            });
        }
        let scope = Scope::new(row.tenant_id, row.location_id);
        info!(%scope, code = %row.code, rate = %row.usd_rate, "upserting currency rate");
        self.rows
            .write()
            .entry(scope)
            .or_default()
            .insert(row.code.clone(), row);
        Ok(())
    }

    /// Delete a rate row.
    ///
    /// USD is never deletable; system-seeded rows are protected too. Custom
    /// rows delete fine.
    pub fn remove_rate(
        &self,
        tenant: TenantId,
        location: LocationId,
        code: &CurrencyCode,
    ) -> RateResult<CurrencyRate> {
        if code.is_usd() {
            return Err(RateError::UsdRatePinned);
        }
        let row = self.rate_for(tenant, location, code)?;
        if !row.is_custom {
            return Err(RateError::SeededRateProtected { code: code.clone() });
        }
        let scope = Scope::new(tenant, location);
        info!(%scope, %code, "deleting currency rate");
        self.rows
            .write()
            .get_mut(&scope)
            .and_then(|table| table.remove(code))
            .ok_or(RateError::RateNotFound {
                code: code.clone(),
                scope,
            })
    }

    /// Convert an amount between two currencies via the USD pivot.
    ///
    /// Identity conversions short-circuit without a rate lookup. The result
    /// keeps full precision; round at the display/persistence boundary.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        tenant: TenantId,
        location: LocationId,
    ) -> RateResult<Decimal> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self.rate_for(tenant, location, from)?;
        let to_rate = self.rate_for(tenant, location, to)?;
        Ok(pivot_convert(amount, &from_rate, &to_rate))
    }

    /// Convert a [`Money`] into the target currency
    pub fn convert_money(
        &self,
        money: &Money,
        to: &CurrencyCode,
        tenant: TenantId,
        location: LocationId,
    ) -> RateResult<Money> {
        let amount = self.convert(money.amount, &money.currency, to, tenant, location)?;
        Ok(Money::new(amount, to.clone()))
    }

    /// Convert for display, falling back to the original amount unchanged
    /// when no rate is available.
    ///
    /// Conversion failure must never block the primary action; the fallback
    /// is logged so the screen can surface a non-fatal warning.
    pub fn convert_money_or_original(
        &self,
        money: &Money,
        to: &CurrencyCode,
        tenant: TenantId,
        location: LocationId,
    ) -> Money {
        match self.convert_money(money, to, tenant, location) {
            Ok(converted) => converted,
            Err(err) => {
                warn!(
                    from = %money.currency,
                    %to,
                    %err,
                    "conversion failed; showing original amount"
                );
                money.clone()
            }
        }
    }
}

/// The USD-pivot math over two already-fetched rate rows.
///
/// Divides into USD then multiplies into the target, with no intermediate
/// rounding.
pub fn pivot_convert(amount: Decimal, from: &CurrencyRate, to: &CurrencyRate) -> Decimal {
    let amount_usd = amount / from.usd_rate;
    amount_usd * to.usd_rate
}
