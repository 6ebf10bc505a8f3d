//! Stayline Store - the record-level datastore boundary
//!
//! The core reads and writes plain record shapes through [`ReservationStore`];
//! the wire format and the persistence engine behind it are the
//! collaborator's concern.
//!
//! # The payment trigger contract
//!
//! A successful [`ReservationStore::insert_payment`] atomically, as a side
//! effect of the single insert:
//!
//! - increases the parent reservation's `paid_amount` by the inserted amount
//!   (which is already expressed in the reservation's currency), and
//! - recomputes `balance_amount` as `total_amount - paid_amount`.
//!
//! The store may reject the insert outright (e.g. a server-side balance
//! constraint), surfaced as [`StoreError::Rejected`] with whatever hint the
//! backend provides. The core depends on this contract but never
//! reimplements it; [`InMemoryStore`] honors it so the rest of the system
//! stays correct against a datastore lacking the trigger-backed columns.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use stayline_types::{
    Booking, BookingId, ChargeLine, ConversionAudit, CurrencyCode, CurrencyRate, LocationId,
    PaymentLine, Reservation, ReservationId, Scope, TenantId,
};

/// Errors surfaced by the datastore boundary
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The referenced record does not exist
    #[error("{what} not found")]
    NotFound { what: String },

    /// The datastore refused the write; `hint` is the server-provided reason
    #[error("write rejected by datastore: {hint}")]
    Rejected { hint: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn rejected(hint: impl Into<String>) -> Self {
        Self::Rejected { hint: hint.into() }
    }
}

/// Record-level access to the transactional datastore
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Fetch one reservation
    async fn reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>>;

    /// Insert or replace a reservation
    async fn upsert_reservation(&self, reservation: Reservation) -> StoreResult<()>;

    /// Charge rows ("income" records) for a reservation
    async fn charges_for(&self, reservation: ReservationId) -> StoreResult<Vec<ChargeLine>>;

    /// Append one charge row
    async fn insert_charge(&self, charge: ChargeLine) -> StoreResult<()>;

    /// Payment rows for a reservation
    async fn payments_for(&self, reservation: ReservationId) -> StoreResult<Vec<PaymentLine>>;

    /// Append one payment row, applying the trigger contract (see crate docs)
    async fn insert_payment(&self, payment: PaymentLine) -> StoreResult<()>;

    /// Booking rows (reservations + external channels) for a scope, as
    /// stored; cancelled-status filtering is the availability engine's job
    async fn bookings_for(
        &self,
        tenant: TenantId,
        location: LocationId,
    ) -> StoreResult<Vec<Booking>>;

    /// Insert or replace a booking in a scope
    async fn upsert_booking(
        &self,
        tenant: TenantId,
        location: LocationId,
        booking: Booking,
    ) -> StoreResult<()>;

    /// Exchange-rate rows for a scope
    async fn rate_rows(
        &self,
        tenant: TenantId,
        location: LocationId,
    ) -> StoreResult<Vec<CurrencyRate>>;

    /// Insert or replace one exchange-rate row
    async fn save_rate_row(&self, row: CurrencyRate) -> StoreResult<()>;

    /// Delete one exchange-rate row
    async fn delete_rate_row(
        &self,
        tenant: TenantId,
        location: LocationId,
        code: &CurrencyCode,
    ) -> StoreResult<()>;

    /// Append one currency-conversion audit row
    async fn insert_conversion_audit(&self, audit: ConversionAudit) -> StoreResult<()>;
}

#[derive(Default)]
struct Inner {
    reservations: HashMap<ReservationId, Reservation>,
    charges: HashMap<ReservationId, Vec<ChargeLine>>,
    payments: HashMap<ReservationId, Vec<PaymentLine>>,
    bookings: HashMap<Scope, HashMap<BookingId, Booking>>,
    rates: HashMap<Scope, HashMap<CurrencyCode, CurrencyRate>>,
    audits: Vec<ConversionAudit>,
}

/// In-memory [`ReservationStore`] honoring the payment trigger contract.
///
/// Used by tests and by deployments whose backend lacks the trigger. With
/// [`InMemoryStore::with_balance_constraint`] it also enforces the
/// server-side overpayment check, so the narrow race the client-side guard
/// accepts can be exercised.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
    enforce_balance: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject payments that would push `paid_amount` past `total_amount`,
    /// the way a constraint-bearing backend would
    pub fn with_balance_constraint() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            enforce_balance: true,
        }
    }

    /// All conversion audit rows, newest last
    pub async fn conversion_audits(&self) -> Vec<ConversionAudit> {
        self.inner.read().await.audits.clone()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        Ok(self.inner.read().await.reservations.get(&id).cloned())
    }

    async fn upsert_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .reservations
            .insert(reservation.id, reservation);
        Ok(())
    }

    async fn charges_for(&self, reservation: ReservationId) -> StoreResult<Vec<ChargeLine>> {
        Ok(self
            .inner
            .read()
            .await
            .charges
            .get(&reservation)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_charge(&self, charge: ChargeLine) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.reservations.contains_key(&charge.reservation_id) {
            return Err(StoreError::not_found("reservation"));
        }
        inner
            .charges
            .entry(charge.reservation_id)
            .or_default()
            .push(charge);
        Ok(())
    }

    async fn payments_for(&self, reservation: ReservationId) -> StoreResult<Vec<PaymentLine>> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .get(&reservation)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_payment(&self, payment: PaymentLine) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let reservation = inner
            .reservations
            .get_mut(&payment.reservation_id)
            .ok_or_else(|| StoreError::not_found("reservation"))?;

        // the contract requires the row to arrive in the reservation currency
        if payment.amount.currency != reservation.currency {
            return Err(StoreError::rejected(format!(
                "payment currency {} does not match reservation currency {}",
                payment.amount.currency, reservation.currency
            )));
        }

        let paid_before = reservation.paid_amount.unwrap_or_default();
        let paid_after = paid_before + payment.amount.amount;

        if self.enforce_balance {
            if let Some(total) = reservation.total_amount {
                if paid_after > total {
                    return Err(StoreError::rejected(
                        "balance constraint: payment exceeds amount due",
                    ));
                }
            }
        }

        // trigger contract: update parent columns atomically with the insert
        reservation.paid_amount = Some(paid_after);
        if let Some(total) = reservation.total_amount {
            reservation.balance_amount = Some(total - paid_after);
        }
        debug!(reservation = %payment.reservation_id, paid = %paid_after, "payment applied");

        inner
            .payments
            .entry(payment.reservation_id)
            .or_default()
            .push(payment);
        Ok(())
    }

    async fn bookings_for(
        &self,
        tenant: TenantId,
        location: LocationId,
    ) -> StoreResult<Vec<Booking>> {
        let scope = Scope::new(tenant, location);
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .get(&scope)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_booking(
        &self,
        tenant: TenantId,
        location: LocationId,
        booking: Booking,
    ) -> StoreResult<()> {
        let scope = Scope::new(tenant, location);
        self.inner
            .write()
            .await
            .bookings
            .entry(scope)
            .or_default()
            .insert(booking.id, booking);
        Ok(())
    }

    async fn rate_rows(
        &self,
        tenant: TenantId,
        location: LocationId,
    ) -> StoreResult<Vec<CurrencyRate>> {
        let scope = Scope::new(tenant, location);
        Ok(self
            .inner
            .read()
            .await
            .rates
            .get(&scope)
            .map(|by_code| by_code.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_rate_row(&self, row: CurrencyRate) -> StoreResult<()> {
        let scope = Scope::new(row.tenant_id, row.location_id);
        self.inner
            .write()
            .await
            .rates
            .entry(scope)
            .or_default()
            .insert(row.code.clone(), row);
        Ok(())
    }

    async fn delete_rate_row(
        &self,
        tenant: TenantId,
        location: LocationId,
        code: &CurrencyCode,
    ) -> StoreResult<()> {
        let scope = Scope::new(tenant, location);
        self.inner
            .write()
            .await
            .rates
            .get_mut(&scope)
            .and_then(|by_code| by_code.remove(code))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("currency rate"))
    }

    async fn insert_conversion_audit(&self, audit: ConversionAudit) -> StoreResult<()> {
        self.inner.write().await.audits.push(audit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use stayline_types::{
        AccountId, BookingSource, BookingStatus, Money, PaymentId, PaymentMethod, RoomId,
    };

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reservation_with_totals(total: rust_decimal::Decimal) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            tenant_id: TenantId::new(),
            location_id: LocationId::new(),
            room_id: Some(RoomId::new()),
            currency: CurrencyCode::usd(),
            check_in: date("2026-03-01"),
            check_out: date("2026-03-04"),
            nightly_rate: dec!(100),
            status: BookingStatus::Confirmed,
            source: BookingSource::Direct,
            total_amount: Some(total),
            paid_amount: Some(dec!(0)),
            balance_amount: Some(total),
            created_at: Utc::now(),
        }
    }

    fn usd_payment(reservation: &Reservation, amount: rust_decimal::Decimal) -> PaymentLine {
        PaymentLine {
            id: PaymentId::new(),
            reservation_id: reservation.id,
            amount: Money::usd(amount),
            method: PaymentMethod::Card,
            account_id: AccountId::new(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_trigger_updates_parent_columns() {
        init_tracing();
        let store = InMemoryStore::new();
        let resv = reservation_with_totals(dec!(300));
        store.upsert_reservation(resv.clone()).await.unwrap();

        store
            .insert_payment(usd_payment(&resv, dec!(120)))
            .await
            .unwrap();

        let updated = store.reservation(resv.id).await.unwrap().unwrap();
        assert_eq!(updated.paid_amount, Some(dec!(120)));
        assert_eq!(updated.balance_amount, Some(dec!(180)));
        assert_eq!(store.payments_for(resv.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_accumulates_across_payments() {
        let store = InMemoryStore::new();
        let resv = reservation_with_totals(dec!(300));
        store.upsert_reservation(resv.clone()).await.unwrap();

        store
            .insert_payment(usd_payment(&resv, dec!(100)))
            .await
            .unwrap();
        store
            .insert_payment(usd_payment(&resv, dec!(50)))
            .await
            .unwrap();

        let updated = store.reservation(resv.id).await.unwrap().unwrap();
        assert_eq!(updated.paid_amount, Some(dec!(150)));
        assert_eq!(updated.balance_amount, Some(dec!(150)));
    }

    #[tokio::test]
    async fn test_balance_constraint_rejects_overpayment() {
        let store = InMemoryStore::with_balance_constraint();
        let resv = reservation_with_totals(dec!(100));
        store.upsert_reservation(resv.clone()).await.unwrap();

        let result = store.insert_payment(usd_payment(&resv, dec!(101))).await;
        assert!(matches!(result, Err(StoreError::Rejected { .. })));

        // nothing was written
        let unchanged = store.reservation(resv.id).await.unwrap().unwrap();
        assert_eq!(unchanged.paid_amount, Some(dec!(0)));
        assert!(store.payments_for(resv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_currency_payment_rejected() {
        let store = InMemoryStore::new();
        let resv = reservation_with_totals(dec!(300));
        store.upsert_reservation(resv.clone()).await.unwrap();

        let mut payment = usd_payment(&resv, dec!(100));
        payment.amount = Money::new(dec!(100), CurrencyCode::new("LKR"));

        let result = store.insert_payment(payment).await;
        assert!(matches!(result, Err(StoreError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_payment_for_unknown_reservation() {
        let store = InMemoryStore::new();
        let resv = reservation_with_totals(dec!(300));

        let result = store.insert_payment(usd_payment(&resv, dec!(10))).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_charge_requires_reservation() {
        let store = InMemoryStore::new();
        let charge =
            ChargeLine::pending_service(ReservationId::new(), Money::usd(dec!(50)));

        let result = store.insert_charge(charge).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_rate_rows_roundtrip() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let location = LocationId::new();

        store
            .save_rate_row(CurrencyRate::new(
                tenant,
                location,
                CurrencyCode::new("LKR"),
                dec!(300),
                true,
            ))
            .await
            .unwrap();

        let rows = store.rate_rows(tenant, location).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, CurrencyCode::new("LKR"));

        store
            .delete_rate_row(tenant, location, &CurrencyCode::new("LKR"))
            .await
            .unwrap();
        assert!(store.rate_rows(tenant, location).await.unwrap().is_empty());

        let missing = store
            .delete_rate_row(tenant, location, &CurrencyCode::new("LKR"))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_bookings_scoped_per_location() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let location_a = LocationId::new();
        let location_b = LocationId::new();

        let booking = Booking {
            id: BookingId::new(),
            room_id: Some(RoomId::new()),
            check_in: date("2026-03-01"),
            check_out: date("2026-03-04"),
            status: BookingStatus::Confirmed,
            source: BookingSource::Ota,
        };
        store
            .upsert_booking(tenant, location_a, booking)
            .await
            .unwrap();

        assert_eq!(store.bookings_for(tenant, location_a).await.unwrap().len(), 1);
        assert!(store.bookings_for(tenant, location_b).await.unwrap().is_empty());
    }
}
