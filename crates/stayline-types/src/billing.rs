//! Reservations, charge lines, payment lines, and conversion audit records
//!
//! A reservation's room charge is `nights × nightly_rate`, computed once at
//! booking time and fixed for the stay unless edited. Ad-hoc service charges
//! and payments are separate rows keyed by the reservation. The datastore
//! maintains authoritative `total_amount`/`paid_amount`/`balance_amount`
//! columns via an insert trigger on payments; those columns are `None` when
//! reading from a store that lacks the trigger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, AuditEntryId, Booking, BookingId, BookingSource, BookingStatus, ChargeId,
    CurrencyCode, LocationId, Money, PaymentId, ReservationId, RoomId, TenantId,
};

/// How a payment was collected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Online,
    Other(String),
}

/// What a charge line is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    /// Stay charge (nights × rate); normally derived from the reservation
    Room,
    /// Ad-hoc service charge added to the guest's bill
    Service,
}

/// Settlement state of a charge line.
///
/// A `Pending` service charge increases the balance due; one settled with a
/// concrete payment method was collected on the spot and does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Settled(PaymentMethod),
}

impl ChargeStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// One charge against a reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeLine {
    pub id: ChargeId,
    pub reservation_id: ReservationId,
    pub amount: Money,
    pub kind: ChargeKind,
    pub status: ChargeStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChargeLine {
    /// An ad-hoc service charge, pending payment
    pub fn pending_service(reservation_id: ReservationId, amount: Money) -> Self {
        Self {
            id: ChargeId::new(),
            reservation_id,
            amount,
            kind: ChargeKind::Service,
            status: ChargeStatus::Pending,
            description: None,
            created_at: Utc::now(),
        }
    }

    /// A service charge already collected with the given method
    pub fn settled_service(
        reservation_id: ReservationId,
        amount: Money,
        method: PaymentMethod,
    ) -> Self {
        Self {
            id: ChargeId::new(),
            reservation_id,
            amount,
            kind: ChargeKind::Service,
            status: ChargeStatus::Settled(method),
            description: None,
            created_at: Utc::now(),
        }
    }
}

/// One recorded payment. Immutable once inserted; there is no update or
/// delete path for payment rows in the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    /// Amount in the reservation's currency (converted before insert)
    pub amount: Money,
    pub method: PaymentMethod,
    pub account_id: AccountId,
    pub recorded_at: DateTime<Utc>,
}

/// A reservation: the financial record behind a direct booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub tenant_id: TenantId,
    pub location_id: LocationId,
    pub room_id: Option<RoomId>,
    /// Currency all of this reservation's stored amounts are expressed in
    pub currency: CurrencyCode,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Rate per night, fixed at booking time
    pub nightly_rate: Decimal,
    pub status: BookingStatus,
    pub source: BookingSource,
    /// Authoritative totals maintained by the datastore trigger, in the
    /// reservation currency; `None` against a trigger-less store
    pub total_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub balance_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(0)
    }

    /// The fixed stay charge: nights × nightly rate
    pub fn room_charge(&self) -> Money {
        Money::new(
            Decimal::from(self.nights()) * self.nightly_rate,
            self.currency.clone(),
        )
    }

    /// Outstanding balance per the authoritative columns, when both are
    /// present. Advisory only: read shortly before a write, it may be stale.
    pub fn known_outstanding(&self) -> Option<Decimal> {
        match (self.total_amount, self.paid_amount) {
            (Some(total), Some(paid)) => Some(total - paid),
            _ => None,
        }
    }

    /// Flatten into the unified availability view
    pub fn as_booking(&self) -> Booking {
        Booking {
            id: BookingId::from_uuid(self.id.0),
            room_id: self.room_id,
            check_in: self.check_in,
            check_out: self.check_out,
            status: self.status,
            source: self.source,
        }
    }
}

/// Audit record written when a payment amount was converted across
/// currencies before insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionAudit {
    pub id: AuditEntryId,
    pub payment_id: PaymentId,
    pub reservation_id: ReservationId,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// Operator-entered amount in the source currency
    pub original_amount: Decimal,
    /// Amount actually inserted, in the reservation currency
    pub converted_amount: Decimal,
    /// USD rates used for the pivot at conversion time
    pub from_usd_rate: Decimal,
    pub to_usd_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reservation() -> Reservation {
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
            total_amount: None,
            paid_amount: None,
            balance_amount: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_room_charge_is_nights_times_rate() {
        let resv = reservation();
        assert_eq!(resv.nights(), 3);
        assert_eq!(resv.room_charge(), Money::usd(dec!(300)));
    }

    #[test]
    fn test_known_outstanding_requires_both_columns() {
        let mut resv = reservation();
        assert_eq!(resv.known_outstanding(), None);

        resv.total_amount = Some(dec!(350));
        assert_eq!(resv.known_outstanding(), None);

        resv.paid_amount = Some(dec!(200));
        assert_eq!(resv.known_outstanding(), Some(dec!(150)));
    }

    #[test]
    fn test_as_booking_carries_the_stay_interval() {
        let resv = reservation();
        let booking = resv.as_booking();
        assert_eq!(booking.check_in, resv.check_in);
        assert_eq!(booking.check_out, resv.check_out);
        assert_eq!(booking.room_id, resv.room_id);
        assert!(booking.occupies(date("2026-03-02")));
    }

    #[test]
    fn test_pending_charge_status() {
        let charge = ChargeLine::pending_service(ReservationId::new(), Money::usd(dec!(50)));
        assert!(charge.status.is_pending());

        let settled = ChargeLine::settled_service(
            ReservationId::new(),
            Money::usd(dec!(20)),
            PaymentMethod::Cash,
        );
        assert!(!settled.status.is_pending());
    }
}
