//! Stayline Ledger - a reservation's authoritative balance view
//!
//! Aggregates a reservation's charges (room + ad-hoc services) and payments,
//! possibly recorded in different currencies, into one
//! {total, paid, pending, balance} snapshot expressed in a chosen display
//! currency.
//!
//! # Invariants
//!
//! 1. Given the same charge/payment rows and rate table, the snapshot is a
//!    pure function of its inputs
//! 2. A negative balance (overpayment recorded in error) is preserved and
//!    surfaced as-is so operators can see and correct it
//! 3. When the datastore already maintains authoritative total/paid/balance
//!    columns via its trigger, those are preferred over re-derived figures;
//!    local computation covers what the trigger does not (other display
//!    currencies, trigger-less stores)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stayline_rates::RateBook;
use stayline_types::{
    round_display, ChargeKind, ChargeLine, CurrencyCode, Money, PaymentLine, Reservation,
};

/// A reservation's financial position in one display currency.
///
/// `balance_due = total_amount - paid_amount`, never clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Currency every figure below is expressed in
    pub currency: CurrencyCode,
    /// Room charge plus all service charges, pending and settled
    pub total_amount: Decimal,
    /// Recorded payments plus service charges settled on the spot
    pub paid_amount: Decimal,
    /// Pending service charges awaiting collection
    pub pending_service_amount: Decimal,
    /// What the guest still owes; negative when overpaid
    pub balance_due: Decimal,
}

/// Computes balance snapshots for reservations
pub struct ReservationLedger<'a> {
    rates: &'a RateBook,
}

impl<'a> ReservationLedger<'a> {
    pub fn new(rates: &'a RateBook) -> Self {
        Self { rates }
    }

    /// Compute the snapshot for a reservation in `display` currency.
    ///
    /// Every line item not already in the display currency is converted via
    /// the USD pivot; a line whose conversion fails is kept at its original
    /// amount (non-fatal, logged) so the screen still renders. Figures are
    /// rounded to 2 decimal places at this boundary only.
    ///
    /// When the reservation carries trigger-maintained total/paid/balance
    /// columns and the display currency matches the reservation currency,
    /// the stored figures win; the pending-service figure is always derived
    /// locally since the trigger does not track it.
    pub fn compute_snapshot(
        &self,
        reservation: &Reservation,
        charges: &[ChargeLine],
        payments: &[PaymentLine],
        display: &CurrencyCode,
    ) -> BalanceSnapshot {
        let mut room = self.to_display(&reservation.room_charge(), display, reservation);
        let mut pending_services = Decimal::ZERO;
        let mut settled_services = Decimal::ZERO;

        for charge in charges {
            let amount = self.to_display(&charge.amount, display, reservation);
            match charge.kind {
                ChargeKind::Room => room += amount,
                ChargeKind::Service => {
                    if charge.status.is_pending() {
                        pending_services += amount;
                    } else {
                        settled_services += amount;
                    }
                }
            }
        }

        let payments_total: Decimal = payments
            .iter()
            .map(|p| self.to_display(&p.amount, display, reservation))
            .sum();

        let mut total = room + pending_services + settled_services;
        let mut paid = payments_total + settled_services;
        let mut balance = total - paid;

        // Trigger-maintained columns are authoritative for the currency the
        // trigger wrote them in.
        if display == &reservation.currency {
            if let Some(stored_total) = reservation.total_amount {
                total = stored_total;
            }
            if let Some(stored_paid) = reservation.paid_amount {
                paid = stored_paid;
            }
            balance = reservation
                .balance_amount
                .unwrap_or(total - paid);
            debug!(reservation = %reservation.id, "snapshot reconciled with stored columns");
        }

        BalanceSnapshot {
            currency: display.clone(),
            total_amount: round_display(total),
            paid_amount: round_display(paid),
            pending_service_amount: round_display(pending_services),
            balance_due: round_display(balance),
        }
    }

    fn to_display(
        &self,
        money: &Money,
        display: &CurrencyCode,
        reservation: &Reservation,
    ) -> Decimal {
        self.rates
            .convert_money_or_original(
                money,
                display,
                reservation.tenant_id,
                reservation.location_id,
            )
            .amount
    }
}
