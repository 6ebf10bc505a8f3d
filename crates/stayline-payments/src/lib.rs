//! Stayline Payments - validated payment recording
//!
//! Each payment attempt walks an explicit state machine:
//!
//! ```text
//! Draft → Validating → {Rejected | Recording → Recorded | Failed}
//! ```
//!
//! Validation happens against the balance as currently known, read shortly
//! before the write. That check is advisory: two concurrent payments can
//! both pass it, and the datastore's own constraint remains the final
//! authority. A rejected write surfaces verbatim, with whatever hint the
//! backend provides, and is never retried automatically.
//!
//! On success exactly one payment row is inserted, already converted into
//! the reservation's currency; the datastore trigger updates the parent
//! reservation's paid/balance columns as a side effect of that insert. When
//! a cross-currency conversion was applied, one audit row describing it is
//! appended as well.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use stayline_ledger::ReservationLedger;
use stayline_rates::{RateBook, RateError};
use stayline_store::{ReservationStore, StoreError};
use stayline_types::{
    round_display, AccountId, AuditEntryId, ConversionAudit, CurrencyCode, Money, PaymentId,
    PaymentLine, PaymentMethod, Reservation, ReservationId,
};

/// States a payment attempt moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Draft,
    Validating,
    /// Validation refused the attempt; correct the input and resubmit
    Rejected,
    Recording,
    /// The payment row is in the datastore
    Recorded,
    /// The datastore refused the write
    Failed,
}

/// Why a payment attempt did not reach `Recorded`
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// Amounts must be strictly positive
    #[error("invalid payment amount: {amount}")]
    InvalidAmount { amount: Decimal },

    /// No payment account was selected
    #[error("a payment account is required")]
    MissingAccount,

    /// The entered amount could not be converted into the reservation's
    /// currency
    #[error("cannot convert {from} into {to}: {source}")]
    CurrencyMismatchUnresolvable {
        from: CurrencyCode,
        to: CurrencyCode,
        source: RateError,
    },

    /// The converted amount is more than the guest still owes
    #[error("payment of {converted} {currency} exceeds outstanding balance {outstanding} {currency}")]
    ExceedsBalance {
        converted: Decimal,
        outstanding: Decimal,
        currency: CurrencyCode,
    },

    /// No such reservation
    #[error("reservation {id} not found")]
    ReservationNotFound { id: ReservationId },

    /// The datastore rejected the write; `hint` is the server-provided
    /// reason, surfaced verbatim
    #[error("payment failed: {hint}")]
    StoreRejected { hint: String },
}

impl PaymentError {
    /// The terminal state this error leaves the attempt in
    pub fn terminal_state(&self) -> AttemptState {
        match self {
            Self::StoreRejected { .. } => AttemptState::Failed,
            _ => AttemptState::Rejected,
        }
    }

    /// Stable code for API surfaces
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::MissingAccount => "MISSING_ACCOUNT",
            Self::CurrencyMismatchUnresolvable { .. } => "CURRENCY_MISMATCH_UNRESOLVABLE",
            Self::ExceedsBalance { .. } => "EXCEEDS_BALANCE",
            Self::ReservationNotFound { .. } => "RESERVATION_NOT_FOUND",
            Self::StoreRejected { .. } => "PAYMENT_FAILED",
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// A successfully recorded payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedPayment {
    pub payment: PaymentLine,
    /// Present when the operator-entered amount was converted across
    /// currencies before insertion
    pub conversion: Option<ConversionAudit>,
    /// Always [`AttemptState::Recorded`]
    pub state: AttemptState,
}

/// Records payments against reservations.
///
/// Owns no balance state: validation reads through the store, and the
/// store's trigger performs the balance mutation.
pub struct PaymentRecorder<'a, S: ReservationStore> {
    store: &'a S,
    rates: &'a RateBook,
}

impl<'a, S: ReservationStore> PaymentRecorder<'a, S> {
    pub fn new(store: &'a S, rates: &'a RateBook) -> Self {
        Self { store, rates }
    }

    /// Validate and record one payment.
    ///
    /// `amount` is the operator-entered figure in `currency`; it is
    /// converted into the reservation's currency before the overpayment
    /// check and the insert. Exactly one payment row is written per
    /// successful call.
    pub async fn record_payment(
        &self,
        reservation_id: ReservationId,
        amount: Decimal,
        currency: CurrencyCode,
        account_id: Option<AccountId>,
        method: PaymentMethod,
    ) -> PaymentResult<RecordedPayment> {
        // Validating
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount { amount });
        }
        let account_id = account_id.ok_or(PaymentError::MissingAccount)?;

        let reservation = self
            .store
            .reservation(reservation_id)
            .await
            .map_err(map_store_error)?
            .ok_or(PaymentError::ReservationNotFound { id: reservation_id })?;

        let (converted, conversion_rates) = self.resolve_amount(&reservation, amount, &currency)?;

        let outstanding = self.outstanding_balance(&reservation).await?;
        if converted > outstanding {
            return Err(PaymentError::ExceedsBalance {
                converted,
                outstanding,
                currency: reservation.currency.clone(),
            });
        }

        // Recording
        let payment = PaymentLine {
            id: PaymentId::new(),
            reservation_id,
            amount: Money::new(converted, reservation.currency.clone()),
            method,
            account_id,
            recorded_at: Utc::now(),
        };
        self.store
            .insert_payment(payment.clone())
            .await
            .map_err(map_store_error)?;

        // Recorded; the audit row is best-effort and never unwinds the insert
        let conversion = match conversion_rates {
            Some((from_rate, to_rate)) => {
                let audit = ConversionAudit {
                    id: AuditEntryId::new(),
                    payment_id: payment.id,
                    reservation_id,
                    from_currency: currency.clone(),
                    to_currency: reservation.currency.clone(),
                    original_amount: amount,
                    converted_amount: converted,
                    from_usd_rate: from_rate,
                    to_usd_rate: to_rate,
                    created_at: Utc::now(),
                };
                match self.store.insert_conversion_audit(audit.clone()).await {
                    Ok(()) => Some(audit),
                    Err(err) => {
                        warn!(%err, payment = %payment.id, "conversion audit row not written");
                        None
                    }
                }
            }
            None => None,
        };

        info!(
            reservation = %reservation_id,
            payment = %payment.id,
            amount = %converted,
            currency = %reservation.currency,
            "payment recorded"
        );
        Ok(RecordedPayment {
            payment,
            conversion,
            state: AttemptState::Recorded,
        })
    }

    /// Convert the entered amount into the reservation's currency, rounded
    /// at the persistence boundary. Returns the USD rates used when an
    /// actual conversion happened.
    fn resolve_amount(
        &self,
        reservation: &Reservation,
        amount: Decimal,
        currency: &CurrencyCode,
    ) -> PaymentResult<(Decimal, Option<(Decimal, Decimal)>)> {
        if currency == &reservation.currency {
            return Ok((round_display(amount), None));
        }

        let lookup = |code: &CurrencyCode| {
            self.rates
                .rate_for(reservation.tenant_id, reservation.location_id, code)
                .map_err(|source| PaymentError::CurrencyMismatchUnresolvable {
                    from: currency.clone(),
                    to: reservation.currency.clone(),
                    source,
                })
        };
        let from_rate = lookup(currency)?;
        let to_rate = lookup(&reservation.currency)?;

        let converted = stayline_rates::pivot_convert(amount, &from_rate, &to_rate);
        Ok((
            round_display(converted),
            Some((from_rate.usd_rate, to_rate.usd_rate)),
        ))
    }

    /// The balance the guard validates against: the trigger-maintained
    /// columns when present, a locally computed snapshot otherwise.
    async fn outstanding_balance(&self, reservation: &Reservation) -> PaymentResult<Decimal> {
        if let Some(outstanding) = reservation.known_outstanding() {
            return Ok(outstanding);
        }

        let charges = self
            .store
            .charges_for(reservation.id)
            .await
            .map_err(map_store_error)?;
        let payments = self
            .store
            .payments_for(reservation.id)
            .await
            .map_err(map_store_error)?;

        let snapshot = ReservationLedger::new(self.rates).compute_snapshot(
            reservation,
            &charges,
            &payments,
            &reservation.currency,
        );
        Ok(snapshot.balance_due)
    }
}

fn map_store_error(err: StoreError) -> PaymentError {
    PaymentError::StoreRejected {
        hint: err.to_string(),
    }
}
