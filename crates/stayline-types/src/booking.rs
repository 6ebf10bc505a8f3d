//! Bookings: the unified availability view
//!
//! Reservations and external-channel bookings are flattened into one shape
//! for availability purposes. A room's occupied interval is half-open,
//! `[check_in, check_out)`: the checkout day itself is free for a new
//! check-in, so back-to-back stays are allowed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{BookingId, RoomId};

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    /// Cancelled bookings are excluded from availability and ledger
    /// consideration.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Origin channel of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    /// Booked directly with the property
    Direct,
    /// Imported from an online travel agency channel
    Ota,
    /// Entered manually by an operator
    Manual,
}

/// One booking as seen by the availability engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    /// None for external-channel bookings not yet mapped to a room
    pub room_id: Option<RoomId>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    pub source: BookingSource,
}

impl Booking {
    /// Number of nights in the stay (whole days, never negative)
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(0)
    }

    /// True when `date` falls inside the half-open `[check_in, check_out)`
    /// interval.
    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Classic half-open interval-overlap test. Boundary-touching ranges
    /// (a new check-in on this booking's check-out day) do NOT overlap.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        check_in < self.check_out && check_out > self.check_in
    }
}
