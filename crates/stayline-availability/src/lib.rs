//! Stayline Availability - free/busy checks over a set of bookings
//!
//! The engine holds no persistent state: it operates over a caller-supplied
//! list of active bookings for a location, typically refetched whenever the
//! relevant filters change. All interval logic is half-open,
//! `[check_in, check_out)`: the checkout day itself is free for a new
//! check-in, so back-to-back bookings are allowed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stayline_types::{Booking, RoomId};

/// Wire format for stay dates as the backend stores them
pub const STAY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from availability queries
#[derive(Debug, Clone, Error)]
pub enum AvailabilityError {
    /// Unparseable booking date. There is no recovery: the caller must not
    /// present that booking on the calendar.
    #[error("invalid stay date: {raw}")]
    InvalidDate { raw: String },

    /// A range query with check_out <= check_in
    #[error("empty range: check-out {check_out} is not after check-in {check_in}")]
    EmptyRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

pub type AvailabilityResult<T> = Result<T, AvailabilityError>;

/// Parse a stay date from its wire representation
pub fn parse_stay_date(raw: &str) -> AvailabilityResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, STAY_DATE_FORMAT).map_err(|_| AvailabilityError::InvalidDate {
        raw: raw.to_string(),
    })
}

/// Whole nights between two dates, floored at zero
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(0)
}

/// A booking's placement within a visible calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSpan {
    /// Position of the (possibly clipped) start date within the window
    pub start_index: usize,
    /// Cells the booking occupies; at least 1 when visible
    pub span_days: i64,
    /// False when the stay does not intersect the window at all
    pub is_visible: bool,
}

impl BookingSpan {
    fn hidden() -> Self {
        Self {
            start_index: 0,
            span_days: 0,
            is_visible: false,
        }
    }
}

/// Free/busy queries over one location's active bookings
pub struct AvailabilityEngine {
    bookings: Vec<Booking>,
}

impl AvailabilityEngine {
    /// Build an engine over a set of bookings, dropping cancelled ones
    pub fn new(bookings: impl IntoIterator<Item = Booking>) -> Self {
        Self {
            bookings: bookings
                .into_iter()
                .filter(|b| !b.status.is_cancelled())
                .collect(),
        }
    }

    /// The active bookings the engine is answering over
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// True unless some active booking for the room occupies `date`.
    ///
    /// Bookings without a mapped room never block a concrete room.
    pub fn is_date_available(&self, date: NaiveDate, room: RoomId) -> bool {
        !self
            .bookings_for(room)
            .any(|booking| booking.occupies(date))
    }

    /// True unless some active booking for the room overlaps the candidate
    /// half-open range. Boundary-touching ranges are not an overlap.
    pub fn is_range_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room: RoomId,
    ) -> AvailabilityResult<bool> {
        if check_out <= check_in {
            return Err(AvailabilityError::EmptyRange {
                check_in,
                check_out,
            });
        }
        Ok(!self
            .bookings_for(room)
            .any(|booking| booking.overlaps(check_in, check_out)))
    }

    /// Every unavailable date in `[start, end]`, both endpoints inclusive.
    ///
    /// Pure function of the inputs; iterating twice yields the same dates.
    pub fn unavailable_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room: RoomId,
    ) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.is_date_available(*d, room))
            .collect()
    }

    fn bookings_for(&self, room: RoomId) -> impl Iterator<Item = &Booking> {
        self.bookings
            .iter()
            .filter(move |b| b.room_id == Some(room))
    }
}

/// Clip a booking's stay to a visible calendar window.
///
/// The window is an ordered sequence of consecutive display dates. A visible
/// booking occupies at least one cell even when the clipped stay would round
/// down to zero days.
pub fn booking_span(booking: &Booking, window: &[NaiveDate]) -> BookingSpan {
    let (Some(&window_start), Some(&window_end)) = (window.first(), window.last()) else {
        return BookingSpan::hidden();
    };
    // half-open stay vs inclusive window
    if booking.check_out <= window_start || booking.check_in > window_end {
        return BookingSpan::hidden();
    }

    let clipped_start = booking.check_in.max(window_start);
    let clipped_end = booking
        .check_out
        .min(window_end.succ_opt().unwrap_or(window_end));

    let start_index = window
        .iter()
        .position(|d| *d == clipped_start)
        .unwrap_or(0);
    let span_days = nights(clipped_start, clipped_end).max(1);

    BookingSpan {
        start_index,
        span_days,
        is_visible: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_types::{BookingId, BookingSource, BookingStatus};

    fn date(s: &str) -> NaiveDate {
        parse_stay_date(s).unwrap()
    }

    fn booking(room: RoomId, check_in: &str, check_out: &str) -> Booking {
        Booking {
            id: BookingId::new(),
            room_id: Some(room),
            check_in: date(check_in),
            check_out: date(check_out),
            status: BookingStatus::Confirmed,
            source: BookingSource::Direct,
        }
    }

    fn window(start: &str, days: usize) -> Vec<NaiveDate> {
        date(start).iter_days().take(days).collect()
    }

    #[test]
    fn test_single_booking_blocks_half_open_interval() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([booking(room, "2026-03-01", "2026-03-04")]);

        // every night of the stay is blocked
        assert!(!engine.is_date_available(date("2026-03-01"), room));
        assert!(!engine.is_date_available(date("2026-03-02"), room));
        assert!(!engine.is_date_available(date("2026-03-03"), room));
        // the checkout day and everything before check-in are free
        assert!(engine.is_date_available(date("2026-03-04"), room));
        assert!(engine.is_date_available(date("2026-02-28"), room));
    }

    #[test]
    fn test_other_rooms_unaffected() {
        let room = RoomId::new();
        let other = RoomId::new();
        let engine = AvailabilityEngine::new([booking(room, "2026-03-01", "2026-03-04")]);

        assert!(engine.is_date_available(date("2026-03-02"), other));
    }

    #[test]
    fn test_cancelled_bookings_do_not_block() {
        let room = RoomId::new();
        let mut cancelled = booking(room, "2026-03-01", "2026-03-04");
        cancelled.status = BookingStatus::Cancelled;
        let engine = AvailabilityEngine::new([cancelled]);

        assert!(engine.is_date_available(date("2026-03-02"), room));
        assert!(engine
            .is_range_available(date("2026-03-01"), date("2026-03-04"), room)
            .unwrap());
    }

    #[test]
    fn test_unmapped_external_bookings_do_not_block() {
        let room = RoomId::new();
        let mut external = booking(room, "2026-03-01", "2026-03-04");
        external.room_id = None;
        external.source = BookingSource::Ota;
        let engine = AvailabilityEngine::new([external]);

        assert!(engine.is_date_available(date("2026-03-02"), room));
    }

    #[test]
    fn test_back_to_back_range_is_available() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([booking(room, "2026-03-01", "2026-03-04")]);

        // new check-in on the existing check-out day: allowed
        assert!(engine
            .is_range_available(date("2026-03-04"), date("2026-03-07"), room)
            .unwrap());
        // shifted one day earlier: overlap
        assert!(!engine
            .is_range_available(date("2026-03-02"), date("2026-03-07"), room)
            .unwrap());
    }

    #[test]
    fn test_empty_range_is_rejected() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([]);

        assert!(matches!(
            engine.is_range_available(date("2026-03-04"), date("2026-03-04"), room),
            Err(AvailabilityError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_unavailable_dates_inclusive_endpoints() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([booking(room, "2026-03-02", "2026-03-05")]);

        let dates = engine.unavailable_dates(date("2026-03-01"), date("2026-03-06"), room);
        assert_eq!(
            dates,
            vec![date("2026-03-02"), date("2026-03-03"), date("2026-03-04")]
        );

        // restartable: same inputs, same output
        assert_eq!(
            dates,
            engine.unavailable_dates(date("2026-03-01"), date("2026-03-06"), room)
        );
    }

    #[test]
    fn test_booking_span_inside_window() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([]);
        let b = booking(room, "2026-03-03", "2026-03-06");
        let w = window("2026-03-01", 14);

        let span = booking_span(&b, &w);
        assert!(span.is_visible);
        assert_eq!(span.start_index, 2);
        assert_eq!(span.span_days, 3);
    }

    #[test]
    fn test_booking_span_clipped_at_window_start() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([]);
        let b = booking(room, "2026-02-25", "2026-03-03");
        let w = window("2026-03-01", 7);

        let span = booking_span(&b, &w);
        assert!(span.is_visible);
        assert_eq!(span.start_index, 0);
        assert_eq!(span.span_days, 2);
    }

    #[test]
    fn test_booking_span_outside_window_hidden() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([]);
        let w = window("2026-03-01", 7);

        // checkout on the window's first day: half-open stay, not visible
        let before = booking(room, "2026-02-20", "2026-03-01");
        assert!(!booking_span(&before, &w).is_visible);

        let after = booking(room, "2026-03-10", "2026-03-12");
        assert!(!booking_span(&after, &w).is_visible);
    }

    #[test]
    fn test_booking_span_minimum_one_cell() {
        let room = RoomId::new();
        let engine = AvailabilityEngine::new([]);
        // checkout the day after the window ends, check-in on the last day
        let b = booking(room, "2026-03-07", "2026-03-08");
        let w = window("2026-03-01", 7);

        let span = booking_span(&b, &w);
        assert!(span.is_visible);
        assert_eq!(span.start_index, 6);
        assert_eq!(span.span_days, 1);
    }

    #[test]
    fn test_parse_stay_date() {
        assert_eq!(parse_stay_date("2026-03-01").unwrap(), date("2026-03-01"));
        assert!(matches!(
            parse_stay_date("03/01/2026"),
            Err(AvailabilityError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_stay_date("not-a-date"),
            Err(AvailabilityError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_nights() {
        assert_eq!(nights(date("2026-03-01"), date("2026-03-04")), 3);
        assert_eq!(nights(date("2026-03-04"), date("2026-03-01")), 0);
    }
}
