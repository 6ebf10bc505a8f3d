//! Stayline Types - Canonical domain types for the property-management core
//!
//! This crate contains all foundational types for Stayline with zero
//! dependencies on other stayline crates. It defines the complete type system
//! for:
//!
//! - Identity types (TenantId, LocationId, RoomId, ReservationId, etc.)
//! - Currency codes, the currency metadata registry, and exchange-rate rows
//! - Money (arbitrary-precision decimal amounts tagged with a currency)
//! - Bookings (the unified availability view over reservations and
//!   external-channel bookings)
//! - Charge lines, payment lines, and conversion audit records
//!
//! # Scoping
//!
//! All data is partitioned by tenant (a hotel organization) and location (one
//! physical property). Every scoped operation takes explicit `TenantId` and
//! `LocationId` parameters; there is no ambient tenant context anywhere in
//! the core.

pub mod billing;
pub mod booking;
pub mod currency;
pub mod identity;
pub mod money;

pub use billing::*;
pub use booking::*;
pub use currency::*;
pub use identity::*;
pub use money::*;

/// Version of the Stayline types schema
pub const TYPES_VERSION: &str = "0.1.0";
