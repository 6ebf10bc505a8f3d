//! Identity types for Stayline
//!
//! All identity types are strongly typed wrappers around UUIDs to prevent
//! accidental mixing of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

// Scope identity types
define_id_type!(TenantId, "tenant", "Unique identifier for a hotel organization account");
define_id_type!(LocationId, "loc", "Unique identifier for one physical property of a tenant");
define_id_type!(RoomId, "room", "Unique identifier for a room at a location");

// Reservation and booking identity types
define_id_type!(ReservationId, "resv", "Unique identifier for a reservation");
define_id_type!(BookingId, "booking", "Unique identifier for a booking (reservation or external channel)");

// Financial identity types
define_id_type!(AccountId, "acct", "Unique identifier for a payment account");
define_id_type!(ChargeId, "charge", "Unique identifier for a charge line");
define_id_type!(PaymentId, "pay", "Unique identifier for a payment line");
define_id_type!(AuditEntryId, "audit", "Unique identifier for a conversion audit entry");

/// The (tenant, location) pair that scopes rate tables, rooms, and bookings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant_id: TenantId,
    pub location_id: LocationId,
}

impl Scope {
    pub fn new(tenant_id: TenantId, location_id: LocationId) -> Self {
        Self {
            tenant_id,
            location_id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.location_id)
    }
}
