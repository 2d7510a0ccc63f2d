//! Strongly-typed identifiers for claim guide entities
//!
//! Every identifier the collaborators hand out is a UUID on the wire. Newtype
//! wrappers keep a document id from being passed where an audit report id is
//! expected. `Display` renders the bare UUID so identifiers can be dropped
//! straight into request paths; `labelled()` adds the entity prefix for logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier with its entity prefix, e.g. `CLM-0190...`
            pub fn labelled(&self) -> String {
                format!("{}-{}", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(raw)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Claim owner flow
define_id!(ClaimId, "CLM");
define_id!(DocumentId, "DOC");
define_id!(AuditReportId, "AUD");
define_id!(PaymentId, "PAY");

// Contractor wizard
define_id!(ScopeAreaId, "AREA");
define_id!(PhotoId, "PHO");
