//! Unit tests for the Identifiers module
//!
//! Tests cover creation, parsing with and without the entity prefix,
//! conversion, and ordering.

use core_kernel::{AuditReportId, ClaimId, DocumentId, PaymentId, PhotoId, ScopeAreaId};
use proptest::prelude::*;
use uuid::Uuid;

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ClaimId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ClaimId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id = ClaimId::from(uuid);
        assert_eq!(*id.as_uuid(), uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_labelled_format() {
        let uuid = Uuid::parse_str("0190a000-0000-7000-8000-000000000001").unwrap();
        let id = ClaimId::from(uuid);
        assert_eq!(id.labelled(), "CLM-0190a000-0000-7000-8000-000000000001");
        assert_eq!(id.to_string(), "0190a000-0000-7000-8000-000000000001");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("CLM-".parse::<ClaimId>().is_err());
        assert!("not-a-uuid".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        let document = DocumentId::new_v7();
        assert!(document.labelled().parse::<ClaimId>().is_err());
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_each_entity_has_its_prefix() {
        assert!(ClaimId::new_v7().labelled().starts_with("CLM-"));
        assert!(DocumentId::new_v7().labelled().starts_with("DOC-"));
        assert!(AuditReportId::new_v7().labelled().starts_with("AUD-"));
        assert!(PaymentId::new_v7().labelled().starts_with("PAY-"));
        assert!(ScopeAreaId::new_v7().labelled().starts_with("AREA-"));
        assert!(PhotoId::new_v7().labelled().starts_with("PHO-"));
    }

    #[test]
    fn test_serde_roundtrip_is_bare() {
        let id = PaymentId::new_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert!(!json.contains("PAY"));
        let parsed: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}

proptest! {
    #[test]
    fn labelled_and_bare_forms_parse_to_same_id(bytes in any::<[u8; 16]>()) {
        let id = PhotoId::from(Uuid::from_bytes(bytes));
        let from_labelled: PhotoId = id.labelled().parse().unwrap();
        let from_bare: PhotoId = id.to_string().parse().unwrap();
        prop_assert_eq!(from_labelled, id);
        prop_assert_eq!(from_bare, id);
    }
}
