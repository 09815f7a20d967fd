//! Account, phone, upload and pagination validation tests

use proptest::prelude::*;
use shared::{
    to_international_phone, to_local_phone, validate_account, validate_image_upload,
    validate_password, validate_taiwan_mobile, ApprovalStatus, Pagination,
    PaginationMeta, UserRole, MAX_IMAGE_BYTES,
};

fn local_mobile_strategy() -> impl Strategy<Value = String> {
    "09[0-9]{8}"
}

proptest! {
    /// Local and international forms convert back and forth
    #[test]
    fn prop_phone_forms_round_trip(local in local_mobile_strategy()) {
        let international = to_international_phone(&local);

        prop_assert!(international.starts_with("+8869"));
        prop_assert_eq!(to_local_phone(&international), local.clone());
        prop_assert!(validate_taiwan_mobile(&local).is_ok());
        prop_assert!(validate_taiwan_mobile(&international).is_ok());
    }

    #[test]
    fn prop_valid_accounts_accepted(account in "[a-zA-Z0-9]{4,20}") {
        prop_assert!(validate_account(&account).is_ok());
    }

    #[test]
    fn prop_short_passwords_rejected(password in "[a-z]{0,3}") {
        prop_assert!(validate_password(&password).is_err());
    }

    /// Page count always covers every item
    #[test]
    fn prop_total_pages_cover_items(total in 0i64..10_000, limit in 1u32..=100) {
        let meta = PaginationMeta::new(Pagination { page: 1, limit }, total);
        let capacity = u64::from(meta.total_pages) * u64::from(limit);

        prop_assert!(capacity >= meta.total_items);
        prop_assert!(capacity < meta.total_items + u64::from(limit));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_account_boundaries() {
        assert!(validate_account("abcd").is_ok());
        assert!(validate_account(&"a".repeat(20)).is_ok());
        assert!(validate_account("abc").is_err());
        assert!(validate_account("abc def").is_err());
    }

    #[test]
    fn test_password_boundaries() {
        assert!(validate_password("1234").is_ok());
        assert!(validate_password(&"x".repeat(20)).is_ok());
        assert!(validate_password(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_landline_is_not_mobile() {
        assert!(validate_taiwan_mobile("0223456789").is_err());
        assert!(validate_taiwan_mobile("+886223456789").is_err());
    }

    #[test]
    fn test_image_upload_rules() {
        assert!(validate_image_upload(Some("image/png"), 1024).is_ok());
        assert!(validate_image_upload(Some("application/pdf"), 1024).is_err());
        assert!(validate_image_upload(None, 1024).is_err());
        assert!(validate_image_upload(Some("image/jpeg"), 0).is_err());
        assert!(validate_image_upload(Some("image/jpeg"), MAX_IMAGE_BYTES + 1).is_err());
    }

    #[test]
    fn test_pagination_defaults_and_cap() {
        let defaults = Pagination::from_query(None, None);
        assert_eq!((defaults.page, defaults.limit), (1, 5));
        assert_eq!(defaults.offset(), 0);

        let capped = Pagination::from_query(Some(3), Some(500));
        assert_eq!(capped.limit, Pagination::MAX_LIMIT);
        assert_eq!(capped.offset(), 200);

        let zeroes = Pagination::from_query(Some(0), Some(0));
        assert_eq!((zeroes.page, zeroes.limit), (1, 5));
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(Pagination { page: 2, limit: 5 }, 11);
        assert_eq!(meta.total_items, 11);
        assert_eq!(meta.total_pages, 3);

        let empty = PaginationMeta::new(Pagination::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_role_codes() {
        for role in [UserRole::Customer, UserRole::Vendor, UserRole::Admin] {
            assert_eq!(UserRole::from_code(role.code()), Some(role));
        }
        assert_eq!(UserRole::from_code(7), None);
        assert!(UserRole::Vendor.is_staff());
        assert!(!UserRole::Customer.is_staff());
    }

    #[test]
    fn test_vendors_start_pending() {
        assert_eq!(UserRole::Vendor.initial_approval(), ApprovalStatus::Pending);
        assert_eq!(UserRole::Customer.initial_approval(), ApprovalStatus::Approved);
    }
}
