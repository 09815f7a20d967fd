//! Cart and catalog tests
//!
//! Tests for checkout inputs including:
//! - Line total arithmetic
//! - Cart quantity and distinct product ids
//! - Category parsing

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{cart_product_ids, cart_quantity, line_total, CartLine, ProductCategory};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn cart_strategy() -> impl Strategy<Value = Vec<CartLine>> {
    prop::collection::vec(
        (1i64..20, 1i32..50).prop_map(|(product_id, quantity)| CartLine {
            product_id,
            quantity,
        }),
        0..12,
    )
}

proptest! {
    /// Line totals scale linearly with quantity
    #[test]
    fn prop_line_total_is_additive(
        price_cents in 0i64..1_000_000,
        a in 0i32..100,
        b in 0i32..100,
    ) {
        let price = Decimal::new(price_cents, 2);
        prop_assert_eq!(line_total(price, a + b), line_total(price, a) + line_total(price, b));
    }

    /// Cart quantity is the plain sum of line quantities
    #[test]
    fn prop_cart_quantity_sums_lines(lines in cart_strategy()) {
        let expected: i64 = lines.iter().map(|l| l.quantity as i64).sum();
        prop_assert_eq!(cart_quantity(&lines), expected);
    }

    /// Product ids are distinct and sorted
    #[test]
    fn prop_cart_product_ids_are_distinct(lines in cart_strategy()) {
        let ids = cart_product_ids(&lines);

        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(lines.iter().all(|l| ids.contains(&l.product_id)));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_line_total_basic() {
        assert_eq!(line_total(dec("100"), 2), dec("200"));
        assert_eq!(line_total(dec("45.5"), 3), dec("136.5"));
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(cart_quantity(&[]), 0);
        assert!(cart_product_ids(&[]).is_empty());
    }

    #[test]
    fn test_repeated_product_lines_share_one_id() {
        let lines = vec![
            CartLine { product_id: 3, quantity: 2 },
            CartLine { product_id: 1, quantity: 1 },
            CartLine { product_id: 3, quantity: 4 },
        ];

        assert_eq!(cart_product_ids(&lines), vec![1, 3]);
        assert_eq!(cart_quantity(&lines), 7);
    }

    #[test]
    fn test_category_from_name_or_label() {
        assert_eq!(
            ProductCategory::from_str("korean").unwrap(),
            ProductCategory::Korean
        );
        assert_eq!(
            ProductCategory::from_str("手搖杯飲料").unwrap(),
            ProductCategory::HandShakenDrinks
        );
        assert!(ProductCategory::from_str("pizza").is_err());
    }

    #[test]
    fn test_category_labels_parse() {
        let labels = [
            ("中式料理", ProductCategory::Chinese),
            ("韓式料理", ProductCategory::Korean),
            ("日式料理", ProductCategory::Japanese),
            ("其他", ProductCategory::Other),
        ];
        for (label, category) in labels {
            assert_eq!(ProductCategory::from_str(label).unwrap(), category);
        }
    }

    #[test]
    fn test_cart_line_wire_format() {
        let line: CartLine = serde_json::from_str(r#"{"productId":7,"quantity":3}"#).unwrap();
        assert_eq!(line.product_id, 7);
        assert_eq!(line.quantity, 3);
    }
}
