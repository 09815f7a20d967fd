//! Order status aggregation tests
//!
//! Covers how line-item transitions roll up into the order:
//! - No-op writes never produce a signal
//! - All-accepted / all-shipped derivation and its precedence
//! - Reason clearing on line-item updates

use proptest::prelude::*;
use shared::{
    aggregate_line_items, evaluate_line_item_change, AggregateOutcome, LineItemStatus,
    OrderNumber, OrderStatus,
};

use LineItemStatus::{Accepted, Rejected, Shipped, Unconfirmed};

fn line_item_status_strategy() -> impl Strategy<Value = LineItemStatus> {
    prop_oneof![
        Just(Unconfirmed),
        Just(Accepted),
        Just(Rejected),
        Just(Shipped),
    ]
}

fn open_order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Unconfirmed),
        Just(OrderStatus::Received),
        Just(OrderStatus::Shipped),
    ]
}

fn order_number(value: &str) -> OrderNumber {
    OrderNumber::parse(value).unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Writing the status an item already has is never a transition
    #[test]
    fn prop_same_status_write_is_silent(
        status in line_item_status_strategy(),
        order_status in open_order_status_strategy(),
        siblings in prop::collection::vec(line_item_status_strategy(), 0..6),
    ) {
        let mut after = siblings.clone();
        after.push(status);

        prop_assert_eq!(
            evaluate_line_item_change(status, status, order_status, &after),
            None
        );
    }

    /// Uniform accepted items always derive Received
    #[test]
    fn prop_all_accepted_derives_received(count in 1usize..10, requested in line_item_status_strategy()) {
        let statuses = vec![Accepted; count];
        let outcome = aggregate_line_items(&statuses, requested);

        prop_assert_eq!(outcome, Some(AggregateOutcome::AllAccepted));
        prop_assert_eq!(
            outcome.and_then(|o| o.derived_status()),
            Some(OrderStatus::Received)
        );
    }

    /// Uniform shipped items always derive Shipped
    #[test]
    fn prop_all_shipped_derives_shipped(count in 1usize..10, requested in line_item_status_strategy()) {
        let statuses = vec![Shipped; count];
        let outcome = aggregate_line_items(&statuses, requested);

        prop_assert_eq!(outcome, Some(AggregateOutcome::AllShipped));
        prop_assert_eq!(
            outcome.and_then(|o| o.derived_status()),
            Some(OrderStatus::Shipped)
        );
    }

    /// Mixed items never overwrite the order status
    #[test]
    fn prop_mixed_items_leave_order_untouched(
        statuses in prop::collection::vec(line_item_status_strategy(), 2..8),
        requested in line_item_status_strategy(),
    ) {
        let uniform_accepted = statuses.iter().all(|s| *s == Accepted);
        let uniform_shipped = statuses.iter().all(|s| *s == Shipped);
        prop_assume!(!uniform_accepted && !uniform_shipped);

        let derived = aggregate_line_items(&statuses, requested).and_then(|o| o.derived_status());
        prop_assert_eq!(derived, None);
    }

    /// Cancelled orders ignore every line-item change
    #[test]
    fn prop_cancelled_order_is_terminal(
        previous in line_item_status_strategy(),
        requested in line_item_status_strategy(),
        statuses in prop::collection::vec(line_item_status_strategy(), 1..6),
        by_vendor in any::<bool>(),
    ) {
        let order_status = if by_vendor {
            OrderStatus::CancelledByVendor
        } else {
            OrderStatus::CancelledByBuyer
        };

        prop_assert_eq!(
            evaluate_line_item_change(previous, requested, order_status, &statuses),
            None
        );
    }

    /// Any status other than Rejected drops the stored reason
    #[test]
    fn prop_non_rejected_clears_reason(
        status in prop_oneof![Just(Unconfirmed), Just(Accepted), Just(Shipped)],
        reason in prop::option::of("[a-z ]{0,20}"),
    ) {
        prop_assert_eq!(status.retained_cancel_reason(reason), None);
    }

    /// Rejected keeps the supplied reason, or the empty string
    #[test]
    fn prop_rejected_never_keeps_stale_reason(reason in prop::option::of("[a-z ]{1,20}")) {
        let stored = Rejected.retained_cancel_reason(reason.clone());
        prop_assert_eq!(stored, Some(reason.unwrap_or_default()));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_last_of_three_accepts_flips_order_to_received() {
        let number = order_number("250300042");

        // Items 1 and 2 already accepted; item 3 goes Unconfirmed -> Accepted
        let after = [Accepted, Accepted, Accepted];
        let outcome =
            evaluate_line_item_change(Unconfirmed, Accepted, OrderStatus::Unconfirmed, &after)
                .unwrap();

        assert_eq!(outcome.derived_status(), Some(OrderStatus::Received));
        let message = outcome.message(&number);
        assert!(message.contains("0042"));
        assert!(message.contains("Received"));
    }

    #[test]
    fn test_intermediate_accepts_produce_nothing() {
        let first = [Accepted, Unconfirmed, Unconfirmed];
        assert_eq!(
            evaluate_line_item_change(Unconfirmed, Accepted, OrderStatus::Unconfirmed, &first),
            None
        );

        let second = [Accepted, Accepted, Unconfirmed];
        assert_eq!(
            evaluate_line_item_change(Unconfirmed, Accepted, OrderStatus::Unconfirmed, &second),
            None
        );
    }

    #[test]
    fn test_rejection_signal_without_order_change() {
        let number = order_number("250300007");
        let after = [Accepted, Rejected, Unconfirmed];
        let outcome =
            evaluate_line_item_change(Unconfirmed, Rejected, OrderStatus::Unconfirmed, &after)
                .unwrap();

        assert_eq!(outcome, AggregateOutcome::PartialRejection);
        assert_eq!(outcome.derived_status(), None);
        assert!(outcome.message(&number).contains("0007"));
    }

    #[test]
    fn test_earlier_rejection_is_not_reported_again() {
        // Item 2 was rejected before; accepting item 3 leaves a mixed state
        let after = [Accepted, Rejected, Accepted];
        assert_eq!(
            evaluate_line_item_change(Unconfirmed, Accepted, OrderStatus::Unconfirmed, &after),
            None
        );
    }

    #[test]
    fn test_single_rejected_item_reports_partial_rejection() {
        assert_eq!(
            aggregate_line_items(&[Rejected], Rejected),
            Some(AggregateOutcome::PartialRejection)
        );
    }

    #[test]
    fn test_final_shipment_flips_order_to_shipped() {
        let after = [Shipped, Shipped];
        let outcome =
            evaluate_line_item_change(Accepted, Shipped, OrderStatus::Received, &after).unwrap();
        assert_eq!(outcome.derived_status(), Some(OrderStatus::Shipped));
    }

    #[test]
    fn test_empty_order_has_no_signal() {
        assert_eq!(aggregate_line_items(&[], Accepted), None);
    }

    #[test]
    fn test_rejected_to_accepted_clears_out_of_stock_reason() {
        assert_eq!(
            Accepted.retained_cancel_reason(Some("out of stock".to_string())),
            None
        );
        assert_eq!(Rejected.retained_cancel_reason(None), Some(String::new()));
    }

    #[test]
    fn test_order_status_groups() {
        assert!(OrderStatus::Unconfirmed.is_open());
        assert!(OrderStatus::Received.is_open());
        assert!(!OrderStatus::Shipped.is_open());
        assert!(OrderStatus::CancelledByBuyer.is_cancellation());
        assert!(OrderStatus::CancelledByVendor.is_cancellation());
        assert!(!OrderStatus::Shipped.is_cancellation());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::CancelledByVendor).unwrap(),
            "\"cancelled_by_vendor\""
        );
        assert_eq!(
            serde_json::from_str::<LineItemStatus>("\"accepted\"").unwrap(),
            Accepted
        );
        assert_eq!(OrderStatus::Received.as_str(), "received");
        assert_eq!(Shipped.as_str(), "shipped");
    }
}
