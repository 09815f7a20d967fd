//! Monthly order numbering tests
//!
//! Numbers are built from the database counter value and the order's
//! local calendar date.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::{OrderNumber, OrderNumberError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| date(y, m, d))
}

fn taipei() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

proptest! {
    /// Successive counter values in one month give strictly increasing numbers
    #[test]
    fn prop_successive_counters_increase(day in date_strategy(), counter in 1i32..99_999) {
        let first = OrderNumber::from_counter(day, counter).unwrap();
        let second = OrderNumber::from_counter(day, counter + 1).unwrap();

        prop_assert!(second > first);
        prop_assert_eq!(&first.as_str()[..4], &second.as_str()[..4]);

        let suffix: u32 = second.as_str()[4..].parse().unwrap();
        prop_assert_eq!(suffix, (counter + 1) as u32);
    }

    /// The prefix always encodes the order's month
    #[test]
    fn prop_prefix_matches_month(day in date_strategy(), counter in 1i32..=99_999) {
        let number = OrderNumber::from_counter(day, counter).unwrap();
        let expected = day.format("%y%m").to_string();

        prop_assert_eq!(&number.as_str()[..4], expected.as_str());
        prop_assert_eq!(number.as_str().len(), 9);
    }

    /// Every issued number parses back unchanged
    #[test]
    fn prop_issued_numbers_parse(day in date_strategy(), counter in 1i32..=99_999) {
        let number = OrderNumber::from_counter(day, counter).unwrap();
        prop_assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
    }

    /// Counter values outside 1..=99999 never produce a number
    #[test]
    fn prop_out_of_range_counters_rejected(
        day in date_strategy(),
        counter in prop_oneof![i32::MIN..=0, 100_000i32..],
    ) {
        prop_assert!(OrderNumber::from_counter(day, counter).is_err());
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_first_order_of_month() {
        let number = OrderNumber::from_counter(date(2025, 3, 14), 1).unwrap();
        assert_eq!(number.as_str(), "250300001");
        assert_eq!(number.last_four(), "0001");
    }

    #[test]
    fn test_month_rollover_restarts_sequence() {
        let march = OrderNumber::from_counter(date(2025, 3, 31), 42).unwrap();
        let april = OrderNumber::from_counter(date(2025, 4, 1), 1).unwrap();

        assert_eq!(march.as_str(), "250300042");
        assert_eq!(april.as_str(), "250400001");
        assert_ne!(
            OrderNumber::month_key(date(2025, 3, 31)),
            OrderNumber::month_key(date(2025, 4, 1))
        );
    }

    #[test]
    fn test_month_key() {
        assert_eq!(OrderNumber::month_key(date(2025, 12, 5)), "2025-12");
        assert_eq!(OrderNumber::month_prefix(date(2031, 1, 5)), "3101");
    }

    #[test]
    fn test_early_morning_on_the_first_uses_local_month() {
        // 2025-04-01 03:00 in Taipei is still March in UTC
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 19, 0, 0).unwrap();
        let local = OrderNumber::local_date(now, taipei());

        assert_eq!(local, date(2025, 4, 1));
        assert_eq!(
            OrderNumber::from_counter(local, 1).unwrap().as_str(),
            "250400001"
        );
    }

    #[test]
    fn test_local_date_with_zero_offset_is_utc() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 19, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(OrderNumber::local_date(now, utc), date(2025, 3, 31));
    }

    #[test]
    fn test_counter_overflow_and_invalid_values() {
        assert_eq!(
            OrderNumber::from_counter(date(2025, 3, 1), 100_000),
            Err(OrderNumberError::SequenceOverflow(100_000))
        );
        assert_eq!(
            OrderNumber::from_counter(date(2025, 3, 1), -1),
            Err(OrderNumberError::InvalidSequence(-1))
        );
        assert!(OrderNumber::from_counter(date(2025, 3, 1), 0).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert_eq!(
            OrderNumber::parse("2503001"),
            Err(OrderNumberError::InvalidFormat)
        );
        assert_eq!(
            OrderNumber::parse("25030000a"),
            Err(OrderNumberError::InvalidFormat)
        );
        assert_eq!(
            OrderNumber::parse("251300001"),
            Err(OrderNumberError::InvalidMonth)
        );
        assert_eq!(
            OrderNumber::parse("250000001"),
            Err(OrderNumberError::InvalidMonth)
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let number = OrderNumber::parse("250300042").unwrap();
        assert_eq!(serde_json::to_string(&number).unwrap(), "\"250300042\"");
    }
}
