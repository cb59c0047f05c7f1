use time::OffsetDateTime;

/// Builds `txn_<name lowercased>_<unix millis>`. Two calls in the same
/// millisecond yield the same id.
pub fn transaction_id(processor_name: &str, at: OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("txn_{}_{}", processor_name.to_lowercase(), millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn lowercases_name_and_uses_millis() {
        let at = OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(1_700_000_000_123);
        assert_eq!(transaction_id("Stripe", at), "txn_stripe_1700000000123");
    }

    #[test]
    fn sub_millisecond_precision_is_dropped() {
        let at = OffsetDateTime::UNIX_EPOCH + Duration::nanoseconds(5_999_999);
        assert_eq!(transaction_id("PayPal", at), "txn_paypal_5");
    }

    #[test]
    fn keeps_non_ascii_names() {
        let at = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(transaction_id("ÉCLAIR Pay", at), "txn_éclair pay_0");
    }
}
