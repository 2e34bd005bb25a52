//! Delivery fee quoting and the courier/platform split.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSplit {
    pub total: f64,
    pub courier_share: f64,
    pub platform_share: f64,
}

/// Distance-based delivery fee, rounded to cents.
pub fn quote_fee(distance_km: f64, base_fee: f64, per_km_fee: f64) -> f64 {
    round_cents(base_fee + per_km_fee * distance_km.max(0.0))
}

/// Splits a total fee between courier and platform. The platform share is
/// rounded; the courier gets the remainder so the parts always sum to the
/// total.
pub fn split_fee(total: f64, commission_rate: f64) -> FeeSplit {
    let platform_share = round_cents(total * commission_rate.clamp(0.0, 1.0));
    let courier_share = round_cents(total - platform_share);

    FeeSplit {
        total,
        courier_share,
        platform_share,
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{quote_fee, split_fee};

    #[test]
    fn fee_grows_with_distance() {
        let short = quote_fee(1.0, 2.5, 1.2);
        let long = quote_fee(8.0, 2.5, 1.2);
        assert_eq!(short, 3.7);
        assert_eq!(long, 12.1);
    }

    #[test]
    fn negative_distance_charges_the_base_fee() {
        assert_eq!(quote_fee(-3.0, 2.5, 1.2), 2.5);
    }

    #[test]
    fn shares_always_sum_to_the_total() {
        let split = split_fee(10.01, 0.2);
        assert!((split.courier_share + split.platform_share - split.total).abs() < 1e-9);
        assert_eq!(split.platform_share, 2.0);
        assert_eq!(split.courier_share, 8.01);
    }

    #[test]
    fn commission_rate_is_clamped() {
        let split = split_fee(10.0, 1.5);
        assert_eq!(split.platform_share, 10.0);
        assert_eq!(split.courier_share, 0.0);
    }
}
