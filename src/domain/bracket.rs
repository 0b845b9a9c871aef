//! Weight bracket resolution.
//!
//! Limits are bracket upper bounds scanned in declared order; the first limit
//! at or above the floored weight wins. A 50.9 kg shipment therefore still
//! sits in the 0-50 bracket. Limits are not assumed to be sorted.

pub fn resolve(weight: f64, limits: &[f64]) -> Option<usize> {
    let effective = weight.floor();
    limits.iter().position(|&limit| effective <= limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: [f64; 4] = [50.0, 100.0, 150.0, 500.0];

    #[test]
    fn boundary_is_inclusive() {
        assert_eq!(resolve(50.0, &LIMITS), Some(0));
        assert_eq!(resolve(100.0, &LIMITS), Some(1));
        assert_eq!(resolve(500.0, &LIMITS), Some(3));
    }

    #[test]
    fn fractional_weight_is_floored() {
        assert_eq!(resolve(50.9, &LIMITS), Some(0));
        assert_eq!(resolve(51.0, &LIMITS), Some(1));
        assert_eq!(resolve(0.4, &LIMITS), Some(0));
    }

    #[test]
    fn over_every_limit_is_not_found() {
        assert_eq!(resolve(501.0, &LIMITS), None);
        assert_eq!(resolve(10.0, &[]), None);
    }

    #[test]
    fn declared_order_wins_over_numeric_order() {
        let limits = [100.0, 50.0];
        assert_eq!(resolve(40.0, &limits), Some(0));
        assert_eq!(resolve(120.0, &limits), None);
    }

    #[test]
    fn nan_limit_never_matches() {
        assert_eq!(resolve(10.0, &[f64::NAN, 20.0]), Some(1));
    }
}
