pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// NaN is never a valid coordinate.
pub fn is_valid_latitude(latitude: f64) -> bool {
    (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latitude_bounds_are_inclusive() {
        assert!(is_valid_latitude(90.0));
        assert!(is_valid_latitude(-90.0));
        assert!(!is_valid_latitude(90.0001));
        assert!(!is_valid_latitude(f64::NAN));
    }

    #[test]
    fn longitude_bounds_are_inclusive() {
        assert!(is_valid_longitude(-180.0));
        assert!(is_valid_longitude(180.0));
        assert!(!is_valid_longitude(-180.5));
    }
}
