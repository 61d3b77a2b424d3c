// Scalar helpers shared by the modifier and converter pipeline

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Sign of a value, with zero mapping to zero (unlike `f32::signum`)
pub fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Map `value` from `[min, max]` onto `[0, 1]`, saturating outside the range
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        0.0
    } else if value > max {
        1.0
    } else {
        (value - min) / (max - min)
    }
}

/// Apply a symmetric dead zone to a signed magnitude.
///
/// Magnitudes below `min` read as zero, magnitudes above `max` saturate to
/// one, and everything in between is rescaled to `[0, 1]`. The sign of the
/// input is preserved.
pub fn dead_zone(value: f32, min: f32, max: f32) -> f32 {
    let magnitude = value.abs();
    if magnitude < min {
        0.0
    } else if magnitude > max {
        sign(value)
    } else {
        (magnitude - min) / (max - min) * sign(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(15.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_sign_keeps_zero() {
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(-1.0, 0.0, 2.0), 0.0);
        assert_eq!(normalize(3.0, 0.0, 2.0), 1.0);
        assert_relative_eq!(normalize(0.5, 0.0, 2.0), 0.25);
    }

    #[test]
    fn test_dead_zone() {
        // Inside the inner radius
        assert_eq!(dead_zone(0.1, 0.125, 0.925), 0.0);
        assert_eq!(dead_zone(-0.1, 0.125, 0.925), 0.0);

        // Past the outer radius saturates with sign
        assert_eq!(dead_zone(0.95, 0.125, 0.925), 1.0);
        assert_eq!(dead_zone(-0.95, 0.125, 0.925), -1.0);

        // Rescaled in between
        assert_relative_eq!(dead_zone(0.525, 0.125, 0.925), 0.5, epsilon = 1e-6);
        assert_relative_eq!(dead_zone(-0.525, 0.125, 0.925), -0.5, epsilon = 1e-6);
    }
}
