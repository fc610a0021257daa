//! Scalar easing curves for UI/camera animation, mirrored off the small fixed set the original
//! engine's `Math/Easing.hpp` exposed.

pub fn ease_in_quad(t: f32) -> f32 {
    t * t
}

pub fn ease_out_quad(t: f32) -> f32 {
    t * (2.0 - t)
}

pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let f = t - 1.0;
    f * f * f + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_hold_at_endpoints() {
        for f in [ease_in_quad, ease_out_quad, ease_in_out_quad, ease_out_cubic] {
            assert!((f(0.0)).abs() < 1e-6);
            assert!((f(1.0) - 1.0).abs() < 1e-6);
        }
    }
}
