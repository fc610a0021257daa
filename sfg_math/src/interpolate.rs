use crate::{Quaternion, Vector3};

pub fn lerp(a: Vector3, b: Vector3, t: f32) -> Vector3 {
    a + (b - a) * t
}

pub fn slerp(a: Quaternion, b: Quaternion, t: f32) -> Quaternion {
    a.slerp(&b, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_at_zero_and_one() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(10.0, 0.0, 0.0);
        assert_eq!(lerp(a, b, 0.0), a);
        assert_eq!(lerp(a, b, 1.0), b);
    }
}
