use crate::{Affine3, Vector3};

/// Axis-aligned bounding box. `min`/`max` may be inverted (min > max) to represent "empty" in the
/// same way a freshly created entity's AABB starts out before anything expands it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn empty() -> Aabb {
        Aabb {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn from_min_max(min: Vector3, max: Vector3) -> Aabb {
        Aabb { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vector3) {
        self.min = self.min.zip_map(&point, f32::min);
        self.max = self.max.zip_map(&point, f32::max);
    }

    pub fn merge(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min.zip_map(&other.min, f32::min),
            max: self.max.zip_map(&other.max, f32::max),
        }
    }

    pub fn transform(&self, transform: &Affine3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];
        let mut result = Aabb::empty();
        for corner in corners {
            result.expand(transform.transform_point(corner));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_merge_adopts_other() {
        let empty = Aabb::empty();
        let other = Aabb::from_min_max(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(empty.merge(&other), other);
    }

    #[test]
    fn expand_grows_bounds() {
        let mut aabb = Aabb::from_min_max(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        aabb.expand(Vector3::new(2.0, -1.0, 0.5));
        assert_eq!(aabb.min, Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vector3::new(2.0, 1.0, 1.0));
    }
}
