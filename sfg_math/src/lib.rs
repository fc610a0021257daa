pub mod aabb;
pub mod affine;
pub mod color;
pub mod easing;
pub mod interpolate;

pub use aabb::Aabb;
pub use affine::Affine3;
pub use color::Color;

pub type Vector2 = nalgebra::Vector2<f32>;
pub type Vector3 = nalgebra::Vector3<f32>;
pub type Vector4 = nalgebra::Vector4<f32>;
pub type Quaternion = nalgebra::UnitQuaternion<f32>;
pub type Matrix3 = nalgebra::Matrix3<f32>;

pub use interpolate::{lerp, slerp};
