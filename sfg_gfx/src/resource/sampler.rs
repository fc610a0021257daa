#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    Anisotropic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipmapMode {
    Nearest,
    Linear,
}

/// Content-hashed so identical descriptors share a single backend sampler object; see
/// `SamplerDescriptor::content_hash`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDescriptor {
    pub filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mipmap_mode: MipmapMode,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    pub anisotropy: f32,
}

impl SamplerDescriptor {
    pub fn linear_clamp() -> Self {
        SamplerDescriptor {
            filter: FilterMode::Linear,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mipmap_mode: MipmapMode::Linear,
            border_color: [0.0; 4],
            min_lod: 0.0,
            max_lod: 1000.0,
            lod_bias: 0.0,
            anisotropy: 1.0,
        }
    }

    /// Bit pattern used to dedupe layouts/samplers by content; every field is stable-width so the
    /// hash does not depend on struct padding.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        use std::hash::{Hash, Hasher};
        (self.filter as u8).hash(&mut hasher);
        (self.address_mode_u as u8).hash(&mut hasher);
        (self.address_mode_v as u8).hash(&mut hasher);
        (self.address_mode_w as u8).hash(&mut hasher);
        (self.mipmap_mode as u8).hash(&mut hasher);
        for channel in self.border_color {
            channel.to_bits().hash(&mut hasher);
        }
        self.min_lod.to_bits().hash(&mut hasher);
        self.max_lod.to_bits().hash(&mut hasher);
        self.lod_bias.to_bits().hash(&mut hasher);
        self.anisotropy.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}
