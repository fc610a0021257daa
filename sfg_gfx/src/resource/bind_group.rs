use crate::ids::{BufferId, SamplerId, TextureId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindGroupResource {
    Texture(TextureId),
    Sampler(SamplerId),
    UniformBuffer(BufferId),
    StorageBuffer(BufferId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub slot: u32,
    pub resource: BindGroupResource,
}

/// Layouts are content-hashed (by slot + resource kind, not by the specific bound resource) so
/// two bind groups that address the same shape of slots share a single backend descriptor-set
/// layout object.
#[derive(Clone, Debug)]
pub struct BindGroupLayoutDescriptor {
    pub slots: Vec<(u32, BindGroupResourceKind)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindGroupResourceKind {
    Texture,
    Sampler,
    UniformBuffer,
    StorageBuffer,
}

impl BindGroupLayoutDescriptor {
    pub fn content_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for (slot, kind) in &self.slots {
            slot.hash(&mut hasher);
            (*kind as u8).hash(&mut hasher);
        }
        hasher.finish()
    }
}
