pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{
    DeferredGpuDestroy, OwnedTextureLevel, PendingTextureUpload, ResourceKind, ResourceManager,
    ResourceManagerCapacities,
};
pub use storage::{hash_key, Storage};
pub use types::{
    Animation, AnimationChannel, Material, Mesh, Model, ModelNode, ModelRaw, RenderTarget,
    ResourceFlags, Sampler, Shader, Skin, Texture,
};
