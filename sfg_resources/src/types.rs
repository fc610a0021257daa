use bitflags::bitflags;

use sfg_gfx::{BufferId, PipelineId, RenderTargetId, SamplerId, TextureId};
use sfg_math::Aabb;
use sfg_memory::{ChunkHandle, Handle};

bitflags! {
    /// Lifecycle flags for resources that own a GPU-side counterpart created asynchronously to
    /// their CPU-side construction (§4.4: a `load_*` call constructs the resource immediately and
    /// enqueues its GPU upload for the render thread to pick up before first use).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ResourceFlags: u32 {
        const PENDING_UPLOAD = 1 << 0;
        const HW_EXISTS = 1 << 1;
    }
}

#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub gpu: TextureId,
    pub flags: ResourceFlags,
}

#[derive(Clone, Copy, Debug)]
pub struct Mesh {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub vertex_count: u32,
    pub aabb: Aabb,
    pub material_index: u32,
}

#[derive(Clone, Debug)]
pub struct Shader {
    pub pipeline: PipelineId,
}

#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub shader: Handle<Shader>,
    pub base_color_texture: Option<Handle<Texture>>,
    pub sampler: Option<Handle<Sampler>>,
    pub base_color_factor: [f32; 4],
}

#[derive(Clone, Debug)]
pub struct AnimationChannel {
    pub target_node: u32,
    pub times: Vec<f32>,
    pub values: Vec<[f32; 4]>,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
}

#[derive(Clone, Debug)]
pub struct Skin {
    pub joint_nodes: Vec<u32>,
    pub inverse_bind_matrices: Vec<sfg_math::Affine3>,
}

#[derive(Clone, Copy, Debug)]
pub struct Sampler {
    pub gpu: SamplerId,
}

/// A node in a model's scene graph, as handed in by `ModelRaw`. `mesh`/`skin` are indices into
/// `ModelRaw::meshes`/`skins`, not resource handles yet — those only exist once `create_from_raw`
/// allocates them.
#[derive(Clone, Debug)]
pub struct ModelNode {
    pub name: String,
    pub parent: Option<u32>,
    pub local_transform: sfg_math::Affine3,
    pub mesh: Option<u32>,
    pub skin: Option<u32>,
}

/// What an external model parser (glTF, or any other asset pipeline collaborator) produces; never
/// touches the GPU or a pool directly. `ResourceManager::create_from_raw` is the only thing that
/// turns this into live handles.
#[derive(Clone, Debug)]
pub struct ModelRaw {
    pub nodes: Vec<ModelNode>,
    pub meshes: Vec<Mesh>,
    pub skins: Vec<Skin>,
    pub animations: Vec<Animation>,
    pub total_aabb: Aabb,
    pub material_count: u32,
}

/// Owns spans of child resources allocated in the resource manager's model-wide chunk allocators.
/// `destroy` must be called exactly once before the model's own handle is freed; it cascades in
/// skins -> animations -> meshes -> nodes order, per §4.4.
#[derive(Clone, Copy, Debug)]
pub struct Model {
    pub nodes: ChunkHandle<u32>,
    pub meshes: ChunkHandle<u32>,
    pub skins: ChunkHandle<u32>,
    pub animations: ChunkHandle<u32>,
    pub total_aabb: Aabb,
    pub material_count: u32,
    pub flags: ResourceFlags,
}

pub struct RenderTarget {
    pub gpu: RenderTargetId,
    pub width: u32,
    pub height: u32,
}
