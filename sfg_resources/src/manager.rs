use std::collections::VecDeque;

use sfg_gfx::{BufferId, PipelineId, SamplerId, TextureId};
use sfg_memory::{ChunkAllocator, Handle};

use crate::storage::{hash_key, Storage};
use crate::types::{
    Animation, Material, Mesh, Model, ModelRaw, ResourceFlags, Sampler, Shader, Skin, Texture,
};

/// Ties a concrete resource type to the `Storage<T>` field on [`ResourceManager`] that owns it, so
/// `create_resource::<T>`/`get_resource::<T>`/`destroy_resource::<T>` can be written once instead
/// of once per resource kind.
pub trait ResourceKind: Sized {
    fn storage(manager: &ResourceManager) -> &Storage<Self>;
    fn storage_mut(manager: &mut ResourceManager) -> &mut Storage<Self>;
}

macro_rules! impl_resource_kind {
    ($ty:ty, $field:ident) => {
        impl ResourceKind for $ty {
            fn storage(manager: &ResourceManager) -> &Storage<Self> {
                &manager.$field
            }
            fn storage_mut(manager: &mut ResourceManager) -> &mut Storage<Self> {
                &mut manager.$field
            }
        }
    };
}

impl_resource_kind!(Texture, textures);
impl_resource_kind!(Mesh, meshes);
impl_resource_kind!(Model, models);
impl_resource_kind!(Shader, shaders);
impl_resource_kind!(Material, materials);
impl_resource_kind!(Animation, animations);
impl_resource_kind!(Skin, skins);
impl_resource_kind!(Sampler, samplers);

/// One mip level of texture data awaiting GPU upload; owned (unlike
/// `sfg_gfx::resource::TextureUploadLevel`, which borrows) because it sits in a queue the render
/// thread drains on its own schedule.
pub struct PendingTextureUpload {
    pub texture: Handle<Texture>,
    pub gpu: TextureId,
    pub levels: Vec<OwnedTextureLevel>,
}

pub struct OwnedTextureLevel {
    pub data: Vec<u8>,
    pub width: u16,
    pub height: u16,
    pub bpp: u8,
    pub channels: u8,
}

/// A resource whose destruction was requested while it may still be referenced by an in-flight
/// `SubmitDesc`. Drained at the next frame boundary (§5 "Shared-resource policy").
pub enum DeferredGpuDestroy {
    Texture(TextureId),
    Buffer(BufferId),
    Sampler(SamplerId),
    Pipeline(PipelineId),
}

/// Owns one [`Storage`] per world resource kind, the model-wide chunk arenas model child spans are
/// allocated from, the pending-upload queue the render thread drains before drawing anything that
/// references a freshly loaded resource, and the deferred-destroy queue for GPU objects that might
/// still be pinned by a submission in flight.
pub struct ResourceManager {
    textures: Storage<Texture>,
    meshes: Storage<Mesh>,
    models: Storage<Model>,
    shaders: Storage<Shader>,
    materials: Storage<Material>,
    animations: Storage<Animation>,
    skins: Storage<Skin>,
    samplers: Storage<Sampler>,

    model_nodes: Vec<Option<crate::types::ModelNode>>,
    model_nodes_alloc: ChunkAllocator<u32>,
    model_mesh_handles: Vec<Handle<Mesh>>,
    model_mesh_handles_alloc: ChunkAllocator<u32>,
    model_skin_handles: Vec<Handle<Skin>>,
    model_skin_handles_alloc: ChunkAllocator<u32>,
    model_animation_handles: Vec<Handle<Animation>>,
    model_animation_handles_alloc: ChunkAllocator<u32>,

    resource_uploads: VecDeque<PendingTextureUpload>,
    destroy_queue: Vec<DeferredGpuDestroy>,
}

/// Capacities for every `Storage<T>` and model-arena `ChunkAllocator`, settable from
/// `sfg_app::Settings` (§9 Open Question #4) rather than hard-coded.
#[derive(Clone, Copy, Debug)]
pub struct ResourceManagerCapacities {
    pub textures: usize,
    pub meshes: usize,
    pub models: usize,
    pub shaders: usize,
    pub materials: usize,
    pub animations: usize,
    pub skins: usize,
    pub samplers: usize,
    pub model_node_capacity: usize,
    pub model_child_handle_capacity: usize,
}

impl Default for ResourceManagerCapacities {
    fn default() -> Self {
        ResourceManagerCapacities {
            textures: 32,
            meshes: 64,
            models: 32,
            shaders: 30,
            materials: 20,
            animations: 32,
            skins: 12,
            samplers: 8,
            model_node_capacity: 2048,
            model_child_handle_capacity: 1024,
        }
    }
}

impl ResourceManager {
    pub fn new(capacities: ResourceManagerCapacities) -> Self {
        ResourceManager {
            textures: Storage::new(capacities.textures),
            meshes: Storage::new(capacities.meshes),
            models: Storage::new(capacities.models),
            shaders: Storage::new(capacities.shaders),
            materials: Storage::new(capacities.materials),
            animations: Storage::new(capacities.animations),
            skins: Storage::new(capacities.skins),
            samplers: Storage::new(capacities.samplers),
            // Pre-sized and written to by offset, never by insertion: `ChunkAllocator` reuses freed
            // holes at arbitrary offsets, which a `Vec::insert`/`splice` would corrupt by shifting
            // every span allocated after it.
            model_nodes: (0..capacities.model_node_capacity).map(|_| None).collect(),
            model_nodes_alloc: ChunkAllocator::new(capacities.model_node_capacity),
            model_mesh_handles: vec![Handle::NULL; capacities.model_child_handle_capacity],
            model_mesh_handles_alloc: ChunkAllocator::new(capacities.model_child_handle_capacity),
            model_skin_handles: vec![Handle::NULL; capacities.model_child_handle_capacity],
            model_skin_handles_alloc: ChunkAllocator::new(capacities.model_child_handle_capacity),
            model_animation_handles: vec![Handle::NULL; capacities.model_child_handle_capacity],
            model_animation_handles_alloc: ChunkAllocator::new(
                capacities.model_child_handle_capacity,
            ),
            resource_uploads: VecDeque::new(),
            destroy_queue: Vec::new(),
        }
    }

    /// Allocates a pool slot for `T`, returning the existing handle instead if `hash` is already
    /// registered (§4.4: "if a handle already exists for that hash the call returns the existing
    /// one").
    pub fn create_resource<T: ResourceKind>(
        &mut self,
        hash: u64,
        make: impl FnOnce() -> T,
    ) -> Handle<T> {
        T::storage_mut(self).get_or_create(hash, make).0
    }

    pub fn get_resource<T: ResourceKind>(&self, handle: Handle<T>) -> &T {
        T::storage(self).get(handle)
    }

    pub fn try_get_resource<T: ResourceKind>(&self, handle: Handle<T>) -> Option<&T> {
        T::storage(self).try_get(handle)
    }

    pub fn is_resource_valid<T: ResourceKind>(&self, handle: Handle<T>) -> bool {
        T::storage(self).is_valid(handle)
    }

    /// Frees the pool slot for `T`. Callers that own a GPU-backed counterpart (textures,
    /// samplers, shader pipelines, mesh buffers) must also enqueue the matching
    /// [`DeferredGpuDestroy`] — `destroy_texture`/`destroy_mesh`/... do both in one call; this
    /// generic entry point is for resources with no backend object (e.g. `Material`, `Animation`,
    /// `Skin`).
    pub fn destroy_resource<T: ResourceKind>(&mut self, handle: Handle<T>) {
        T::storage_mut(self).destroy(handle);
    }

    pub fn queue_gpu_destroy(&mut self, destroy: DeferredGpuDestroy) {
        self.destroy_queue.push(destroy);
    }

    /// Drains every GPU object queued for destruction since the last frame boundary. The caller
    /// (the render thread, after it finishes walking a frame's submissions) is responsible for
    /// actually calling the matching `GpuDevice::destroy_*`.
    pub fn drain_destroy_queue(&mut self) -> Vec<DeferredGpuDestroy> {
        std::mem::take(&mut self.destroy_queue)
    }

    pub fn destroy_texture(&mut self, handle: Handle<Texture>) {
        let gpu = self.textures.get(handle).gpu;
        self.textures.destroy(handle);
        self.queue_gpu_destroy(DeferredGpuDestroy::Texture(gpu));
    }

    pub fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        let gpu = self.samplers.get(handle).gpu;
        self.samplers.destroy(handle);
        self.queue_gpu_destroy(DeferredGpuDestroy::Sampler(gpu));
    }

    pub fn destroy_shader(&mut self, handle: Handle<Shader>) {
        let pipeline = self.shaders.get(handle).pipeline;
        self.shaders.destroy(handle);
        self.queue_gpu_destroy(DeferredGpuDestroy::Pipeline(pipeline));
    }

    pub fn destroy_mesh(&mut self, handle: Handle<Mesh>) {
        let mesh = *self.meshes.get(handle);
        self.meshes.destroy(handle);
        self.queue_gpu_destroy(DeferredGpuDestroy::Buffer(mesh.vertex_buffer));
        self.queue_gpu_destroy(DeferredGpuDestroy::Buffer(mesh.index_buffer));
    }

    /// Idempotent by `hash`: loading the same texture path twice returns the same handle without
    /// re-reading the file or re-enqueueing the upload. `levels` is the already-decoded image data
    /// (decoding is an external collaborator's job, per §6).
    pub fn load_texture(
        &mut self,
        path: &str,
        width: u32,
        height: u32,
        gpu: TextureId,
        levels: Vec<OwnedTextureLevel>,
    ) -> Handle<Texture> {
        let hash = hash_key(path.as_bytes());
        let (handle, created) = self.textures.get_or_create(hash, || Texture {
            width,
            height,
            mip_level_count: levels.len().max(1) as u32,
            gpu,
            flags: ResourceFlags::PENDING_UPLOAD,
        });
        if created {
            self.resource_uploads.push_back(PendingTextureUpload {
                texture: handle,
                gpu,
                levels,
            });
        }
        handle
    }

    pub fn pending_uploads(&mut self) -> VecDeque<PendingTextureUpload> {
        std::mem::take(&mut self.resource_uploads)
    }

    pub fn mark_uploaded(&mut self, handle: Handle<Texture>) {
        let texture = self.textures.get_mut(handle);
        texture.flags.remove(ResourceFlags::PENDING_UPLOAD);
        texture.flags.insert(ResourceFlags::HW_EXISTS);
    }

    /// Allocates handles for every owned mesh/skin/animation in `raw`, stores their pool handles
    /// contiguously in per-model chunk-allocated spans, and marks the model
    /// `PENDING_UPLOAD | HW_EXISTS` per §4.4. `path` keys the idempotent-by-hash load contract.
    pub fn create_from_raw(&mut self, path: &str, raw: ModelRaw) -> Handle<Model> {
        let hash = hash_key(path.as_bytes());
        if let Some(handle) = self.models.contains_hash(hash) {
            return handle;
        }

        let nodes_span = self.model_nodes_alloc.allocate(raw.nodes.len());
        let nodes_start = nodes_span.offset as usize;
        for (i, node) in raw.nodes.into_iter().enumerate() {
            self.model_nodes[nodes_start + i] = Some(node);
        }

        let mesh_handles: Vec<Handle<Mesh>> = raw
            .meshes
            .into_iter()
            .map(|mesh| self.meshes.create(mesh))
            .collect();
        let meshes_span = self.model_mesh_handles_alloc.allocate(mesh_handles.len());
        let meshes_start = meshes_span.offset as usize;
        self.model_mesh_handles[meshes_start..meshes_start + mesh_handles.len()]
            .copy_from_slice(&mesh_handles);

        let skin_handles: Vec<Handle<Skin>> = raw
            .skins
            .into_iter()
            .map(|skin| self.skins.create(skin))
            .collect();
        let skins_span = self.model_skin_handles_alloc.allocate(skin_handles.len());
        let skins_start = skins_span.offset as usize;
        self.model_skin_handles[skins_start..skins_start + skin_handles.len()]
            .copy_from_slice(&skin_handles);

        let animation_handles: Vec<Handle<Animation>> = raw
            .animations
            .into_iter()
            .map(|animation| self.animations.create(animation))
            .collect();
        let animations_span = self
            .model_animation_handles_alloc
            .allocate(animation_handles.len());
        let animations_start = animations_span.offset as usize;
        self.model_animation_handles[animations_start..animations_start + animation_handles.len()]
            .copy_from_slice(&animation_handles);

        let model = Model {
            nodes: nodes_span,
            meshes: meshes_span,
            skins: skins_span,
            animations: animations_span,
            total_aabb: raw.total_aabb,
            material_count: raw.material_count,
            flags: ResourceFlags::PENDING_UPLOAD | ResourceFlags::HW_EXISTS,
        };
        self.models.get_or_create(hash, || model).0
    }

    pub fn model_meshes(&self, model: &Model) -> &[Handle<Mesh>] {
        let start = model.meshes.offset as usize;
        let end = start + model.meshes.size as usize;
        &self.model_mesh_handles[start..end]
    }

    pub fn model_skins(&self, model: &Model) -> &[Handle<Skin>] {
        let start = model.skins.offset as usize;
        let end = start + model.skins.size as usize;
        &self.model_skin_handles[start..end]
    }

    pub fn model_animations(&self, model: &Model) -> &[Handle<Animation>] {
        let start = model.animations.offset as usize;
        let end = start + model.animations.size as usize;
        &self.model_animation_handles[start..end]
    }

    pub fn model_nodes(&self, model: &Model) -> &[Option<crate::types::ModelNode>] {
        let start = model.nodes.offset as usize;
        let end = start + model.nodes.size as usize;
        &self.model_nodes[start..end]
    }

    /// Cascades skins -> animations -> meshes -> nodes, freeing each chunk span and child resource
    /// before freeing the model's own handle and chunk spans, per §4.4.
    pub fn destroy_model(&mut self, handle: Handle<Model>) {
        let model = *self.models.get(handle);

        for &skin in self.model_skins(&model).to_vec().iter() {
            self.skins.destroy(skin);
        }
        self.model_skin_handles_alloc.free(model.skins);

        for &animation in self.model_animations(&model).to_vec().iter() {
            self.animations.destroy(animation);
        }
        self.model_animation_handles_alloc
            .free(model.animations);

        for &mesh in self.model_meshes(&model).to_vec().iter() {
            self.destroy_mesh(mesh);
        }
        self.model_mesh_handles_alloc.free(model.meshes);

        self.model_nodes_alloc.free(model.nodes);

        self.models.destroy(handle);
    }
}
