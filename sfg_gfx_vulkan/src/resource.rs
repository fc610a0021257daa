use ash::vk;
use gpu_allocator::vulkan::Allocation;
use sfg_memory::Handle;

/// Converts a typed `sfg_memory::Handle<T>` used as this backend's internal pool key into the
/// plain `{index, generation}` id `sfg_gfx` command payloads embed. The two are deliberately
/// distinct types (see `sfg_gfx::ids`): this is the one place that bridges them.
pub fn handle_to_id<T, Id: IdLike>(handle: Handle<T>) -> Id {
    Id::from_parts(handle.index(), handle.generation())
}

pub fn id_to_handle<T, Id: IdLike>(id: Id) -> Handle<T> {
    Handle::from_raw(id.index(), id.generation())
}

pub trait IdLike: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(&self) -> u32;
    fn generation(&self) -> u32;
}

macro_rules! impl_id_like {
    ($ty:ty) => {
        impl IdLike for $ty {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }
            fn index(&self) -> u32 {
                self.index
            }
            fn generation(&self) -> u32 {
                self.generation
            }
        }
    };
}

impl_id_like!(sfg_gfx::TextureId);
impl_id_like!(sfg_gfx::SamplerId);
impl_id_like!(sfg_gfx::BufferId);
impl_id_like!(sfg_gfx::PipelineId);
impl_id_like!(sfg_gfx::RenderTargetId);
impl_id_like!(sfg_gfx::BindGroupId);
impl_id_like!(sfg_gfx::BindGroupLayoutId);
impl_id_like!(sfg_gfx::QueueId);
impl_id_like!(sfg_gfx::SemaphoreId);

pub struct GpuBuffer {
    pub raw: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub size: u64,
    pub mappable: bool,
}

pub struct GpuTexture {
    pub raw: vk::Image,
    pub allocation: Option<Allocation>,
    pub views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub current_layout: vk::ImageLayout,
}

pub struct GpuSampler {
    pub raw: vk::Sampler,
}

pub struct GpuPipeline {
    pub raw: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

pub struct GpuBindGroupLayout {
    pub raw: vk::DescriptorSetLayout,
    pub content_hash: u64,
}

pub struct GpuBindGroup {
    pub raw: vk::DescriptorSet,
    pub layout: sfg_gfx::BindGroupLayoutId,
}

pub struct GpuRenderTarget {
    pub color_views: Vec<vk::ImageView>,
    pub depth_view: Option<vk::ImageView>,
    pub is_swapchain: bool,
    pub width: u32,
    pub height: u32,
}
