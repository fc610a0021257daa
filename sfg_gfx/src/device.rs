use crate::ids::{
    BindGroupId, BindGroupLayoutId, BufferId, PipelineId, QueueId, RenderTargetId, SamplerId,
    SemaphoreId, TextureId,
};
use crate::render_frame::RenderFrame;
use crate::resource::{
    BindGroupEntry, BindGroupLayoutDescriptor, BufferDescriptor, PipelineDescriptor,
    RenderTargetDescriptor, SamplerDescriptor, TextureDescriptor, TextureUploadLevel,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    Graphics,
    Transfer,
    Compute,
}

/// What `GpuDevice::initialize` reports back about the selected adapter, per §4.3: memory heaps,
/// whether host-visible device-local memory exists, and whether anisotropic filtering is
/// available.
#[derive(Clone, Debug)]
pub struct DeviceCapabilities {
    pub device_name: String,
    pub memory_heap_bytes: Vec<u64>,
    pub host_visible_device_local: bool,
    pub anisotropy: bool,
    pub dedicated_transfer_queue: bool,
    pub dedicated_compute_queue: bool,
}

/// The minimum surface the recorder needs to speak to a backend. One implementation per target
/// platform (Vulkan on Windows, Metal on macOS); the recorder and everything upstream of it only
/// ever sees this trait object, never a concrete backend type.
pub trait GpuDevice {
    /// Selects a discrete device preferring the platform's baseline feature level, records queue
    /// families and memory capabilities. Returns a human-readable error instead of panicking —
    /// per §7, backend init failure is a Configuration-class error surfaced through
    /// `App::initialize`'s out-parameter, not a panic.
    fn initialize(&mut self) -> Result<DeviceCapabilities, String>;

    /// Destroys queues, device, debug messenger, instance in reverse order. No resource created
    /// through this device may outlive the call.
    fn shutdown(&mut self);

    fn queue(&self, kind: QueueKind) -> QueueId;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> TextureId;
    fn destroy_texture(&mut self, id: TextureId);
    fn upload_texture(&mut self, id: TextureId, levels: &[TextureUploadLevel<'_>]);

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> SamplerId;
    fn destroy_sampler(&mut self, id: SamplerId);

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BufferId;
    fn destroy_buffer(&mut self, id: BufferId);
    /// Valid only when the buffer's storage is host-visible (§4.3); backends assert this.
    fn map_buffer(&mut self, id: BufferId) -> *mut u8;
    fn unmap_buffer(&mut self, id: BufferId);

    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> PipelineId;
    fn destroy_pipeline(&mut self, id: PipelineId);

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> RenderTargetId;
    fn destroy_render_target(&mut self, id: RenderTargetId);

    fn create_bind_group_layout(&mut self, desc: &BindGroupLayoutDescriptor) -> BindGroupLayoutId;
    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutId,
        entries: &[BindGroupEntry],
    ) -> BindGroupId;
    fn destroy_bind_group(&mut self, id: BindGroupId);

    /// CPU-side fence: blocks up to `timeout_ms` for `semaphore`'s timeline value to reach
    /// `value`. Returns `false` on timeout.
    fn wait_semaphore(&self, semaphore: SemaphoreId, value: u64, timeout_ms: u32) -> bool;

    /// Walks `frame`'s submissions, translates each referenced [`crate::command::CommandStream`]
    /// into native commands, submits to the named queues, and presents any swapchains written to.
    /// Runtime failures are logged and the frame is dropped (§7); a fatal device-lost condition is
    /// reported back through the `Result` so the caller can set `should_close`.
    fn render(&mut self, frame: &RenderFrame) -> Result<(), DeviceLost>;
}

/// Marker returned by `render` on an unrecoverable backend failure, per §4.1's "fatal backend
/// device-lost event sets `should_close`".
#[derive(Debug)]
pub struct DeviceLost(pub String);

impl std::fmt::Display for DeviceLost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gpu device lost: {}", self.0)
    }
}

impl std::error::Error for DeviceLost {}
