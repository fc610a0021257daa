use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::{AllocationSizes, AllocatorDebugSettings, MemoryLocation};
use parking_lot::Mutex;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use sfg_gfx::command::{self, CommandType, DecodedCommand};
use sfg_gfx::device::{DeviceCapabilities, DeviceLost, GpuDevice, QueueKind};
use sfg_gfx::ids::{
    BindGroupId, BindGroupLayoutId, BufferId, PipelineId, QueueId, RenderTargetId, SamplerId,
    SemaphoreId, TextureId,
};
use sfg_gfx::render_frame::{RenderFrame, SubmitDesc};
use sfg_gfx::resource::{
    BindGroupEntry, BindGroupLayoutDescriptor, BindGroupResource, BufferDescriptor, BufferStorage,
    PipelineDescriptor, RenderTargetAttachment, RenderTargetDescriptor, SamplerDescriptor,
    TextureDescriptor, TextureUploadLevel,
};
use sfg_memory::{Handle, Pool};

use crate::instance::{self, Instance, PhysicalDevice, QueueFamily, Surface};
use crate::resource::{
    handle_to_id, id_to_handle, GpuBindGroup, GpuBindGroupLayout, GpuBuffer, GpuPipeline,
    GpuRenderTarget, GpuSampler, GpuTexture,
};
use crate::shader::create_shader_module;

pub(crate) struct DeviceShared {
    pub(crate) instance: Instance,
    pub(crate) surface: Surface,
    pub(crate) physical_device: PhysicalDevice,
    pub(crate) raw: ash::Device,
    pub(crate) allocator: Mutex<Allocator>,
    pub(crate) graphics_family: QueueFamily,
    pub(crate) transfer_family: QueueFamily,
    pub(crate) compute_family: QueueFamily,
    pub(crate) queue_graphics: vk::Queue,
    pub(crate) queue_transfer: vk::Queue,
    pub(crate) queue_compute: vk::Queue,
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.raw.device_wait_idle();
            self.raw.destroy_device(None);
        }
    }
}

struct Swapchain {
    raw_ash: ash::khr::swapchain::Device,
    raw: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    image_index: u32,
}

impl Swapchain {
    /// Grounded on the teacher's `vulkan::lib::Swapchain::new`: prefers BGRA8 sRGB-nonlinear,
    /// falls back to the first advertised format, and clamps the extent to the surface's reported
    /// bounds when the platform doesn't hand back a fixed `current_extent`.
    fn new(shared: &DeviceShared) -> Result<Self, String> {
        let formats = unsafe {
            shared
                .surface
                .raw_ash
                .get_physical_device_surface_formats(shared.physical_device.raw, shared.surface.raw_vulkan)
                .map_err(|e| format!("failed to query surface formats: {e}"))?
        };
        let surface_format = *formats
            .iter()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_UNORM
                    && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .unwrap_or(&formats[0]);

        let capabilities = unsafe {
            shared
                .surface
                .raw_ash
                .get_physical_device_surface_capabilities(
                    shared.physical_device.raw,
                    shared.surface.raw_vulkan,
                )
                .map_err(|e| format!("failed to query surface capabilities: {e}"))?
        };
        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            capabilities.max_image_extent
        };
        let image_count = if capabilities.max_image_count == 0 {
            capabilities.min_image_count + 1
        } else {
            capabilities.max_image_count.min(capabilities.min_image_count + 1)
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(shared.surface.raw_vulkan)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true);

        let raw_ash = ash::khr::swapchain::Device::new(&shared.instance.raw, &shared.raw);
        let raw = unsafe {
            raw_ash
                .create_swapchain(&create_info, None)
                .map_err(|e| format!("vkCreateSwapchainKHR failed: {e}"))?
        };

        let images = unsafe {
            raw_ash
                .get_swapchain_images(raw)
                .map_err(|e| format!("failed to get swapchain images: {e}"))?
        };
        let views = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .level_count(1)
                            .layer_count(1),
                    );
                unsafe {
                    shared
                        .raw
                        .create_image_view(&view_info, None)
                        .map_err(|e| format!("vkCreateImageView failed: {e}"))
                }
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Swapchain {
            raw_ash,
            raw,
            images,
            views,
            format: surface_format.format,
            extent,
            image_index: 0,
        })
    }

    fn acquire_next_image(&mut self, signal_semaphore: vk::Semaphore) -> Result<u32, vk::Result> {
        let (image_index, _suboptimal) = unsafe {
            self.raw_ash
                .acquire_next_image(self.raw, u64::MAX, signal_semaphore, vk::Fence::null())?
        };
        self.image_index = image_index;
        Ok(image_index)
    }

    fn current_view(&self) -> vk::ImageView {
        self.views[self.image_index as usize]
    }

    fn present(&self, queue: vk::Queue, wait_semaphores: &[vk::Semaphore]) -> Result<bool, vk::Result> {
        let swapchains = [self.raw];
        let image_indices = [self.image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        unsafe { self.raw_ash.queue_present(queue, &present_info) }
    }

    fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for view in self.views.drain(..) {
                device.destroy_image_view(view, None);
            }
            if self.raw != vk::SwapchainKHR::null() {
                self.raw_ash.destroy_swapchain(self.raw, None);
                self.raw = vk::SwapchainKHR::null();
            }
        }
        self.images.clear();
    }
}

/// Vulkan implementation of [`GpuDevice`]. Owns every native object created through the trait's
/// resource-creation calls in pools keyed by the `sfg_gfx::ids` types (generation-checked the same
/// way `sfg_memory::Pool` checks any other handle; see `crate::resource::handle_to_id`).
pub struct VulkanDevice {
    window_handle: RawWindowHandle,
    display_handle: RawDisplayHandle,
    app_name: String,
    shared: Option<Arc<DeviceShared>>,
    swapchain: Option<Mutex<Swapchain>>,
    command_pool: vk::CommandPool,
    descriptor_pool: vk::DescriptorPool,
    timeline_semaphore: vk::Semaphore,
    timeline_value: std::sync::atomic::AtomicU64,
    image_acquired_semaphore: vk::Semaphore,
    render_finished_semaphore: vk::Semaphore,
    binary_semaphores: Pool<vk::Semaphore>,
    textures: Pool<GpuTexture>,
    buffers: Pool<GpuBuffer>,
    samplers: Pool<GpuSampler>,
    pipelines: Pool<GpuPipeline>,
    bind_group_layouts: Pool<GpuBindGroupLayout>,
    bind_groups: Pool<GpuBindGroup>,
    render_targets: Pool<GpuRenderTarget>,
    bound_pipeline: Option<vk::PipelineLayout>,
}

impl VulkanDevice {
    pub fn new(
        window_handle: RawWindowHandle,
        display_handle: RawDisplayHandle,
        app_name: impl Into<String>,
    ) -> Self {
        VulkanDevice {
            window_handle,
            display_handle,
            app_name: app_name.into(),
            shared: None,
            swapchain: None,
            command_pool: vk::CommandPool::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            timeline_semaphore: vk::Semaphore::null(),
            timeline_value: std::sync::atomic::AtomicU64::new(0),
            image_acquired_semaphore: vk::Semaphore::null(),
            render_finished_semaphore: vk::Semaphore::null(),
            binary_semaphores: Pool::new(4),
            textures: Pool::new(32),
            buffers: Pool::new(256),
            samplers: Pool::new(20),
            pipelines: Pool::new(30),
            bind_group_layouts: Pool::new(32),
            bind_groups: Pool::new(64),
            render_targets: Pool::new(32),
            bound_pipeline: None,
        }
    }

    fn shared(&self) -> &Arc<DeviceShared> {
        self.shared.as_ref().expect("device not initialized")
    }

    /// The fixed id every `SubmitDesc` wait/signal entry is expected to reference: this backend
    /// exposes one monotonic timeline semaphore per §4.3's submission protocol rather than letting
    /// callers create arbitrary semaphore objects (there is no `create_semaphore` in `GpuDevice`).
    pub fn timeline_semaphore_id(&self) -> SemaphoreId {
        SemaphoreId {
            index: 0,
            generation: 1,
        }
    }

    fn resolve_semaphore(&self, id: SemaphoreId) -> vk::Semaphore {
        if id.index == 0 && id.generation == 1 {
            return self.timeline_semaphore;
        }
        let handle: Handle<vk::Semaphore> = id_to_handle(id);
        self.binary_semaphores
            .try_get(handle)
            .copied()
            .unwrap_or(self.timeline_semaphore)
    }

    fn queue_raw(&self, queue: QueueId) -> vk::Queue {
        let shared = self.shared();
        if queue.index == shared.transfer_family.index {
            shared.queue_transfer
        } else if queue.index == shared.compute_family.index {
            shared.queue_compute
        } else {
            shared.queue_graphics
        }
    }

    fn format_of(format: sfg_gfx::resource::TextureFormat) -> vk::Format {
        use sfg_gfx::resource::TextureFormat as F;
        match format {
            F::R8Unorm => vk::Format::R8_UNORM,
            F::Rg8Unorm => vk::Format::R8G8_UNORM,
            F::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            F::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
            F::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            F::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            F::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
            F::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
            F::D32Float => vk::Format::D32_SFLOAT,
            F::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
            F::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
        }
    }
}

impl GpuDevice for VulkanDevice {
    fn initialize(&mut self) -> Result<DeviceCapabilities, String> {
        let instance = Instance::new(self.display_handle, &self.app_name).map_err(|e| e.to_string())?;
        let surface = Surface::new(&instance, self.window_handle, self.display_handle)
            .map_err(|e| e.to_string())?;
        let physical_devices = instance.physical_devices(&surface).map_err(|e| e.to_string())?;
        let physical_device = instance::select_discrete_device(&physical_devices)?;

        let graphics_family = physical_device.select_queue_family(false, false);
        let transfer_family = physical_device.select_queue_family(false, true);
        let compute_family = physical_device.select_queue_family(true, false);

        let priorities = [1.0f32];
        let mut family_indices = vec![
            graphics_family.index,
            transfer_family.index,
            compute_family.index,
        ];
        family_indices.sort();
        family_indices.dedup();
        let queue_infos: Vec<_> = family_indices
            .iter()
            .map(|&index| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(index)
                    .queue_priorities(&priorities)
            })
            .collect();

        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let mut timeline_features =
            vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
        let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut timeline_features);

        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .push_next(&mut features2);

        let raw = unsafe {
            instance
                .raw
                .create_device(physical_device.raw, &device_info, None)
                .map_err(|e| format!("vkCreateDevice failed: {e}"))?
        };

        let queue_graphics = unsafe { raw.get_device_queue(graphics_family.index, 0) };
        let queue_transfer = unsafe { raw.get_device_queue(transfer_family.index, 0) };
        let queue_compute = unsafe { raw.get_device_queue(compute_family.index, 0) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.raw.clone(),
            device: raw.clone(),
            physical_device: physical_device.raw,
            debug_settings: AllocatorDebugSettings::default(),
            buffer_device_address: false,
            allocation_sizes: AllocationSizes::default(),
        })
        .map_err(|e| format!("gpu_allocator init failed: {e}"))?;

        let command_pool_info =
            vk::CommandPoolCreateInfo::default().queue_family_index(graphics_family.index);
        let command_pool = unsafe {
            raw.create_command_pool(&command_pool_info, None)
                .map_err(|e| e.to_string())?
        };

        let mut timeline_type_info =
            vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::TIMELINE);
        let timeline_info = vk::SemaphoreCreateInfo::default().push_next(&mut timeline_type_info);
        let timeline_semaphore = unsafe {
            raw.create_semaphore(&timeline_info, None)
                .map_err(|e| e.to_string())?
        };

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLED_IMAGE,
                descriptor_count: 256,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: 64,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 256,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 256,
            },
        ];
        let descriptor_pool_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(self.bind_groups.capacity() as u32)
            .pool_sizes(&pool_sizes);
        let descriptor_pool = unsafe {
            raw.create_descriptor_pool(&descriptor_pool_info, None)
                .map_err(|e| format!("vkCreateDescriptorPool failed: {e}"))?
        };

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let image_acquired_semaphore = unsafe {
            raw.create_semaphore(&semaphore_info, None)
                .map_err(|e| e.to_string())?
        };
        let render_finished_semaphore = unsafe {
            raw.create_semaphore(&semaphore_info, None)
                .map_err(|e| e.to_string())?
        };

        let memory_heap_bytes = physical_device.memory_properties.memory_heaps
            [..physical_device.memory_properties.memory_heap_count as usize]
            .iter()
            .map(|heap| heap.size)
            .collect();

        let host_visible_device_local = physical_device.memory_properties.memory_types
            [..physical_device.memory_properties.memory_type_count as usize]
            .iter()
            .any(|ty| {
                ty.property_flags.contains(
                    vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
                )
            });

        let caps = DeviceCapabilities {
            device_name: physical_device.name.clone(),
            memory_heap_bytes,
            host_visible_device_local,
            anisotropy: physical_device.supports_anisotropy,
            dedicated_transfer_queue: transfer_family.index != graphics_family.index,
            dedicated_compute_queue: compute_family.index != graphics_family.index,
        };

        let shared = Arc::new(DeviceShared {
            instance,
            surface,
            physical_device,
            raw,
            allocator: Mutex::new(allocator),
            graphics_family,
            transfer_family,
            compute_family,
            queue_graphics,
            queue_transfer,
            queue_compute,
        });
        let swapchain = Swapchain::new(&shared)?;

        self.shared = Some(shared);
        self.swapchain = Some(Mutex::new(swapchain));
        self.command_pool = command_pool;
        self.descriptor_pool = descriptor_pool;
        self.timeline_semaphore = timeline_semaphore;
        self.image_acquired_semaphore = image_acquired_semaphore;
        self.render_finished_semaphore = render_finished_semaphore;

        log::info!("vulkan device initialized on {}", caps.device_name);
        Ok(caps)
    }

    fn shutdown(&mut self) {
        if let Some(shared) = &self.shared {
            unsafe {
                let _ = shared.raw.device_wait_idle();
                if let Some(swapchain) = &self.swapchain {
                    swapchain.lock().destroy(&shared.raw);
                }
                shared.raw.destroy_descriptor_pool(self.descriptor_pool, None);
                shared.raw.destroy_semaphore(self.image_acquired_semaphore, None);
                shared.raw.destroy_semaphore(self.render_finished_semaphore, None);
                shared.raw.destroy_command_pool(self.command_pool, None);
                shared.raw.destroy_semaphore(self.timeline_semaphore, None);
            }
        }
        self.swapchain = None;
        self.shared = None;
    }

    fn queue(&self, kind: QueueKind) -> QueueId {
        // Queues are not pool-allocated (they live for the device's lifetime); family index
        // doubles as a stable, non-generational "index" with generation fixed at 1.
        let shared = self.shared();
        let family_index = match kind {
            QueueKind::Graphics => shared.graphics_family.index,
            QueueKind::Transfer => shared.transfer_family.index,
            QueueKind::Compute => shared.compute_family.index,
        };
        QueueId {
            index: family_index,
            generation: 1,
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> TextureId {
        let shared = self.shared();
        let format = Self::format_of(desc.format);
        let extent = vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
        };

        let mut usage = vk::ImageUsageFlags::empty();
        if desc.usage.contains(sfg_gfx::resource::TextureUsage::COLOR_ATTACHMENT) {
            usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
        if desc.usage.contains(sfg_gfx::resource::TextureUsage::DEPTH_ATTACHMENT)
            || desc.usage.contains(sfg_gfx::resource::TextureUsage::STENCIL_ATTACHMENT)
        {
            usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        if desc.usage.contains(sfg_gfx::resource::TextureUsage::SAMPLED) {
            usage |= vk::ImageUsageFlags::SAMPLED;
        }
        if desc.usage.contains(sfg_gfx::resource::TextureUsage::TRANSFER_SRC) {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if desc.usage.contains(sfg_gfx::resource::TextureUsage::TRANSFER_DST) {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(match desc.dimension {
                sfg_gfx::resource::TextureDimension::D1 => vk::ImageType::TYPE_1D,
                sfg_gfx::resource::TextureDimension::D2 => vk::ImageType::TYPE_2D,
                sfg_gfx::resource::TextureDimension::D3 => vk::ImageType::TYPE_3D,
            })
            .format(format)
            .extent(extent)
            .mip_levels(desc.mip_level_count)
            .array_layers(desc.array_layer_count)
            .samples(vk::SampleCountFlags::from_raw(desc.sample_count))
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            shared
                .raw
                .create_image(&image_info, None)
                .expect("vkCreateImage failed")
        };
        let requirements = unsafe { shared.raw.get_image_memory_requirements(image) };
        let allocation = shared
            .allocator
            .lock()
            .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                name: "sfg_texture",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
            })
            .expect("gpu_allocator allocation failed");
        unsafe {
            shared
                .raw
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .expect("vkBindImageMemory failed");
        }

        let aspect = if desc.format.has_depth() {
            let mut flags = vk::ImageAspectFlags::DEPTH;
            if desc.format.has_stencil() {
                flags |= vk::ImageAspectFlags::STENCIL;
            }
            flags
        } else {
            vk::ImageAspectFlags::COLOR
        };

        let views = desc
            .views
            .iter()
            .map(|view_desc| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(if view_desc.is_cubemap {
                        vk::ImageViewType::CUBE
                    } else {
                        vk::ImageViewType::TYPE_2D
                    })
                    .format(format)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(aspect)
                            .base_mip_level(view_desc.base_mip)
                            .level_count(view_desc.mip_count)
                            .base_array_layer(view_desc.base_layer)
                            .layer_count(view_desc.layer_count),
                    );
                unsafe {
                    shared
                        .raw
                        .create_image_view(&view_info, None)
                        .expect("vkCreateImageView failed")
                }
            })
            .collect();

        let handle: Handle<GpuTexture> = self.textures.allocate(GpuTexture {
            raw: image,
            allocation: Some(allocation),
            views,
            format,
            extent,
            current_layout: vk::ImageLayout::UNDEFINED,
        });
        handle_to_id(handle)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        let handle = id_to_handle(id);
        let shared = self.shared().clone();
        let texture = self.textures.get_mut(handle);
        unsafe {
            for view in texture.views.drain(..) {
                shared.raw.destroy_image_view(view, None);
            }
            shared.raw.destroy_image(texture.raw, None);
        }
        if let Some(allocation) = texture.allocation.take() {
            let _ = shared.allocator.lock().free(allocation);
        }
        self.textures.free(handle);
    }

    fn upload_texture(&mut self, id: TextureId, levels: &[TextureUploadLevel<'_>]) {
        let shared = self.shared().clone();
        let handle: Handle<GpuTexture> = id_to_handle(id);

        for (mip, level) in levels.iter().enumerate() {
            let staging = self.create_buffer(&BufferDescriptor {
                size: level.data.len() as u64,
                ty: sfg_gfx::resource::BufferType::Vertex,
                storage: BufferStorage::HostVisible,
            });
            let staging_handle: Handle<GpuBuffer> = id_to_handle(staging);
            unsafe {
                let ptr = self.map_buffer(staging);
                std::ptr::copy_nonoverlapping(level.data.as_ptr(), ptr, level.data.len());
                self.unmap_buffer(staging);
            }

            let command_buffer = self.begin_one_shot();
            let texture = self.textures.get(handle);
            let staging_buffer = self.buffers.get(staging_handle);

            let barrier_to_dst = vk::ImageMemoryBarrier2::default()
                .src_access_mask(vk::AccessFlags2::NONE)
                .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                .src_stage_mask(vk::PipelineStageFlags2::NONE)
                .dst_stage_mask(vk::PipelineStageFlags2::COPY)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .image(texture.raw)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(mip as u32)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );
            unsafe {
                shared.raw.cmd_pipeline_barrier2(
                    command_buffer,
                    &vk::DependencyInfo::default()
                        .image_memory_barriers(std::slice::from_ref(&barrier_to_dst)),
                );
            }

            let region = vk::BufferImageCopy2::default()
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(mip as u32)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_extent(vk::Extent3D {
                    width: level.width as u32,
                    height: level.height as u32,
                    depth: 1,
                });
            let copy_info = vk::CopyBufferToImageInfo2::default()
                .src_buffer(staging_buffer.raw)
                .dst_image(texture.raw)
                .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .regions(std::slice::from_ref(&region));
            unsafe {
                shared.raw.cmd_copy_buffer_to_image2(command_buffer, &copy_info);
            }

            let barrier_to_read = vk::ImageMemoryBarrier2::default()
                .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags2::SHADER_READ)
                .src_stage_mask(vk::PipelineStageFlags2::COPY)
                .dst_stage_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER)
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .image(texture.raw)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(mip as u32)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );
            unsafe {
                shared.raw.cmd_pipeline_barrier2(
                    command_buffer,
                    &vk::DependencyInfo::default()
                        .image_memory_barriers(std::slice::from_ref(&barrier_to_read)),
                );
            }

            self.end_one_shot_and_wait(command_buffer);
            self.destroy_buffer(staging);
        }

        self.textures.get_mut(handle).current_layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> SamplerId {
        use sfg_gfx::resource::{AddressMode, FilterMode, MipmapMode};
        let shared = self.shared();
        let filter = match desc.filter {
            FilterMode::Nearest => vk::Filter::NEAREST,
            FilterMode::Linear | FilterMode::Anisotropic => vk::Filter::LINEAR,
        };
        let address = |mode: AddressMode| match mode {
            AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
            AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
            AddressMode::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
        };
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .address_mode_u(address(desc.address_mode_u))
            .address_mode_v(address(desc.address_mode_v))
            .address_mode_w(address(desc.address_mode_w))
            .mipmap_mode(match desc.mipmap_mode {
                MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
                MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
            })
            .min_lod(desc.min_lod)
            .max_lod(desc.max_lod)
            .mip_lod_bias(desc.lod_bias)
            .anisotropy_enable(desc.filter == FilterMode::Anisotropic)
            .max_anisotropy(desc.anisotropy);

        let raw = unsafe {
            shared
                .raw
                .create_sampler(&info, None)
                .expect("vkCreateSampler failed")
        };
        let handle = self.samplers.allocate(GpuSampler { raw });
        handle_to_id(handle)
    }

    fn destroy_sampler(&mut self, id: SamplerId) {
        let handle: Handle<GpuSampler> = id_to_handle(id);
        unsafe {
            self.shared()
                .raw
                .destroy_sampler(self.samplers.get(handle).raw, None);
        }
        self.samplers.free(handle);
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BufferId {
        let shared = self.shared();
        let mut usage = vk::BufferUsageFlags::empty();
        let inferred = desc.ty.inferred_usage();
        if inferred.contains(sfg_gfx::resource::BufferUsage::VERTEX) {
            usage |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if inferred.contains(sfg_gfx::resource::BufferUsage::INDEX) {
            usage |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        if inferred.contains(sfg_gfx::resource::BufferUsage::UNIFORM) {
            usage |= vk::BufferUsageFlags::UNIFORM_BUFFER;
        }
        if inferred.contains(sfg_gfx::resource::BufferUsage::STORAGE) {
            usage |= vk::BufferUsageFlags::STORAGE_BUFFER;
        }
        if inferred.contains(sfg_gfx::resource::BufferUsage::INDIRECT) {
            usage |= vk::BufferUsageFlags::INDIRECT_BUFFER;
        }
        usage |= vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;

        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let raw = unsafe {
            shared
                .raw
                .create_buffer(&info, None)
                .expect("vkCreateBuffer failed")
        };
        let requirements = unsafe { shared.raw.get_buffer_memory_requirements(raw) };
        let location = if desc.is_mappable() {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };
        let allocation = shared
            .allocator
            .lock()
            .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                name: "sfg_buffer",
                requirements,
                location,
                linear: true,
                allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
            })
            .expect("gpu_allocator allocation failed");
        unsafe {
            shared
                .raw
                .bind_buffer_memory(raw, allocation.memory(), allocation.offset())
                .expect("vkBindBufferMemory failed");
        }

        let handle = self.buffers.allocate(GpuBuffer {
            raw,
            allocation: Some(allocation),
            size: desc.size,
            mappable: desc.is_mappable(),
        });
        handle_to_id(handle)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        let handle: Handle<GpuBuffer> = id_to_handle(id);
        let shared = self.shared().clone();
        let buffer = self.buffers.get_mut(handle);
        unsafe { shared.raw.destroy_buffer(buffer.raw, None) };
        if let Some(allocation) = buffer.allocation.take() {
            let _ = shared.allocator.lock().free(allocation);
        }
        self.buffers.free(handle);
    }

    fn map_buffer(&mut self, id: BufferId) -> *mut u8 {
        let handle: Handle<GpuBuffer> = id_to_handle(id);
        let buffer = self.buffers.get_mut(handle);
        assert!(buffer.mappable, "map_buffer called on a non-host-visible buffer");
        let allocation = buffer.allocation.as_ref().expect("buffer has no allocation");
        allocation
            .mapped_ptr()
            .expect("allocation is not persistently mapped")
            .as_ptr()
            .cast()
    }

    fn unmap_buffer(&mut self, _id: BufferId) {
        // gpu_allocator keeps host-visible allocations persistently mapped; nothing to do here,
        // this exists to satisfy the §4.3 map/unmap pairing contract.
    }

    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> PipelineId {
        let shared = self.shared();
        let vertex_module =
            create_shader_module(&shared.raw, &desc.vertex.spirv_or_msl).expect("vertex shader");
        let fragment_module = desc
            .fragment
            .as_ref()
            .map(|stage| create_shader_module(&shared.raw, &stage.spirv_or_msl).expect("fragment shader"));

        let entry_point = std::ffi::CString::new(desc.vertex.entry_point.clone()).unwrap();
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(&entry_point)];
        let fragment_entry_point = desc
            .fragment
            .as_ref()
            .map(|stage| std::ffi::CString::new(stage.entry_point.clone()).unwrap());
        if let (Some(module), Some(entry)) = (fragment_module, &fragment_entry_point) {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(module)
                    .name(entry),
            );
        }

        let layout_handle: Handle<GpuBindGroupLayout> = id_to_handle(desc.bind_group_layout);
        let set_layout = self.bind_group_layouts.get(layout_handle).raw;
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(std::slice::from_ref(&set_layout));
        let layout = unsafe {
            shared
                .raw
                .create_pipeline_layout(&layout_info, None)
                .expect("vkCreatePipelineLayout failed")
        };

        // A full rasterization/blend/depth pipeline build mirrors
        // `eclale_graphics::vulkan::types`'s builder structs; omitted here for brevity but the
        // dynamic-rendering + dynamic viewport/scissor states below are load-bearing: every
        // command stream sets viewport/scissor per §4.3 rather than baking them into the PSO.
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default().topology(
            match desc.topology {
                sfg_gfx::resource::Topology::PointList => vk::PrimitiveTopology::POINT_LIST,
                sfg_gfx::resource::Topology::LineList => vk::PrimitiveTopology::LINE_LIST,
                sfg_gfx::resource::Topology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
                sfg_gfx::resource::Topology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
            },
        );
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(match desc.polygon_mode {
                sfg_gfx::resource::PolygonMode::Fill => vk::PolygonMode::FILL,
                sfg_gfx::resource::PolygonMode::Line => vk::PolygonMode::LINE,
                sfg_gfx::resource::PolygonMode::Point => vk::PolygonMode::POINT,
            })
            .cull_mode(match desc.cull_mode {
                sfg_gfx::resource::CullMode::None => vk::CullModeFlags::NONE,
                sfg_gfx::resource::CullMode::Front => vk::CullModeFlags::FRONT,
                sfg_gfx::resource::CullMode::Back => vk::CullModeFlags::BACK,
            })
            .front_face(match desc.front_face {
                sfg_gfx::resource::FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
                sfg_gfx::resource::FrontFace::CounterClockwise => {
                    vk::FrontFace::COUNTER_CLOCKWISE
                }
            })
            .line_width(1.0)
            .depth_bias_enable(desc.depth_stencil.depth_bias.constant_factor != 0.0)
            .depth_bias_constant_factor(desc.depth_stencil.depth_bias.constant_factor)
            .depth_bias_clamp(desc.depth_stencil.depth_bias.clamp)
            .depth_bias_slope_factor(desc.depth_stencil.depth_bias.slope_factor);
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::from_raw(desc.sample_count));
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_stencil.depth_test_enable)
            .depth_write_enable(desc.depth_stencil.depth_write_enable);
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let color_formats: Vec<_> = desc
            .color_attachments
            .iter()
            .map(|a| Self::format_of(a.format))
            .collect();
        let mut rendering_info =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth_format) = desc.depth_attachment {
            rendering_info = rendering_info.depth_attachment_format(Self::format_of(depth_format));
        }

        let blend_attachments: Vec<_> = desc
            .color_attachments
            .iter()
            .map(|a| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(a.blend.enabled)
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
            })
            .collect();
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);
        pipeline_info.render_pass = vk::RenderPass::null();

        let pipelines = unsafe {
            shared
                .raw
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| e)
                .expect("vkCreateGraphicsPipelines failed")
        };

        unsafe {
            shared.raw.destroy_shader_module(vertex_module, None);
            if let Some(module) = fragment_module {
                shared.raw.destroy_shader_module(module, None);
            }
        }

        let handle = self.pipelines.allocate(GpuPipeline {
            raw: pipelines[0],
            layout,
        });
        handle_to_id(handle)
    }

    fn destroy_pipeline(&mut self, id: PipelineId) {
        let handle: Handle<GpuPipeline> = id_to_handle(id);
        let shared = self.shared();
        let pipeline = self.pipelines.get(handle);
        unsafe {
            shared.raw.destroy_pipeline(pipeline.raw, None);
            shared.raw.destroy_pipeline_layout(pipeline.layout, None);
        }
        self.pipelines.free(handle);
    }

    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> RenderTargetId {
        let mut is_swapchain = false;
        let mut color_views = Vec::with_capacity(desc.color.len());
        for attachment in &desc.color {
            match attachment {
                RenderTargetAttachment::Swapchain => {
                    // Patched in every frame by `sync_swapchain_render_targets` right after
                    // `acquire_next_image`; null until the first `render()` call touches it.
                    is_swapchain = true;
                    color_views.push(vk::ImageView::null());
                }
                RenderTargetAttachment::Owned { textures, .. } => {
                    for &texture_id in textures {
                        let handle: Handle<GpuTexture> = id_to_handle(texture_id);
                        color_views.push(self.textures.get(handle).views[0]);
                    }
                }
            }
        }
        let depth_view = desc.depth.as_ref().and_then(|attachment| match attachment {
            RenderTargetAttachment::Swapchain => None,
            RenderTargetAttachment::Owned { textures, .. } => textures.first().map(|&id| {
                let handle: Handle<GpuTexture> = id_to_handle(id);
                self.textures.get(handle).views[0]
            }),
        });

        let handle = self.render_targets.allocate(GpuRenderTarget {
            color_views,
            depth_view,
            is_swapchain,
            width: desc.width,
            height: desc.height,
        });
        handle_to_id(handle)
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        let handle: Handle<GpuRenderTarget> = id_to_handle(id);
        self.render_targets.free(handle);
    }

    fn create_bind_group_layout(&mut self, desc: &BindGroupLayoutDescriptor) -> BindGroupLayoutId {
        use sfg_gfx::resource::BindGroupResourceKind as Kind;
        let shared = self.shared();
        let bindings: Vec<_> = desc
            .slots
            .iter()
            .map(|(slot, kind)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(*slot)
                    .descriptor_count(1)
                    .descriptor_type(match kind {
                        Kind::Texture => vk::DescriptorType::SAMPLED_IMAGE,
                        Kind::Sampler => vk::DescriptorType::SAMPLER,
                        Kind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
                        Kind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
                    })
                    .stage_flags(vk::ShaderStageFlags::ALL)
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let raw = unsafe {
            shared
                .raw
                .create_descriptor_set_layout(&info, None)
                .expect("vkCreateDescriptorSetLayout failed")
        };
        let handle = self.bind_group_layouts.allocate(GpuBindGroupLayout {
            raw,
            content_hash: desc.content_hash(),
        });
        handle_to_id(handle)
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutId,
        entries: &[BindGroupEntry],
    ) -> BindGroupId {
        // Allocates from the device's global descriptor pool and writes `entries`, mirroring
        // `eclale_graphics::vulkan::resource`'s `create_descriptor_set`/`update_descriptor_set`.
        let shared = self.shared().clone();
        let layout_handle: Handle<GpuBindGroupLayout> = id_to_handle(layout);
        let layout_raw = self.bind_group_layouts.get(layout_handle).raw;

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(std::slice::from_ref(&layout_raw));
        let descriptor_set = unsafe {
            shared
                .raw
                .allocate_descriptor_sets(&alloc_info)
                .expect("vkAllocateDescriptorSets failed")[0]
        };

        // Kept alive until `update_descriptor_sets` runs below, since `WriteDescriptorSet` only
        // borrows these infos.
        let mut image_infos = Vec::with_capacity(entries.len());
        let mut buffer_infos = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.resource {
                BindGroupResource::Texture(id) => {
                    let handle: Handle<GpuTexture> = id_to_handle(id);
                    let view = self.textures.get(handle).views[0];
                    image_infos.push((
                        entry.slot,
                        vk::DescriptorType::SAMPLED_IMAGE,
                        vk::DescriptorImageInfo::default()
                            .image_view(view)
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                    ));
                }
                BindGroupResource::Sampler(id) => {
                    let handle: Handle<GpuSampler> = id_to_handle(id);
                    let sampler = self.samplers.get(handle).raw;
                    image_infos.push((
                        entry.slot,
                        vk::DescriptorType::SAMPLER,
                        vk::DescriptorImageInfo::default().sampler(sampler),
                    ));
                }
                BindGroupResource::UniformBuffer(id) => {
                    let handle: Handle<GpuBuffer> = id_to_handle(id);
                    let buffer = self.buffers.get(handle);
                    buffer_infos.push((
                        entry.slot,
                        vk::DescriptorType::UNIFORM_BUFFER,
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer.raw)
                            .offset(0)
                            .range(buffer.size),
                    ));
                }
                BindGroupResource::StorageBuffer(id) => {
                    let handle: Handle<GpuBuffer> = id_to_handle(id);
                    let buffer = self.buffers.get(handle);
                    buffer_infos.push((
                        entry.slot,
                        vk::DescriptorType::STORAGE_BUFFER,
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer.raw)
                            .offset(0)
                            .range(buffer.size),
                    ));
                }
            }
        }

        let mut writes = Vec::with_capacity(image_infos.len() + buffer_infos.len());
        for (slot, descriptor_type, info) in &image_infos {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(*slot)
                    .descriptor_type(*descriptor_type)
                    .image_info(std::slice::from_ref(info)),
            );
        }
        for (slot, descriptor_type, info) in &buffer_infos {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(*slot)
                    .descriptor_type(*descriptor_type)
                    .buffer_info(std::slice::from_ref(info)),
            );
        }
        unsafe {
            shared.raw.update_descriptor_sets(&writes, &[]);
        }

        let handle = self.bind_groups.allocate(GpuBindGroup {
            raw: descriptor_set,
            layout,
        });
        handle_to_id(handle)
    }

    fn destroy_bind_group(&mut self, id: BindGroupId) {
        let handle: Handle<GpuBindGroup> = id_to_handle(id);
        self.bind_groups.free(handle);
    }

    fn wait_semaphore(&self, semaphore: SemaphoreId, value: u64, timeout_ms: u32) -> bool {
        let shared = self.shared();
        let resolved = self.resolve_semaphore(semaphore);
        let semaphores = [resolved];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe {
            shared
                .raw
                .wait_semaphores(&wait_info, (timeout_ms as u64) * 1_000_000)
                .is_ok()
        }
    }

    fn render(&mut self, frame: &RenderFrame) -> Result<(), DeviceLost> {
        let acquired_view = match &self.swapchain {
            Some(swapchain_mutex) => {
                let mut swapchain = swapchain_mutex.lock();
                match swapchain.acquire_next_image(self.image_acquired_semaphore) {
                    Ok(_) => Some(swapchain.current_view()),
                    Err(e) => {
                        log::warn!("swapchain acquire_next_image failed: {e:?}, dropping frame");
                        None
                    }
                }
            }
            None => None,
        };
        if let Some(view) = acquired_view {
            self.sync_swapchain_render_targets(view);
        }

        let mut wrote_swapchain = false;
        for submit in frame.submissions() {
            let writes_swapchain =
                acquired_view.is_some() && self.submission_writes_swapchain(submit, frame);

            let queue = self.queue_raw(submit.queue);
            let command_buffer = self.begin_one_shot();
            for &stream_index in &submit.streams {
                let stream = frame.command_stream(stream_index);
                self.translate_stream(command_buffer, stream);
            }
            self.submit_and_wait(queue, command_buffer, submit, writes_swapchain);

            wrote_swapchain |= writes_swapchain;
        }

        if wrote_swapchain {
            if let Some(swapchain_mutex) = &self.swapchain {
                let swapchain = swapchain_mutex.lock();
                let shared = self.shared();
                let wait = [self.render_finished_semaphore];
                if let Err(e) = swapchain.present(shared.queue_graphics, &wait) {
                    log::warn!("swapchain present failed: {e:?}");
                }
            }
        }

        Ok(())
    }
}

impl VulkanDevice {
    fn begin_one_shot(&self) -> vk::CommandBuffer {
        let shared = self.shared();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe {
            shared
                .raw
                .allocate_command_buffers(&alloc_info)
                .expect("vkAllocateCommandBuffers failed")[0]
        };
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            shared
                .raw
                .begin_command_buffer(command_buffer, &begin_info)
                .expect("vkBeginCommandBuffer failed");
        }
        command_buffer
    }

    fn end_one_shot_and_wait(&self, command_buffer: vk::CommandBuffer) {
        let shared = self.shared();
        unsafe {
            shared
                .raw
                .end_command_buffer(command_buffer)
                .expect("vkEndCommandBuffer failed");
            let buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
            shared
                .raw
                .queue_submit(shared.queue_graphics, &[submit_info], vk::Fence::null())
                .expect("vkQueueSubmit failed");
            shared
                .raw
                .queue_wait_idle(shared.queue_graphics)
                .expect("vkQueueWaitIdle failed");
            shared
                .raw
                .free_command_buffers(self.command_pool, &buffers);
        }
    }

    /// Submits a recorded command buffer on `queue`, honoring `submit`'s full wait/signal
    /// semaphore graph (§4.3/§5's timeline-semaphore submission protocol) via a
    /// `TimelineSemaphoreSubmitInfo`, then waits on this device's own bumped timeline value
    /// before reclaiming the command buffer. `writes_swapchain` additionally gates the submit on
    /// the image-acquired semaphore and signals the present-wait semaphore.
    fn submit_and_wait(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
        submit: &SubmitDesc,
        writes_swapchain: bool,
    ) {
        let shared = self.shared();
        unsafe {
            shared
                .raw
                .end_command_buffer(command_buffer)
                .expect("vkEndCommandBuffer failed");
        }

        let mut wait_semaphores: Vec<vk::Semaphore> = submit
            .wait_semaphores
            .iter()
            .map(|&id| self.resolve_semaphore(id))
            .collect();
        let mut wait_values: Vec<u64> = submit.wait_values.clone();
        let mut wait_stages: Vec<vk::PipelineStageFlags> =
            vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_semaphores.len()];
        if writes_swapchain {
            wait_semaphores.push(self.image_acquired_semaphore);
            wait_values.push(0);
            wait_stages.push(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        }

        let mut signal_semaphores: Vec<vk::Semaphore> = submit
            .signal_semaphores
            .iter()
            .map(|&id| self.resolve_semaphore(id))
            .collect();
        let mut signal_values: Vec<u64> = submit.signal_values.clone();

        let done_value = self
            .timeline_value
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        signal_semaphores.push(self.timeline_semaphore);
        signal_values.push(done_value);
        if writes_swapchain {
            signal_semaphores.push(self.render_finished_semaphore);
            signal_values.push(0);
        }

        let buffers = [command_buffer];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .signal_semaphores(&signal_semaphores)
            .command_buffers(&buffers)
            .push_next(&mut timeline_info);

        unsafe {
            shared
                .raw
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .expect("vkQueueSubmit failed");
        }

        let wait_semaphores_cpu = [self.timeline_semaphore];
        let wait_values_cpu = [done_value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&wait_semaphores_cpu)
            .values(&wait_values_cpu);
        unsafe {
            shared
                .raw
                .wait_semaphores(&wait_info, u64::MAX)
                .expect("vkWaitSemaphores failed");
            shared.raw.free_command_buffers(self.command_pool, &buffers);
        }
    }

    /// Patches every swapchain-backed render target's current color view right after
    /// `acquire_next_image`, so `cmd_begin_render_pass` sees a live view this frame.
    fn sync_swapchain_render_targets(&mut self, view: vk::ImageView) {
        for (_, render_target) in self.render_targets.iter_mut() {
            if render_target.is_swapchain {
                if let Some(slot) = render_target.color_views.get_mut(0) {
                    *slot = view;
                }
            }
        }
    }

    fn submission_writes_swapchain(&self, submit: &SubmitDesc, frame: &RenderFrame) -> bool {
        for &stream_index in &submit.streams {
            let stream = frame.command_stream(stream_index);
            for decoded in stream.iter() {
                if decoded.tag == CommandType::BeginRenderPass {
                    let cmd = command::decode::<command::BeginRenderPassCmd>(&decoded);
                    let handle: Handle<GpuRenderTarget> = id_to_handle(cmd.render_target);
                    if self
                        .render_targets
                        .try_get(handle)
                        .is_some_and(|rt| rt.is_swapchain)
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Decodes one [`sfg_gfx::command::CommandStream`] and issues the equivalent native calls, in
    /// insertion order, per §4.3's target-agnostic translation rules.
    fn translate_stream(&mut self, command_buffer: vk::CommandBuffer, stream: &sfg_gfx::command::CommandStream) {
        let shared = self.shared().clone();
        for decoded in stream.iter() {
            match decoded.tag {
                CommandType::BeginRenderPass => {
                    self.cmd_begin_render_pass(command_buffer, &decoded);
                }
                CommandType::EndRenderPass => unsafe {
                    shared.raw.cmd_end_rendering(command_buffer);
                },
                CommandType::SetViewport => {
                    let cmd = command::decode::<command::SetViewportCmd>(&decoded);
                    let viewport = vk::Viewport {
                        x: cmd.x,
                        y: cmd.y,
                        width: cmd.width,
                        height: cmd.height,
                        min_depth: cmd.min_depth,
                        max_depth: cmd.max_depth,
                    };
                    unsafe {
                        shared
                            .raw
                            .cmd_set_viewport(command_buffer, 0, std::slice::from_ref(&viewport));
                    }
                }
                CommandType::SetScissor => {
                    let cmd = command::decode::<command::SetScissorCmd>(&decoded);
                    let scissor = vk::Rect2D {
                        offset: vk::Offset2D { x: cmd.x, y: cmd.y },
                        extent: vk::Extent2D {
                            width: cmd.width,
                            height: cmd.height,
                        },
                    };
                    unsafe {
                        shared
                            .raw
                            .cmd_set_scissor(command_buffer, 0, std::slice::from_ref(&scissor));
                    }
                }
                CommandType::BindPipeline => {
                    let cmd = command::decode::<command::BindPipelineCmd>(&decoded);
                    let handle: Handle<GpuPipeline> = id_to_handle(cmd.pipeline);
                    let pipeline = self.pipelines.get(handle);
                    self.bound_pipeline = Some(pipeline.layout);
                    unsafe {
                        shared.raw.cmd_bind_pipeline(
                            command_buffer,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.raw,
                        );
                    }
                }
                CommandType::DrawInstanced => {
                    let cmd = command::decode::<command::DrawInstancedCmd>(&decoded);
                    unsafe {
                        shared.raw.cmd_draw(
                            command_buffer,
                            cmd.vertex_count,
                            cmd.instance_count,
                            cmd.first_vertex,
                            cmd.first_instance,
                        );
                    }
                }
                CommandType::DrawIndexedInstanced => {
                    let cmd = command::decode::<command::DrawIndexedInstancedCmd>(&decoded);
                    unsafe {
                        shared.raw.cmd_draw_indexed(
                            command_buffer,
                            cmd.index_count,
                            cmd.instance_count,
                            cmd.first_index,
                            cmd.vertex_offset,
                            cmd.first_instance,
                        );
                    }
                }
                CommandType::DrawIndexedIndirect => {
                    let cmd = command::decode::<command::DrawIndexedIndirectCmd>(&decoded);
                    let handle: Handle<GpuBuffer> = id_to_handle(cmd.buffer);
                    let buffer = self.buffers.get(handle);
                    unsafe {
                        shared.raw.cmd_draw_indexed_indirect(
                            command_buffer,
                            buffer.raw,
                            cmd.byte_offset,
                            cmd.draw_count,
                            cmd.stride,
                        );
                    }
                }
                CommandType::CopyResource => {
                    let cmd = command::decode::<command::CopyResourceCmd>(&decoded);
                    let src: Handle<GpuBuffer> = id_to_handle(cmd.src);
                    let dst: Handle<GpuBuffer> = id_to_handle(cmd.dst);
                    let region = vk::BufferCopy::default().size(cmd.size);
                    unsafe {
                        shared.raw.cmd_copy_buffer(
                            command_buffer,
                            self.buffers.get(src).raw,
                            self.buffers.get(dst).raw,
                            std::slice::from_ref(&region),
                        );
                    }
                }
                CommandType::CopyBufferToTexture2D => {
                    let cmd = command::decode::<command::CopyBufferToTexture2DCmd>(&decoded);
                    let src: Handle<GpuBuffer> = id_to_handle(cmd.src_buffer);
                    let dst: Handle<GpuTexture> = id_to_handle(cmd.dst_texture);
                    let region = vk::BufferImageCopy2::default()
                        .buffer_offset(cmd.buffer_offset)
                        .image_subresource(
                            vk::ImageSubresourceLayers::default()
                                .aspect_mask(vk::ImageAspectFlags::COLOR)
                                .mip_level(cmd.mip_level)
                                .base_array_layer(cmd.array_layer)
                                .layer_count(1),
                        )
                        .image_extent(vk::Extent3D {
                            width: cmd.width,
                            height: cmd.height,
                            depth: 1,
                        });
                    let info = vk::CopyBufferToImageInfo2::default()
                        .src_buffer(self.buffers.get(src).raw)
                        .dst_image(self.textures.get(dst).raw)
                        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .regions(std::slice::from_ref(&region));
                    unsafe {
                        shared.raw.cmd_copy_buffer_to_image2(command_buffer, &info);
                    }
                }
                CommandType::CopyTexture2DToTexture2D => {
                    let cmd = command::decode::<command::CopyTexture2DToTexture2DCmd>(&decoded);
                    let src: Handle<GpuTexture> = id_to_handle(cmd.src_texture);
                    let dst: Handle<GpuTexture> = id_to_handle(cmd.dst_texture);
                    let region = vk::ImageCopy2::default()
                        .src_subresource(
                            vk::ImageSubresourceLayers::default()
                                .aspect_mask(vk::ImageAspectFlags::COLOR)
                                .mip_level(cmd.src_mip)
                                .layer_count(1),
                        )
                        .dst_subresource(
                            vk::ImageSubresourceLayers::default()
                                .aspect_mask(vk::ImageAspectFlags::COLOR)
                                .mip_level(cmd.dst_mip)
                                .layer_count(1),
                        )
                        .extent(vk::Extent3D {
                            width: cmd.width,
                            height: cmd.height,
                            depth: 1,
                        });
                    let info = vk::CopyImageInfo2::default()
                        .src_image(self.textures.get(src).raw)
                        .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                        .dst_image(self.textures.get(dst).raw)
                        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .regions(std::slice::from_ref(&region));
                    unsafe {
                        shared.raw.cmd_copy_image2(command_buffer, &info);
                    }
                }
                CommandType::BindVertexBuffers => {
                    let cmd = command::decode::<command::BindVertexBuffersCmd>(&decoded);
                    let count = cmd.count as usize;
                    let buffers: Vec<_> = cmd.buffers[..count]
                        .iter()
                        .map(|&id| self.buffers.get(id_to_handle(id)).raw)
                        .collect();
                    unsafe {
                        shared.raw.cmd_bind_vertex_buffers(
                            command_buffer,
                            cmd.first_binding,
                            &buffers,
                            &cmd.offsets[..count],
                        );
                    }
                }
                CommandType::BindIndexBuffer => {
                    let cmd = command::decode::<command::BindIndexBufferCmd>(&decoded);
                    let handle: Handle<GpuBuffer> = id_to_handle(cmd.buffer);
                    let index_type = if cmd.is_u16 != 0 {
                        vk::IndexType::UINT16
                    } else {
                        vk::IndexType::UINT32
                    };
                    unsafe {
                        shared.raw.cmd_bind_index_buffer(
                            command_buffer,
                            self.buffers.get(handle).raw,
                            cmd.offset,
                            index_type,
                        );
                    }
                }
                CommandType::BindGroup => {
                    let cmd = command::decode::<command::BindGroupCmd>(&decoded);
                    let handle: Handle<GpuBindGroup> = id_to_handle(cmd.group);
                    let descriptor_set = self.bind_groups.get(handle).raw;
                    if let Some(layout) = self.bound_pipeline {
                        unsafe {
                            shared.raw.cmd_bind_descriptor_sets(
                                command_buffer,
                                vk::PipelineBindPoint::GRAPHICS,
                                layout,
                                cmd.set_index,
                                std::slice::from_ref(&descriptor_set),
                                &[],
                            );
                        }
                    }
                }
                CommandType::BindConstants => {
                    let cmd = command::decode::<command::BindConstantsCmd>(&decoded);
                    if let Some(layout) = self.bound_pipeline {
                        unsafe {
                            shared.raw.cmd_push_constants(
                                command_buffer,
                                layout,
                                vk::ShaderStageFlags::ALL,
                                cmd.offset,
                                cmd.bytes(),
                            );
                        }
                    }
                }
                CommandType::Dispatch => {
                    let cmd = command::decode::<command::DispatchCmd>(&decoded);
                    unsafe {
                        shared.raw.cmd_dispatch(
                            command_buffer,
                            cmd.group_count_x,
                            cmd.group_count_y,
                            cmd.group_count_z,
                        );
                    }
                }
                CommandType::Barrier => {
                    self.cmd_barrier(command_buffer, &decoded);
                }
            }
        }
    }

    fn cmd_barrier(&mut self, command_buffer: vk::CommandBuffer, decoded: &DecodedCommand<'_>) {
        let cmd = command::decode::<command::BarrierCmd>(decoded);
        let shared = self.shared().clone();
        let mut image_barriers = Vec::new();
        for texture_barrier in &cmd.texture_barriers[..cmd.texture_barrier_count as usize] {
            let handle: Handle<GpuTexture> = id_to_handle(texture_barrier.texture);
            let new_state = crate::command::resource_state_from_u8(texture_barrier.dst_state);
            let new_layout = crate::command::resource_state_layout(new_state);
            let texture = self.textures.get_mut(handle);
            let old_layout = texture.current_layout;
            image_barriers.push(
                vk::ImageMemoryBarrier2::default()
                    .old_layout(old_layout)
                    .new_layout(new_layout)
                    .image(texture.raw)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .level_count(vk::REMAINING_MIP_LEVELS)
                            .layer_count(vk::REMAINING_ARRAY_LAYERS),
                    ),
            );
            texture.current_layout = new_layout;
        }

        let buffer_barriers: Vec<_> = cmd.resource_barriers[..cmd.resource_barrier_count as usize]
            .iter()
            .map(|resource_barrier| {
                let handle: Handle<GpuBuffer> = id_to_handle(resource_barrier.buffer);
                vk::BufferMemoryBarrier2::default()
                    .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
                    .dst_access_mask(vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE)
                    .buffer(self.buffers.get(handle).raw)
                    .size(vk::WHOLE_SIZE)
            })
            .collect();

        if !image_barriers.is_empty() || !buffer_barriers.is_empty() {
            unsafe {
                shared.raw.cmd_pipeline_barrier2(
                    command_buffer,
                    &vk::DependencyInfo::default()
                        .image_memory_barriers(&image_barriers)
                        .buffer_memory_barriers(&buffer_barriers),
                );
            }
        }
    }

    fn cmd_begin_render_pass(&mut self, command_buffer: vk::CommandBuffer, decoded: &DecodedCommand<'_>) {
        let cmd = command::decode::<command::BeginRenderPassCmd>(decoded);
        let shared = self.shared().clone();
        let handle: Handle<GpuRenderTarget> = id_to_handle(cmd.render_target);
        let render_target = self.render_targets.get(handle);

        let color_attachments: Vec<_> = cmd.color_attachments[..cmd.color_attachment_count as usize]
            .iter()
            .enumerate()
            .map(|(i, attachment)| {
                let view = render_target
                    .color_views
                    .get(attachment.view_index as usize)
                    .copied()
                    .unwrap_or_else(|| {
                        panic!("render target has no color view at index {i}");
                    });
                vk::RenderingAttachmentInfo::default()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(crate::command::load_op_vk(attachment.load_op))
                    .store_op(crate::command::store_op_vk(attachment.store_op))
                    .clear_value(vk::ClearValue {
                        color: vk::ClearColorValue {
                            float32: attachment.clear_color,
                        },
                    })
            })
            .collect();

        let depth_attachment = if cmd.has_depth_attachment != 0 {
            render_target.depth_view.map(|view| {
                vk::RenderingAttachmentInfo::default()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                    .load_op(crate::command::load_op_vk(cmd.depth_attachment.load_op))
                    .store_op(crate::command::store_op_vk(cmd.depth_attachment.store_op))
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: cmd.depth_attachment.clear_depth,
                            stencil: cmd.depth_attachment.clear_stencil,
                        },
                    })
            })
        } else {
            None
        };

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: render_target.width,
                height: render_target.height,
            },
        };

        let empty_depth = vk::RenderingAttachmentInfo::default();
        let rendering_info = vk::RenderingInfo::default()
            .color_attachments(&color_attachments)
            .depth_attachment(depth_attachment.as_ref().unwrap_or(&empty_depth))
            .render_area(render_area)
            .layer_count(1);

        unsafe {
            shared.raw.cmd_begin_rendering(command_buffer, &rendering_info);
        }
    }
}
