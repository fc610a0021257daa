//! Vulkan realization of the [`sfg_gfx::GpuDevice`] trait (§4.3 C3). Grounded on the teacher's
//! own Vulkan wrapper (`ash` + `gpu_allocator` + `raw_window_handle`), generalized from a single
//! hard-coded render target into the target-agnostic command-stream/submit-desc protocol
//! `sfg_gfx` defines.

mod command;
mod device;
mod instance;
mod resource;
mod shader;

pub use ash::{self, vk};
pub use device::VulkanDevice;
pub use gpu_allocator;
pub use raw_window_handle;
