use bytemuck::{Pod, Zeroable};

/// Defines a plain `{index, generation}` id suitable for embedding in a `#[repr(C)]` command
/// payload (where `sfg_memory::Handle<T>`'s `PhantomData` marker would otherwise force every
/// payload struct to be generic). The resource manager (`sfg_resources`) is the thing that
/// actually owns generational pools; these ids are how command payloads *reference* GPU-backend
/// objects without depending on it.
macro_rules! define_gpu_id {
    ($name:ident) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
        pub struct $name {
            pub index: u32,
            pub generation: u32,
        }

        impl $name {
            pub const NULL: $name = $name {
                index: u32::MAX,
                generation: 0,
            };

            pub fn is_alive(&self) -> bool {
                self.generation != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }
    };
}

define_gpu_id!(TextureId);
define_gpu_id!(SamplerId);
define_gpu_id!(BufferId);
define_gpu_id!(PipelineId);
define_gpu_id!(RenderTargetId);
define_gpu_id!(BindGroupId);
define_gpu_id!(BindGroupLayoutId);
define_gpu_id!(QueueId);
define_gpu_id!(SemaphoreId);
