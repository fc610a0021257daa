pub mod bind_group;
pub mod buffer;
pub mod pipeline;
pub mod render_target;
pub mod sampler;
pub mod texture;

pub use bind_group::{
    BindGroupEntry, BindGroupLayoutDescriptor, BindGroupResource, BindGroupResourceKind,
};
pub use buffer::{BufferDescriptor, BufferStorage, BufferType, BufferUsage};
pub use pipeline::{
    BlendState, ColorAttachmentState, CullMode, DepthBiasState, DepthStencilState, FrontFace,
    PipelineDescriptor, PolygonMode, Topology,
};
pub use render_target::{RenderTargetAttachment, RenderTargetDescriptor};
pub use sampler::{AddressMode, FilterMode, MipmapMode, SamplerDescriptor};
pub use texture::{
    TextureDescriptor, TextureDimension, TextureFormat, TextureUploadLevel, TextureUsage,
    TextureViewDesc,
};
