use crate::ids::TextureId;
use crate::resource::texture::TextureFormat;

/// A render target is either the swapchain (one set of images recycled by the presentation
/// engine) or a fixed set of FRAMES_IN_FLIGHT owned textures; destruction cascades to every
/// owned texture either way.
#[derive(Clone, Debug)]
pub enum RenderTargetAttachment {
    Swapchain,
    Owned {
        textures: Vec<TextureId>,
        format: TextureFormat,
    },
}

#[derive(Clone, Debug)]
pub struct RenderTargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub color: Vec<RenderTargetAttachment>,
    pub depth: Option<RenderTargetAttachment>,
    pub sample_count: u32,
}
