use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Bgra8Srgb,
    Rgba16Float,
    Rgba32Float,
    D32Float,
    D24UnormS8Uint,
    D32FloatS8Uint,
}

impl TextureFormat {
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D32Float | TextureFormat::D24UnormS8Uint | TextureFormat::D32FloatS8Uint
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::D24UnormS8Uint | TextureFormat::D32FloatS8Uint
        )
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const DEPTH_ATTACHMENT = 1 << 1;
        const STENCIL_ATTACHMENT = 1 << 2;
        const SAMPLED = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

#[derive(Clone, Debug)]
pub struct TextureViewDesc {
    pub is_cubemap: bool,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

#[derive(Clone, Debug)]
pub struct TextureDescriptor {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_level_count: u32,
    pub array_layer_count: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub views: Vec<TextureViewDesc>,
}

impl TextureDescriptor {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        TextureDescriptor {
            dimension: TextureDimension::D2,
            width,
            height,
            depth: 1,
            mip_level_count: 1,
            array_layer_count: 1,
            sample_count: 1,
            format,
            usage,
            views: vec![TextureViewDesc {
                is_cubemap: false,
                base_mip: 0,
                mip_count: 1,
                base_layer: 0,
                layer_count: 1,
            }],
        }
    }
}

/// One mip level of a GPU texture upload, per the §6 upload format.
pub struct TextureUploadLevel<'a> {
    pub data: &'a [u8],
    pub width: u16,
    pub height: u16,
    pub bpp: u8,
    pub channels: u8,
}
