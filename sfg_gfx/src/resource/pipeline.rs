use crate::ids::BindGroupLayoutId;
use crate::resource::texture::TextureFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendState {
    pub enabled: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
}

impl BlendState {
    pub fn disabled() -> Self {
        BlendState {
            enabled: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
        }
    }

    pub fn alpha_blend() -> Self {
        BlendState {
            enabled: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            alpha_op: BlendOp::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthBiasState {
    pub constant_factor: f32,
    pub clamp: f32,
    pub slope_factor: f32,
}

impl DepthBiasState {
    pub const NONE: DepthBiasState = DepthBiasState {
        constant_factor: 0.0,
        clamp: 0.0,
        slope_factor: 0.0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare: CompareOp,
    pub depth_bias: DepthBiasState,
}

impl DepthStencilState {
    pub fn disabled() -> Self {
        DepthStencilState {
            depth_test_enable: false,
            depth_write_enable: false,
            depth_compare: CompareOp::Always,
            depth_bias: DepthBiasState::NONE,
        }
    }

    pub fn default_test_write() -> Self {
        DepthStencilState {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare: CompareOp::LessOrEqual,
            depth_bias: DepthBiasState::NONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorAttachmentState {
    pub format: TextureFormat,
    pub blend: BlendState,
}

/// One compiled shader module per stage; the backend owns the native module handle, this struct
/// only carries the bytes the host loaded off disk.
#[derive(Clone, Debug)]
pub struct ShaderStageDescriptor {
    pub entry_point: String,
    pub spirv_or_msl: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: TextureFormat,
    pub offset: u32,
}

#[derive(Clone, Debug)]
pub struct VertexBinding {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Clone, Debug)]
pub struct PipelineDescriptor {
    pub vertex: ShaderStageDescriptor,
    pub fragment: Option<ShaderStageDescriptor>,
    pub vertex_bindings: Vec<VertexBinding>,
    pub color_attachments: Vec<ColorAttachmentState>,
    pub depth_attachment: Option<TextureFormat>,
    pub topology: Topology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    pub depth_stencil: DepthStencilState,
    pub sample_count: u32,
    pub bind_group_layout: BindGroupLayoutId,
}
