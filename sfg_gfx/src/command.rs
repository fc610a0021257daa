use bytemuck::{Pod, Zeroable};

use crate::ids::{BindGroupId, BufferId, PipelineId, RenderTargetId, TextureId};

pub const MAX_COLOR_ATTACHMENTS: usize = 8;
pub const MAX_VERTEX_BUFFER_BINDINGS: usize = 8;
pub const MAX_BARRIER_ENTRIES: usize = 16;
pub const MAX_INLINE_CONSTANTS_BYTES: usize = 128;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    BeginRenderPass = 0,
    EndRenderPass = 1,
    SetViewport = 2,
    SetScissor = 3,
    BindPipeline = 4,
    DrawInstanced = 5,
    DrawIndexedInstanced = 6,
    DrawIndexedIndirect = 7,
    CopyResource = 8,
    CopyBufferToTexture2D = 9,
    CopyTexture2DToTexture2D = 10,
    BindVertexBuffers = 11,
    BindIndexBuffer = 12,
    BindGroup = 13,
    BindConstants = 14,
    Dispatch = 15,
    Barrier = 16,
}

impl CommandType {
    fn from_u8(value: u8) -> CommandType {
        match value {
            0 => CommandType::BeginRenderPass,
            1 => CommandType::EndRenderPass,
            2 => CommandType::SetViewport,
            3 => CommandType::SetScissor,
            4 => CommandType::BindPipeline,
            5 => CommandType::DrawInstanced,
            6 => CommandType::DrawIndexedInstanced,
            7 => CommandType::DrawIndexedIndirect,
            8 => CommandType::CopyResource,
            9 => CommandType::CopyBufferToTexture2D,
            10 => CommandType::CopyTexture2DToTexture2D,
            11 => CommandType::BindVertexBuffers,
            12 => CommandType::BindIndexBuffer,
            13 => CommandType::BindGroup,
            14 => CommandType::BindConstants,
            15 => CommandType::Dispatch,
            16 => CommandType::Barrier,
            other => panic!("unknown command type tag {other}"),
        }
    }
}

/// Marker trait tying a payload struct to the tag it is decoded under. Every payload is `Pod` so
/// `CommandStream::add` can write it as raw bytes without padding.
pub trait CommandPayload: Pod {
    const TYPE: CommandType;
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOp {
    Load = 0,
    Clear = 1,
    DontCare = 2,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Store = 0,
    DontCare = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveMode {
    None = 0,
    Min = 1,
    Average = 2,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorAttachmentDesc {
    pub view_index: u32,
    pub load_op: u8,
    pub store_op: u8,
    pub _pad: [u8; 2],
    pub clear_color: [f32; 4],
    pub resolve_view_index: u32,
    pub resolve_mode: u8,
    pub _pad2: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DepthAttachmentDesc {
    pub view_index: u32,
    pub load_op: u8,
    pub store_op: u8,
    pub _pad: [u8; 2],
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BeginRenderPassCmd {
    pub render_target: RenderTargetId,
    pub color_attachment_count: u32,
    pub color_attachments: [ColorAttachmentDesc; MAX_COLOR_ATTACHMENTS],
    pub has_depth_attachment: u32,
    pub depth_attachment: DepthAttachmentDesc,
}

impl CommandPayload for BeginRenderPassCmd {
    const TYPE: CommandType = CommandType::BeginRenderPass;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EndRenderPassCmd {
    pub _pad: u32,
}

impl CommandPayload for EndRenderPassCmd {
    const TYPE: CommandType = CommandType::EndRenderPass;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SetViewportCmd {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl CommandPayload for SetViewportCmd {
    const TYPE: CommandType = CommandType::SetViewport;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SetScissorCmd {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CommandPayload for SetScissorCmd {
    const TYPE: CommandType = CommandType::SetScissor;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BindPipelineCmd {
    pub pipeline: PipelineId,
}

impl CommandPayload for BindPipelineCmd {
    const TYPE: CommandType = CommandType::BindPipeline;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawInstancedCmd {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl CommandPayload for DrawInstancedCmd {
    const TYPE: CommandType = CommandType::DrawInstanced;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawIndexedInstancedCmd {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl CommandPayload for DrawIndexedInstancedCmd {
    const TYPE: CommandType = CommandType::DrawIndexedInstanced;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCmd {
    pub buffer: BufferId,
    pub byte_offset: u64,
    pub draw_count: u32,
    pub stride: u32,
}

impl CommandPayload for DrawIndexedIndirectCmd {
    const TYPE: CommandType = CommandType::DrawIndexedIndirect;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CopyResourceCmd {
    pub src: BufferId,
    pub dst: BufferId,
    pub size: u64,
}

impl CommandPayload for CopyResourceCmd {
    const TYPE: CommandType = CommandType::CopyResource;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CopyBufferToTexture2DCmd {
    pub src_buffer: BufferId,
    pub dst_texture: TextureId,
    pub buffer_offset: u64,
    pub mip_level: u32,
    pub array_layer: u32,
    pub width: u32,
    pub height: u32,
}

impl CommandPayload for CopyBufferToTexture2DCmd {
    const TYPE: CommandType = CommandType::CopyBufferToTexture2D;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CopyTexture2DToTexture2DCmd {
    pub src_texture: TextureId,
    pub dst_texture: TextureId,
    pub src_mip: u32,
    pub dst_mip: u32,
    pub width: u32,
    pub height: u32,
}

impl CommandPayload for CopyTexture2DToTexture2DCmd {
    const TYPE: CommandType = CommandType::CopyTexture2DToTexture2D;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BindVertexBuffersCmd {
    pub first_binding: u32,
    pub count: u32,
    pub buffers: [BufferId; MAX_VERTEX_BUFFER_BINDINGS],
    pub offsets: [u64; MAX_VERTEX_BUFFER_BINDINGS],
}

impl CommandPayload for BindVertexBuffersCmd {
    const TYPE: CommandType = CommandType::BindVertexBuffers;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BindIndexBufferCmd {
    pub buffer: BufferId,
    pub offset: u64,
    pub is_u16: u32,
}

impl CommandPayload for BindIndexBufferCmd {
    const TYPE: CommandType = CommandType::BindIndexBuffer;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BindGroupCmd {
    pub group: BindGroupId,
    pub set_index: u32,
}

impl CommandPayload for BindGroupCmd {
    const TYPE: CommandType = CommandType::BindGroup;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BindConstantsCmd {
    pub offset: u32,
    pub size: u32,
    pub data: [u8; MAX_INLINE_CONSTANTS_BYTES],
}

impl CommandPayload for BindConstantsCmd {
    const TYPE: CommandType = CommandType::BindConstants;
}

impl BindConstantsCmd {
    pub fn new(offset: u32, bytes: &[u8]) -> Self {
        assert!(
            bytes.len() <= MAX_INLINE_CONSTANTS_BYTES,
            "push constants exceed inline capacity"
        );
        let mut data = [0u8; MAX_INLINE_CONSTANTS_BYTES];
        data[..bytes.len()].copy_from_slice(bytes);
        BindConstantsCmd {
            offset,
            size: bytes.len() as u32,
            data,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DispatchCmd {
    pub group_count_x: u32,
    pub group_count_y: u32,
    pub group_count_z: u32,
}

impl CommandPayload for DispatchCmd {
    const TYPE: CommandType = CommandType::Dispatch;
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceState {
    ColorAttachment = 0,
    DepthAttachment = 1,
    ShaderRead = 2,
    Present = 3,
    TransferSrc = 4,
    TransferDst = 5,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextureBarrier {
    pub texture: TextureId,
    pub dst_state: u8,
    pub _pad: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ResourceBarrier {
    pub buffer: BufferId,
    pub dst_state: u8,
    pub _pad: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BarrierCmd {
    pub texture_barrier_count: u32,
    pub texture_barriers: [TextureBarrier; MAX_BARRIER_ENTRIES],
    pub resource_barrier_count: u32,
    pub resource_barriers: [ResourceBarrier; MAX_BARRIER_ENTRIES],
}

impl CommandPayload for BarrierCmd {
    const TYPE: CommandType = CommandType::Barrier;
}

/// A byte buffer recording one thread's worth of draw commands for a single [`crate::render_frame::RenderFrame`].
///
/// Reserves `capacity_bytes` once at construction and is cleared (not deallocated) by `reset`, so
/// it behaves like a slice of a per-frame bump arena without the self-referential borrow a literal
/// slice-into-the-arena would require. Recorded commands are laid out back to back as
/// `[type u8][size u32][payload bytes]`, with no reordering at playback.
pub struct CommandStream {
    bytes: Vec<u8>,
    capacity_bytes: usize,
}

impl CommandStream {
    pub fn new(capacity_bytes: usize) -> Self {
        CommandStream {
            bytes: Vec::with_capacity(capacity_bytes),
            capacity_bytes,
        }
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes `[T::TYPE][size_of::<T>()][cmd]`. Asserts the stream's byte capacity is not
    /// exceeded; this is the §4.2 "panics (assertion) if cap exceeded" behavior.
    pub fn add<T: CommandPayload>(&mut self, cmd: T) {
        let size = std::mem::size_of::<T>();
        let needed = 1 + 4 + size;
        assert!(
            self.bytes.len() + needed <= self.capacity_bytes,
            "command stream exhausted: {} bytes requested, {} used of {} capacity",
            needed,
            self.bytes.len(),
            self.capacity_bytes
        );
        self.bytes.push(T::TYPE as u8);
        self.bytes.extend_from_slice(&(size as u32).to_le_bytes());
        self.bytes.extend_from_slice(bytemuck::bytes_of(&cmd));
    }

    pub fn iter(&self) -> CommandStreamIter<'_> {
        CommandStreamIter {
            bytes: &self.bytes,
            offset: 0,
        }
    }
}

/// One decoded command: the tag plus the raw payload bytes, which the backend (or a test) casts
/// back to the concrete `T` named by `tag`.
pub struct DecodedCommand<'a> {
    pub tag: CommandType,
    pub payload: &'a [u8],
}

pub struct CommandStreamIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for CommandStreamIter<'a> {
    type Item = DecodedCommand<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let tag = CommandType::from_u8(self.bytes[self.offset]);
        let size_bytes = &self.bytes[self.offset + 1..self.offset + 5];
        let size = u32::from_le_bytes(size_bytes.try_into().unwrap()) as usize;
        let payload_start = self.offset + 5;
        let payload = &self.bytes[payload_start..payload_start + size];
        self.offset = payload_start + size;
        Some(DecodedCommand { tag, payload })
    }
}

pub fn decode<T: CommandPayload>(cmd: &DecodedCommand<'_>) -> T {
    assert_eq!(cmd.tag, T::TYPE, "command tag/payload type mismatch");
    assert_eq!(
        cmd.payload.len(),
        std::mem::size_of::<T>(),
        "command payload size does not match sizeof(T)"
    );
    *bytemuck::from_bytes(cmd.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_recorded_scene() {
        let mut stream = CommandStream::new(4096);
        stream.add(BeginRenderPassCmd {
            render_target: RenderTargetId::NULL,
            color_attachment_count: 1,
            color_attachments: [ColorAttachmentDesc {
                view_index: 0,
                load_op: LoadOp::Clear as u8,
                store_op: StoreOp::Store as u8,
                _pad: [0; 2],
                clear_color: [0.2, 0.3, 0.4, 1.0],
                resolve_view_index: 0,
                resolve_mode: ResolveMode::None as u8,
                _pad2: [0; 3],
            }; MAX_COLOR_ATTACHMENTS],
            has_depth_attachment: 0,
            depth_attachment: DepthAttachmentDesc::zeroed(),
        });
        stream.add(SetViewportCmd {
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        stream.add(BindPipelineCmd {
            pipeline: PipelineId {
                index: 7,
                generation: 1,
            },
        });
        stream.add(DrawIndexedInstancedCmd {
            index_count: 36,
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        });
        stream.add(EndRenderPassCmd { _pad: 0 });

        let decoded: Vec<_> = stream.iter().collect();
        assert_eq!(decoded.len(), 5);

        let begin = decode::<BeginRenderPassCmd>(&decoded[0]);
        assert_eq!(begin.color_attachments[0].clear_color, [0.2, 0.3, 0.4, 1.0]);

        let draw = decode::<DrawIndexedInstancedCmd>(&decoded[3]);
        assert_eq!(draw.index_count, 36);
        assert_eq!(draw.instance_count, 1);

        for decoded_cmd in &decoded {
            assert_eq!(
                decoded_cmd.payload.len(),
                match decoded_cmd.tag {
                    CommandType::BeginRenderPass => std::mem::size_of::<BeginRenderPassCmd>(),
                    CommandType::SetViewport => std::mem::size_of::<SetViewportCmd>(),
                    CommandType::BindPipeline => std::mem::size_of::<BindPipelineCmd>(),
                    CommandType::DrawIndexedInstanced => {
                        std::mem::size_of::<DrawIndexedInstancedCmd>()
                    }
                    CommandType::EndRenderPass => std::mem::size_of::<EndRenderPassCmd>(),
                    _ => unreachable!(),
                }
            );
        }
    }

    #[test]
    #[should_panic]
    fn exceeding_capacity_panics() {
        let mut stream = CommandStream::new(8);
        stream.add(EndRenderPassCmd { _pad: 0 });
        stream.add(EndRenderPassCmd { _pad: 0 });
    }
}
