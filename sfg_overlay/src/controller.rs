use egui::epaint::Primitive;
use egui::{ClippedPrimitive, Context, FullOutput, RawInput, TexturesDelta};

use sfg_gfx::command::{
    BeginRenderPassCmd, BindGroupCmd, BindIndexBufferCmd, BindPipelineCmd, BindVertexBuffersCmd,
    ColorAttachmentDesc, DepthAttachmentDesc, DrawIndexedInstancedCmd, EndRenderPassCmd, LoadOp,
    ResolveMode, SetScissorCmd, StoreOp, MAX_COLOR_ATTACHMENTS,
};
use sfg_gfx::ids::{BindGroupId, BufferId, PipelineId, RenderTargetId};
use sfg_gfx::render_frame::RenderFrame;

/// One tessellated draw call: a scissor rect plus the span of `indices` it covers and the bind
/// group carrying its source texture.
#[derive(Clone, Copy, Debug)]
pub struct DrawCall {
    pub scissor: SetScissorCmd,
    pub index_offset: u32,
    pub index_count: u32,
    pub texture: BindGroupId,
}

/// One tessellated overlay frame: raw vertex/index bytes ready to be uploaded into the host's
/// vertex/index buffers, the draw calls that slice them, and any texture-atlas deltas the host
/// must apply before the frame's draw calls are submitted.
pub struct OverlayFrame {
    pub vertices: Vec<u8>,
    pub indices: Vec<u8>,
    pub draw_calls: Vec<DrawCall>,
    pub textures_delta: TexturesDelta,
}

/// Wraps an `egui::Context` and turns its immediate-mode output into engine-native draw data
/// (§4.7). Does not own a GPU buffer or texture itself — those live on the host's resource
/// manager; this type only tessellates and records commands against ids the host supplies.
pub struct OverlayController {
    ctx: Context,
    pixels_per_point: f32,
}

impl OverlayController {
    pub fn new() -> Self {
        OverlayController {
            ctx: Context::default(),
            pixels_per_point: 1.0,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Runs one immediate-mode pass and tessellates its output into host-visible byte buffers.
    /// `build_ui` is the caller's widget code (console text, FPS readout, and so on).
    pub fn run(&mut self, input: RawInput, build_ui: impl FnOnce(&Context)) -> OverlayFrame {
        self.pixels_per_point = input.viewport().native_pixels_per_point.unwrap_or(1.0);
        let FullOutput {
            shapes,
            pixels_per_point,
            textures_delta,
            ..
        } = self.ctx.run(input, build_ui);
        let primitives = self.ctx.tessellate(shapes, pixels_per_point);
        self.tessellate_into_bytes(primitives, textures_delta)
    }

    fn tessellate_into_bytes(
        &self,
        primitives: Vec<ClippedPrimitive>,
        textures_delta: TexturesDelta,
    ) -> OverlayFrame {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut draw_calls = Vec::with_capacity(primitives.len());

        for clipped in primitives {
            let Primitive::Mesh(mesh) = clipped.primitive else {
                // Callback primitives would require a host-supplied render hook; the overlay has
                // none to register, so they are dropped rather than silently mis-rendered.
                continue;
            };
            if mesh.vertices.is_empty() || mesh.indices.is_empty() {
                continue;
            }

            let vertex_base = (vertices.len() / std::mem::size_of::<egui::epaint::Vertex>()) as u32;
            vertices.extend_from_slice(bytemuck::cast_slice(&mesh.vertices));

            let index_offset = (indices.len() / std::mem::size_of::<u32>()) as u32;
            let rebased: Vec<u32> = mesh.indices.iter().map(|&i| i + vertex_base).collect();
            indices.extend_from_slice(bytemuck::cast_slice(&rebased));

            let clip = clipped.clip_rect;
            let scissor = SetScissorCmd {
                x: (clip.min.x * self.pixels_per_point) as i32,
                y: (clip.min.y * self.pixels_per_point) as i32,
                width: ((clip.max.x - clip.min.x) * self.pixels_per_point).max(0.0) as u32,
                height: ((clip.max.y - clip.min.y) * self.pixels_per_point).max(0.0) as u32,
            };

            draw_calls.push(DrawCall {
                scissor,
                index_offset,
                index_count: mesh.indices.len() as u32,
                texture: BindGroupId::NULL,
            });
        }

        OverlayFrame {
            vertices,
            indices,
            draw_calls,
            textures_delta,
        }
    }

    /// Records `frame`'s draw calls onto a fresh command stream: one render pass wrapping a
    /// vertex/index bind followed by a scissor+bind-group+draw triple per `DrawCall` (§4.7).
    /// Returns the stream index so the caller can fold it into a `SubmitDesc`.
    pub fn record(
        &self,
        render_frame: &mut RenderFrame,
        frame: &OverlayFrame,
        render_target: RenderTargetId,
        pipeline: PipelineId,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
    ) -> usize {
        let stream_index = render_frame.get_command_stream();
        let stream = render_frame.command_stream_mut(stream_index);

        if frame.draw_calls.is_empty() {
            return stream_index;
        }

        stream.add(BeginRenderPassCmd {
            render_target,
            color_attachment_count: 1,
            color_attachments: [ColorAttachmentDesc {
                view_index: 0,
                load_op: LoadOp::Load as u8,
                store_op: StoreOp::Store as u8,
                _pad: [0; 2],
                clear_color: [0.0; 4],
                resolve_view_index: 0,
                resolve_mode: ResolveMode::None as u8,
                _pad2: [0; 3],
            }; MAX_COLOR_ATTACHMENTS],
            has_depth_attachment: 0,
            depth_attachment: DepthAttachmentDesc {
                view_index: 0,
                load_op: 0,
                store_op: 0,
                _pad: [0; 2],
                clear_depth: 0.0,
                clear_stencil: 0,
            },
        });
        stream.add(BindPipelineCmd { pipeline });
        stream.add(BindVertexBuffersCmd {
            first_binding: 0,
            count: 1,
            buffers: [vertex_buffer; sfg_gfx::command::MAX_VERTEX_BUFFER_BINDINGS],
            offsets: [0; sfg_gfx::command::MAX_VERTEX_BUFFER_BINDINGS],
        });
        stream.add(BindIndexBufferCmd {
            buffer: index_buffer,
            offset: 0,
            is_u16: 0,
        });

        for draw_call in &frame.draw_calls {
            stream.add(draw_call.scissor);
            stream.add(BindGroupCmd {
                group: draw_call.texture,
                set_index: 0,
            });
            stream.add(DrawIndexedInstancedCmd {
                index_count: draw_call.index_count,
                instance_count: 1,
                first_index: draw_call.index_offset,
                vertex_offset: 0,
                first_instance: 0,
            });
        }

        stream.add(EndRenderPassCmd { _pad: 0 });
        stream_index
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfg_gfx::render_frame::RenderFrameDefinition;

    #[test]
    fn run_with_empty_ui_produces_no_draw_calls() {
        let mut controller = OverlayController::new();
        let frame = controller.run(RawInput::default(), |_ctx| {});
        assert!(frame.draw_calls.is_empty());
    }

    #[test]
    fn recording_empty_frame_leaves_stream_empty() {
        let mut render_frame = RenderFrame::new(RenderFrameDefinition::default());
        let controller = OverlayController::new();
        let empty = OverlayFrame {
            vertices: Vec::new(),
            indices: Vec::new(),
            draw_calls: Vec::new(),
            textures_delta: TexturesDelta::default(),
        };
        let index = controller.record(
            &mut render_frame,
            &empty,
            RenderTargetId::NULL,
            PipelineId::NULL,
            BufferId::NULL,
            BufferId::NULL,
        );
        assert!(render_frame.command_stream(index).is_empty());
    }

    #[test]
    fn run_with_widget_produces_vertex_and_index_bytes() {
        let mut controller = OverlayController::new();
        let frame = controller.run(RawInput::default(), |ctx| {
            egui::Window::new("overlay").show(ctx, |ui| {
                ui.label("hello");
            });
        });
        assert!(!frame.vertices.is_empty());
        assert!(!frame.indices.is_empty());
        assert!(!frame.draw_calls.is_empty());
    }
}
