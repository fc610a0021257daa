use sfg_memory::BumpAllocator;

use crate::command::CommandStream;
use crate::ids::{QueueId, SemaphoreId};

/// Fixes the per-frame command-stream and submission caps; passed once to `RenderFrame::new`.
#[derive(Clone, Copy, Debug)]
pub struct RenderFrameDefinition {
    pub max_command_streams: usize,
    pub command_stream_capacity_bytes: usize,
    pub max_submissions: usize,
    pub aux_bump_bytes: usize,
}

impl Default for RenderFrameDefinition {
    fn default() -> Self {
        RenderFrameDefinition {
            max_command_streams: 16,
            command_stream_capacity_bytes: 64 * 1024,
            max_submissions: 8,
            aux_bump_bytes: 256 * 1024,
        }
    }
}

/// Instructions to the backend: execute `streams` (indices into the owning [`RenderFrame`]'s
/// command-stream array) on `queue`, gated by wait semaphores, producing signal semaphores. Every
/// array here is sized by the caller at record time — the bump arena backing is §4.3's aux data,
/// reachable through [`RenderFrame::allocator`].
#[derive(Clone, Debug)]
pub struct SubmitDesc {
    pub queue: QueueId,
    pub streams: Vec<usize>,
    pub wait_semaphores: Vec<SemaphoreId>,
    pub wait_values: Vec<u64>,
    pub signal_semaphores: Vec<SemaphoreId>,
    pub signal_values: Vec<u64>,
}

impl SubmitDesc {
    pub fn new(queue: QueueId) -> Self {
        SubmitDesc {
            queue,
            streams: Vec::new(),
            wait_semaphores: Vec::new(),
            wait_values: Vec::new(),
            signal_semaphores: Vec::new(),
            signal_values: Vec::new(),
        }
    }

    pub fn wait(mut self, semaphore: SemaphoreId, value: u64) -> Self {
        self.wait_semaphores.push(semaphore);
        self.wait_values.push(value);
        self
    }

    pub fn signal(mut self, semaphore: SemaphoreId, value: u64) -> Self {
        self.signal_semaphores.push(semaphore);
        self.signal_values.push(value);
        self
    }

    pub fn stream(mut self, index: usize) -> Self {
        self.streams.push(index);
        self
    }
}

/// Per-in-flight-frame container: a bump allocator for variable-length aux data plus the
/// fixed-capacity command-stream and submission arrays recording drivers fill and the render
/// thread consumes. `reset` is called by the render thread after it finishes walking
/// `submissions`, never by the thread that is still recording into it — see §5 ordering.
pub struct RenderFrame {
    definition: RenderFrameDefinition,
    aux: BumpAllocator,
    command_streams: Vec<CommandStream>,
    streams_used: usize,
    submissions: Vec<SubmitDesc>,
}

impl RenderFrame {
    pub fn new(definition: RenderFrameDefinition) -> Self {
        let command_streams = (0..definition.max_command_streams)
            .map(|_| CommandStream::new(definition.command_stream_capacity_bytes))
            .collect();
        RenderFrame {
            aux: BumpAllocator::new(definition.aux_bump_bytes),
            command_streams,
            streams_used: 0,
            submissions: Vec::with_capacity(definition.max_submissions),
            definition,
        }
    }

    /// Returns the index of a freshly reserved, empty command stream. Panics if every
    /// pre-allocated slot for this frame is already in use.
    pub fn get_command_stream(&mut self) -> usize {
        assert!(
            self.streams_used < self.definition.max_command_streams,
            "render frame exhausted its {} pre-allocated command streams",
            self.definition.max_command_streams
        );
        let index = self.streams_used;
        self.streams_used += 1;
        index
    }

    pub fn command_stream_mut(&mut self, index: usize) -> &mut CommandStream {
        &mut self.command_streams[index]
    }

    pub fn command_stream(&self, index: usize) -> &CommandStream {
        &self.command_streams[index]
    }

    /// Appends a submission. Panics one past `max_submissions`, per §8's boundary behavior.
    pub fn submit(&mut self, desc: SubmitDesc) {
        assert!(
            self.submissions.len() < self.definition.max_submissions,
            "render frame exceeded its {} max submissions",
            self.definition.max_submissions
        );
        self.submissions.push(desc);
    }

    pub fn submissions(&self) -> &[SubmitDesc] {
        &self.submissions
    }

    pub fn allocator(&mut self) -> &mut BumpAllocator {
        &mut self.aux
    }

    /// Rewinds the aux arena and clears every command stream and the submissions list. Called by
    /// the render thread once it has finished walking `submissions` for this frame.
    pub fn reset(&mut self) {
        self.aux.reset();
        for stream in self.command_streams[..self.streams_used].iter_mut() {
            stream.reset();
        }
        self.streams_used = 0;
        self.submissions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EndRenderPassCmd;
    use crate::ids::QueueId;

    #[test]
    fn submit_at_cap_succeeds_one_more_asserts() {
        let mut frame = RenderFrame::new(RenderFrameDefinition {
            max_submissions: 2,
            ..Default::default()
        });
        frame.submit(SubmitDesc::new(QueueId::NULL));
        frame.submit(SubmitDesc::new(QueueId::NULL));
        assert_eq!(frame.submissions().len(), 2);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            frame.submit(SubmitDesc::new(QueueId::NULL));
        }));
        assert!(result.is_err());
    }

    #[test]
    fn reset_clears_streams_and_submissions() {
        let mut frame = RenderFrame::new(RenderFrameDefinition::default());
        let stream_index = frame.get_command_stream();
        frame
            .command_stream_mut(stream_index)
            .add(EndRenderPassCmd { _pad: 0 });
        frame.submit(SubmitDesc::new(QueueId::NULL).stream(stream_index));

        frame.reset();

        assert!(frame.submissions().is_empty());
        let reused_index = frame.get_command_stream();
        assert_eq!(reused_index, 0);
        assert!(frame.command_stream(reused_index).is_empty());
    }
}
