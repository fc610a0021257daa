pub mod command;
pub mod device;
pub mod ids;
pub mod render_frame;
pub mod resource;

pub use command::{CommandPayload, CommandStream, CommandType, DecodedCommand};
pub use device::{DeviceCapabilities, DeviceLost, GpuDevice, QueueKind};
pub use ids::*;
pub use render_frame::{RenderFrame, RenderFrameDefinition, SubmitDesc};
