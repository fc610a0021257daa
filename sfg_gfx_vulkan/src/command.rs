use ash::vk;

use sfg_gfx::command::ResourceState;

/// Maps the target-agnostic [`ResourceState`] of a [`sfg_gfx::command::BarrierCmd`] / attachment
/// description onto the concrete Vulkan image layout it implies. Kept separate from
/// `VulkanDevice::translate_stream` so the tag -> native-enum tables read as a lookup, not buried
/// inside the per-command match arms.
pub(crate) fn resource_state_layout(state: ResourceState) -> vk::ImageLayout {
    match state {
        ResourceState::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ResourceState::DepthAttachment => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        ResourceState::ShaderRead => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ResourceState::Present => vk::ImageLayout::PRESENT_SRC_KHR,
        ResourceState::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ResourceState::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    }
}

pub(crate) fn resource_state_from_u8(value: u8) -> ResourceState {
    match value {
        0 => ResourceState::ColorAttachment,
        1 => ResourceState::DepthAttachment,
        2 => ResourceState::ShaderRead,
        3 => ResourceState::Present,
        4 => ResourceState::TransferSrc,
        5 => ResourceState::TransferDst,
        other => panic!("unknown resource state tag {other}"),
    }
}

pub(crate) fn load_op_vk(tag: u8) -> vk::AttachmentLoadOp {
    match tag {
        0 => vk::AttachmentLoadOp::LOAD,
        1 => vk::AttachmentLoadOp::CLEAR,
        _ => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_vk(tag: u8) -> vk::AttachmentStoreOp {
    match tag {
        0 => vk::AttachmentStoreOp::STORE,
        _ => vk::AttachmentStoreOp::DONT_CARE,
    }
}
