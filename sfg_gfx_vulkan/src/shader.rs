use ash::vk;

/// Compiles a SPIR-V blob into a `vk::ShaderModule`. Grounded on the teacher's
/// `vulkan::shader` module, which does the same `create_shader_module` call from a `Vec<u32>`
/// reinterpreted from the raw bytes handed in by the asset loader.
pub fn create_shader_module(device: &ash::Device, spirv: &[u8]) -> Result<vk::ShaderModule, String> {
    if spirv.len() % 4 != 0 {
        return Err("SPIR-V blob length is not a multiple of 4".to_string());
    }
    let code: Vec<u32> = spirv
        .chunks_exact(4)
        .map(|bytes| u32::from_le_bytes(bytes.try_into().unwrap()))
        .collect();
    let info = vk::ShaderModuleCreateInfo::default().code(&code);
    unsafe {
        device
            .create_shader_module(&info, None)
            .map_err(|e| format!("failed to create shader module: {e}"))
    }
}
