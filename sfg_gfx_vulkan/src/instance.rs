use std::ffi::{c_void, CStr, CString};

use anyhow::Result;
use ash::ext::debug_utils;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Vulkan instance + validation messenger. Grounded on the teacher's `vulkan::Instance`; picks
/// 1.2 as the baseline API version per §4.3 ("preferring >= API-level 1.2").
pub struct Instance {
    pub entry: ash::Entry,
    pub raw: ash::Instance,
    debug_utils: debug_utils::Instance,
    debug_utils_messenger: vk::DebugUtilsMessengerEXT,
}

impl Instance {
    pub fn new(display_handle: RawDisplayHandle, app_name: &str) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let app_name_c = CString::new(app_name).unwrap();
        let app_info = vk::ApplicationInfo::default()
            .application_name(app_name_c.as_c_str())
            .api_version(vk::API_VERSION_1_2);

        let mut extension_names = ash_window::enumerate_required_extensions(display_handle)?.to_vec();
        extension_names.push(debug_utils::NAME.as_ptr());

        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names);

        let raw = unsafe { entry.create_instance(&instance_info, None)? };

        let debug_utils_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let debug_utils = debug_utils::Instance::new(&entry, &raw);
        let debug_utils_messenger =
            unsafe { debug_utils.create_debug_utils_messenger(&debug_utils_info, None)? };

        Ok(Instance {
            entry,
            raw,
            debug_utils,
            debug_utils_messenger,
        })
    }

    pub fn physical_devices(&self, surface: &Surface) -> Result<Vec<PhysicalDevice>> {
        let handles = unsafe { self.raw.enumerate_physical_devices()? };
        handles
            .into_iter()
            .map(|raw| PhysicalDevice::new(&self.raw, surface, raw))
            .collect()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.debug_utils
                .destroy_debug_utils_messenger(self.debug_utils_messenger, None);
            self.raw.destroy_instance(None);
        }
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*callback_data).p_message);
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[vk] {:?}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[vk] {:?}", message);
    } else {
        log::trace!("[vk] {:?}", message);
    }
    vk::FALSE
}

pub struct Surface {
    pub raw_ash: ash::khr::surface::Instance,
    pub raw_vulkan: vk::SurfaceKHR,
}

impl Surface {
    pub fn new(
        instance: &Instance,
        window_handle: RawWindowHandle,
        display_handle: RawDisplayHandle,
    ) -> Result<Self> {
        let raw_ash = ash::khr::surface::Instance::new(&instance.entry, &instance.raw);
        let raw_vulkan = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.raw,
                display_handle,
                window_handle,
                None,
            )?
        };
        Ok(Surface { raw_ash, raw_vulkan })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.raw_ash.destroy_surface(self.raw_vulkan, None) };
    }
}

#[derive(Clone, Copy, Debug)]
pub struct QueueFamily {
    pub index: u32,
    pub supports_graphics: bool,
    pub supports_compute: bool,
    pub supports_transfer: bool,
    pub supports_present: bool,
}

#[derive(Clone)]
pub struct PhysicalDevice {
    pub raw: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: Vec<QueueFamily>,
    pub supports_anisotropy: bool,
}

impl PhysicalDevice {
    fn new(instance: &ash::Instance, surface: &Surface, raw: vk::PhysicalDevice) -> Result<Self> {
        let properties = unsafe { instance.get_physical_device_properties(raw) };
        let name = unsafe {
            CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned()
        };
        let features = unsafe { instance.get_physical_device_features(raw) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(raw) };

        let family_properties = unsafe { instance.get_physical_device_queue_family_properties(raw) };
        let queue_families = family_properties
            .into_iter()
            .enumerate()
            .map(|(index, props)| {
                let supports_present = unsafe {
                    surface
                        .raw_ash
                        .get_physical_device_surface_support(raw, index as u32, surface.raw_vulkan)
                        .unwrap_or(false)
                };
                QueueFamily {
                    index: index as u32,
                    supports_graphics: props.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                    supports_compute: props.queue_flags.contains(vk::QueueFlags::COMPUTE),
                    supports_transfer: props.queue_flags.contains(vk::QueueFlags::TRANSFER),
                    supports_present,
                }
            })
            .collect();

        Ok(PhysicalDevice {
            raw,
            name,
            device_type: properties.device_type,
            api_version: properties.api_version,
            memory_properties,
            queue_families,
            supports_anisotropy: features.sampler_anisotropy != 0,
        })
    }

    /// Prefers a dedicated queue family over one shared with graphics, per §4.3's "preferring
    /// dedicated, falling back to separated, falling back to the graphics family".
    pub fn select_queue_family(&self, wants_compute: bool, wants_transfer: bool) -> QueueFamily {
        let graphics = self
            .queue_families
            .iter()
            .find(|f| f.supports_graphics)
            .copied()
            .expect("no graphics-capable queue family");

        if !wants_compute && !wants_transfer {
            return graphics;
        }

        let dedicated = self.queue_families.iter().find(|f| {
            (!wants_compute || f.supports_compute)
                && (!wants_transfer || f.supports_transfer)
                && !f.supports_graphics
        });
        if let Some(family) = dedicated {
            return *family;
        }

        let separated = self.queue_families.iter().find(|f| {
            (!wants_compute || f.supports_compute) && (!wants_transfer || f.supports_transfer)
        });
        separated.copied().unwrap_or(graphics)
    }
}

pub fn select_discrete_device(devices: &[PhysicalDevice]) -> Result<PhysicalDevice, String> {
    devices
        .iter()
        .find(|d| d.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
        .or_else(|| devices.first())
        .cloned()
        .ok_or_else(|| "no Vulkan physical devices available".to_string())
}
