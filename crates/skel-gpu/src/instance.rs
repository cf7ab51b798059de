//! Vulkan instance creation, validation output and physical device selection.

use crate::capabilities::{api_at_least, MIN_API_VERSION};
use crate::error::{GpuError, Result};
use ash::vk;
use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};

/// Validation layers to enable when validation is requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Create a Vulkan instance targeting Vulkan 1.2.
///
/// `required_extensions` normally comes from `ash_window::enumerate_required_extensions`;
/// the debug-utils extension is appended when validation is on.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    enable_validation: bool,
    required_extensions: &[*const c_char],
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::Other(format!("Invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"Skel")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(MIN_API_VERSION);

    let mut extension_names = required_extensions.to_vec();
    if enable_validation {
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    #[cfg(target_os = "macos")]
    extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());

    // Missing layers are skipped with a warning rather than failing instance creation.
    let available_layers = entry.enumerate_instance_layer_properties()?;
    let layers: Vec<&CStr> = if enable_validation {
        validation_layers()
            .into_iter()
            .filter(|layer| {
                let found = available_layers
                    .iter()
                    .any(|props| CStr::from_ptr(props.layer_name.as_ptr()) == *layer);
                if !found {
                    tracing::warn!("Validation layer {} not available", layer.to_string_lossy());
                }
                found
            })
            .collect()
    } else {
        vec![]
    };
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = entry.create_instance(&create_info, None)?;

    Ok(instance)
}

/// Routes validation-layer messages into `tracing`.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Install the messenger. Warnings and errors are always reported;
    /// `verbose` adds info and verbose messages.
    ///
    /// # Safety
    /// The instance must have been created with the debug-utils extension.
    pub unsafe fn new(entry: &ash::Entry, instance: &ash::Instance, verbose: bool) -> Result<Self> {
        let mut severity = vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
        if verbose {
            severity |= vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE;
        }

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity)
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let messenger = loader.create_debug_utils_messenger(&create_info, None)?;

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the instance is destroyed.
    pub unsafe fn destroy(&self) {
        self.loader
            .destroy_debug_utils_messenger(self.messenger, None);
    }
}

unsafe fn lossy_cstr<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    let data = &*data;
    let id = lossy_cstr(data.p_message_id_name);
    let message = lossy_cstr(data.p_message);

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "vulkan", "[{types:?}] {id}: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vulkan", "[{types:?}] {id}: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "vulkan", "[{types:?}] {id}: {message}");
    } else {
        tracing::debug!(target: "vulkan", "[{types:?}] {id}: {message}");
    }

    vk::FALSE
}

/// Score a device from its properties. `None` means unusable.
///
/// Discrete beats integrated beats virtual beats CPU.
pub fn score_device_properties(properties: &vk::PhysicalDeviceProperties) -> Option<u32> {
    if !api_at_least(properties.api_version, MIN_API_VERSION) {
        return None;
    }

    let score = match properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    };
    Some(score)
}

/// Pick the highest-scoring candidate. Ties go to the earlier one.
///
/// If nothing scored but there are candidates, the first one is returned.
/// That candidate is unusable or too old, so device creation still rejects
/// it; the fallback only means the error names a concrete device.
pub fn pick_best(scores: &[Option<u32>]) -> Option<usize> {
    let best = scores
        .iter()
        .enumerate()
        .filter_map(|(i, score)| score.map(|s| (i, s)))
        .fold(None, |best: Option<(usize, u32)>, (i, s)| match best {
            Some((_, best_score)) if best_score >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i);

    best.or_else(|| (!scores.is_empty()).then_some(0))
}

/// Select the best physical device.
///
/// `usable` rejects devices that lack something the caller needs, such as a
/// queue family that can present to a surface.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    usable: impl Fn(vk::PhysicalDevice) -> bool,
) -> Result<vk::PhysicalDevice> {
    let devices = instance.enumerate_physical_devices()?;

    let scores: Vec<Option<u32>> = devices
        .iter()
        .map(|&device| {
            if !usable(device) {
                return None;
            }
            let properties = instance.get_physical_device_properties(device);
            let score = score_device_properties(&properties);
            tracing::debug!(
                "Candidate GPU {} scored {:?}",
                CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy(),
                score
            );
            score
        })
        .collect();

    let index = pick_best(&scores).ok_or(GpuError::NoSuitableDevice)?;
    if scores[index].is_none() {
        tracing::warn!("No GPU met the requirements, checking the first device for the error report");
    }

    Ok(devices[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(device_type: vk::PhysicalDeviceType, api: u32) -> vk::PhysicalDeviceProperties {
        vk::PhysicalDeviceProperties {
            device_type,
            api_version: api,
            ..Default::default()
        }
    }

    #[test]
    fn discrete_beats_integrated() {
        let discrete =
            score_device_properties(&properties(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_2));
        let integrated = score_device_properties(&properties(
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::API_VERSION_1_3,
        ));
        let cpu = score_device_properties(&properties(vk::PhysicalDeviceType::CPU, vk::API_VERSION_1_3));
        assert!(discrete > integrated);
        assert!(integrated > cpu);
        assert!(cpu.is_some());
    }

    #[test]
    fn old_api_rejected() {
        assert_eq!(
            score_device_properties(&properties(
                vk::PhysicalDeviceType::DISCRETE_GPU,
                vk::API_VERSION_1_1
            )),
            None
        );
    }

    #[test]
    fn pick_best_prefers_highest_then_earliest() {
        assert_eq!(pick_best(&[Some(100), Some(1000), Some(50)]), Some(1));
        assert_eq!(pick_best(&[Some(100), None, Some(100)]), Some(0));
        assert_eq!(pick_best(&[None, Some(1)]), Some(1));
    }

    #[test]
    fn pick_best_falls_back_to_first() {
        assert_eq!(pick_best(&[None, None]), Some(0));
        assert_eq!(pick_best(&[]), None);
    }
}
