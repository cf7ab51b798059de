//! GPU context management.

use crate::capabilities::GpuCapabilities;
use crate::command;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device, DebugMessenger};
use crate::memory::GpuAllocator;
use crate::surface::{PendingSurface, SurfaceContext};
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) debug_messenger: Option<DebugMessenger>,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) graphics_queue_family: u32,
    pub(crate) graphics_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Get the graphics queue. It is also used for presentation and transfers.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the graphics queue family index.
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Whether validation messages are being routed to the log.
    pub fn validation_enabled(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { command::device_wait_idle(&self.device) }
    }

    /// Wait for the graphics queue to be idle.
    pub fn queue_wait_idle(&self) -> Result<()> {
        unsafe { command::queue_wait_idle(&self.device, self.graphics_queue) }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::warn!("device_wait_idle failed during shutdown: {e}");
            }

            // Frees every VkDeviceMemory block, so it must run before the device goes.
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
    verbose_validation: bool,
    extra_extensions: Vec<CString>,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Skel".to_string(),
            enable_validation: cfg!(debug_assertions),
            verbose_validation: false,
            extra_extensions: Vec::new(),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Also log info and verbose validation messages.
    pub fn verbose_validation(mut self, verbose: bool) -> Self {
        self.verbose_validation = verbose;
        self
    }

    /// Request an additional instance extension.
    pub fn instance_extension(mut self, name: &CStr) -> Self {
        self.extra_extensions.push(name.to_owned());
        self
    }

    /// Build a context without a surface.
    pub fn build(self) -> Result<GpuContext> {
        let entry = load_entry()?;
        let extensions = self.extension_pointers(&[]);
        let (instance, debug_messenger) = self.create_instance(&entry, &extensions)?;

        let parts = unsafe { create_logical_device(&instance, |_, _| true) };
        match parts {
            Ok(parts) => Self::finish(entry, instance, debug_messenger, parts, None),
            Err(e) => {
                unsafe { destroy_instance(&instance, debug_messenger) };
                Err(e)
            }
        }
    }

    /// Build a context together with a surface for `window`.
    ///
    /// The surface exists before device selection, so only devices with a
    /// graphics queue family that can present to it are considered.
    pub fn build_for_window<W>(self, window: &W) -> Result<(GpuContext, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = load_entry()?;

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let surface_extensions = ash_window::enumerate_required_extensions(display.as_raw())
            .map_err(|e| GpuError::ExtensionNotSupported(e.to_string()))?;

        let extensions = self.extension_pointers(surface_extensions);
        let (instance, debug_messenger) = self.create_instance(&entry, &extensions)?;

        let pending = match unsafe { PendingSurface::from_window(&entry, &instance, window) } {
            Ok(pending) => pending,
            Err(e) => {
                unsafe { destroy_instance(&instance, debug_messenger) };
                return Err(e);
            }
        };

        let parts = unsafe {
            create_logical_device(&instance, |physical_device, family| {
                pending.supports_present(physical_device, family)
            })
        };
        let parts = match parts {
            Ok(parts) => parts,
            Err(e) => {
                unsafe {
                    pending.destroy();
                    destroy_instance(&instance, debug_messenger);
                }
                return Err(e);
            }
        };

        let gpu = Self::finish(entry, instance, debug_messenger, parts, Some(&pending))?;
        let surface = unsafe { pending.finish(gpu.instance(), gpu.device()) };
        Ok((gpu, surface))
    }

    fn extension_pointers(&self, required: &[*const c_char]) -> Vec<*const c_char> {
        required
            .iter()
            .copied()
            .chain(self.extra_extensions.iter().map(|ext| ext.as_ptr()))
            .collect()
    }

    fn create_instance(
        &self,
        entry: &ash::Entry,
        extensions: &[*const c_char],
    ) -> Result<(ash::Instance, Option<DebugMessenger>)> {
        let instance =
            unsafe { create_instance(entry, &self.app_name, self.enable_validation, extensions) }?;

        let debug_messenger = if self.enable_validation {
            match unsafe { DebugMessenger::new(entry, &instance, self.verbose_validation) } {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    tracing::warn!("Failed to install debug messenger: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok((instance, debug_messenger))
    }

    fn finish(
        entry: ash::Entry,
        instance: ash::Instance,
        debug_messenger: Option<DebugMessenger>,
        parts: DeviceParts,
        surface: Option<&PendingSurface>,
    ) -> Result<GpuContext> {
        let device = Arc::new(parts.device);

        let allocator =
            match unsafe { GpuAllocator::new(&instance, Arc::clone(&device), parts.physical_device) } {
                Ok(allocator) => allocator,
                Err(e) => {
                    unsafe {
                        device.destroy_device(None);
                        if let Some(surface) = surface {
                            surface.destroy();
                        }
                        destroy_instance(&instance, debug_messenger);
                    }
                    return Err(e);
                }
            };

        Ok(GpuContext {
            entry,
            instance,
            debug_messenger,
            physical_device: parts.physical_device,
            device,
            capabilities: parts.capabilities,
            allocator: Mutex::new(allocator),
            graphics_queue_family: parts.graphics_queue_family,
            graphics_queue: parts.graphics_queue,
        })
    }
}

fn load_entry() -> Result<ash::Entry> {
    unsafe { ash::Entry::load() }.map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))
}

unsafe fn destroy_instance(instance: &ash::Instance, debug_messenger: Option<DebugMessenger>) {
    if let Some(messenger) = debug_messenger {
        messenger.destroy();
    }
    instance.destroy_instance(None);
}

/// Everything produced between instance creation and allocator creation.
struct DeviceParts {
    physical_device: vk::PhysicalDevice,
    capabilities: GpuCapabilities,
    device: ash::Device,
    graphics_queue_family: u32,
    graphics_queue: vk::Queue,
}

/// Select a physical device and create the logical device on it.
///
/// `can_present(device, family)` filters graphics queue families.
///
/// # Safety
/// The instance must be valid.
unsafe fn create_logical_device(
    instance: &ash::Instance,
    can_present: impl Fn(vk::PhysicalDevice, u32) -> bool,
) -> Result<DeviceParts> {
    let physical_device = select_physical_device(instance, |physical_device| {
        find_graphics_queue_family(instance, physical_device, &can_present).is_some()
    })?;

    let capabilities = GpuCapabilities::query(instance, physical_device);
    if !capabilities.meets_requirements() {
        tracing::error!("GPU rejected: {}", capabilities.summary());
        return Err(GpuError::NoSuitableDevice);
    }

    tracing::info!("Selected GPU: {}", capabilities.summary());

    let graphics_queue_family = find_graphics_queue_family(instance, physical_device, &can_present)
        .ok_or(GpuError::NoSuitableDevice)?;

    let (device, graphics_queue) = create_device(instance, physical_device, graphics_queue_family)?;

    Ok(DeviceParts {
        physical_device,
        capabilities,
        device,
        graphics_queue_family,
        graphics_queue,
    })
}

/// First queue family with graphics support that `can_present` accepts.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn find_graphics_queue_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    can_present: &impl Fn(vk::PhysicalDevice, u32) -> bool,
) -> Option<u32> {
    let families = instance.get_physical_device_queue_family_properties(physical_device);
    first_graphics_family(&families, |family| can_present(physical_device, family))
}

fn first_graphics_family(
    families: &[vk::QueueFamilyProperties],
    accept: impl Fn(u32) -> bool,
) -> Option<u32> {
    families
        .iter()
        .zip(0u32..)
        .find(|(props, index)| props.queue_flags.contains(vk::QueueFlags::GRAPHICS) && accept(*index))
        .map(|(_, index)| index)
}

/// Required device extensions.
fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Create the logical device with a single graphics queue.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_queue_family: u32,
) -> Result<(ash::Device, vk::Queue)> {
    let queue_priority = 1.0_f32;
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_queue_family)
        .queue_priorities(std::slice::from_ref(&queue_priority))];

    let extensions = required_device_extensions();
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance
        .create_device(physical_device, &device_create_info, None)
        .map_err(GpuError::from)?;

    let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

    Ok((device, graphics_queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn picks_first_graphics_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(first_graphics_family(&families, |_| true), Some(1));
    }

    #[test]
    fn present_filter_skips_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(first_graphics_family(&families, |i| i == 1), Some(1));
        assert_eq!(first_graphics_family(&families, |_| false), None);
    }

    #[test]
    fn compute_only_is_not_enough() {
        let families = [family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)];
        assert_eq!(first_graphics_family(&families, |_| true), None);
    }

    #[test]
    fn builder_collects_extra_extensions() {
        let builder = GpuContextBuilder::new()
            .app_name("test")
            .validation(false)
            .instance_extension(c"VK_KHR_get_surface_capabilities2");
        let pointers = builder.extension_pointers(&[]);
        assert_eq!(pointers.len(), 1);
        let name = unsafe { CStr::from_ptr(pointers[0]) };
        assert_eq!(name, c"VK_KHR_get_surface_capabilities2");
        assert!(!builder.enable_validation);
    }
}
