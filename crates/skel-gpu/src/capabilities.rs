//! GPU capability detection.

use ash::vk;
use std::ffi::CStr;

/// Lowest Vulkan API version the demos target.
pub const MIN_API_VERSION: u32 = vk::API_VERSION_1_2;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Detected GPU capabilities.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    pub vendor: GpuVendor,
    pub device_name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub driver_version: u32,
    /// Device-local memory in MB
    pub device_local_memory_mb: u64,
    pub max_push_constants_size: u32,
    /// Required alignment for dynamic uniform buffer offsets.
    pub min_uniform_buffer_offset_alignment: u64,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            device_local_memory_mb: device_local_memory_mb(&memory_properties),
            max_push_constants_size: properties.limits.max_push_constants_size,
            min_uniform_buffer_offset_alignment: properties
                .limits
                .min_uniform_buffer_offset_alignment,
        }
    }

    /// Check if the GPU can run the demos.
    pub fn meets_requirements(&self) -> bool {
        api_at_least(self.api_version, MIN_API_VERSION)
    }

    /// Round `size` up to the uniform buffer offset alignment.
    pub fn align_uniform_size(&self, size: u64) -> u64 {
        let align = self.min_uniform_buffer_offset_alignment.max(1);
        size.div_ceil(align) * align
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
        )
    }
}

/// Sum of all device-local heaps in MB.
pub fn device_local_memory_mb(memory: &vk::PhysicalDeviceMemoryProperties) -> u64 {
    memory
        .memory_heaps
        .iter()
        .take(memory.memory_heap_count as usize)
        .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
        .map(|heap| heap.size / (1024 * 1024))
        .sum()
}

/// Compare major.minor of two packed API versions, ignoring patch and variant.
pub fn api_at_least(version: u32, required: u32) -> bool {
    (vk::api_version_major(version), vk::api_version_minor(version))
        >= (vk::api_version_major(required), vk::api_version_minor(required))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(api_version: u32, alignment: u64) -> GpuCapabilities {
        GpuCapabilities {
            vendor: GpuVendor::Other(0),
            device_name: "test".to_string(),
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            api_version,
            driver_version: 0,
            device_local_memory_mb: 0,
            max_push_constants_size: 128,
            min_uniform_buffer_offset_alignment: alignment,
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn api_version_gate() {
        assert!(caps(vk::API_VERSION_1_2, 256).meets_requirements());
        assert!(caps(vk::API_VERSION_1_3, 256).meets_requirements());
        assert!(caps(vk::make_api_version(0, 1, 2, 189), 256).meets_requirements());
        assert!(!caps(vk::API_VERSION_1_1, 256).meets_requirements());
        assert!(!caps(vk::API_VERSION_1_0, 256).meets_requirements());
    }

    #[test]
    fn uniform_alignment() {
        let c = caps(vk::API_VERSION_1_2, 256);
        assert_eq!(c.align_uniform_size(192), 256);
        assert_eq!(c.align_uniform_size(256), 256);
        assert_eq!(c.align_uniform_size(257), 512);
        assert_eq!(caps(vk::API_VERSION_1_2, 0).align_uniform_size(10), 10);
    }

    #[test]
    fn heap_sum_counts_device_local_only() {
        let mut memory = vk::PhysicalDeviceMemoryProperties {
            memory_heap_count: 2,
            ..Default::default()
        };
        memory.memory_heaps[0] = vk::MemoryHeap {
            size: 4096 * 1024 * 1024,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        memory.memory_heaps[1] = vk::MemoryHeap {
            size: 8192 * 1024 * 1024,
            flags: vk::MemoryHeapFlags::empty(),
        };
        assert_eq!(device_local_memory_mb(&memory), 4096);
    }
}
