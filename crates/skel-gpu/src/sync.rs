//! Synchronization primitives.

use crate::error::{GpuError, Result};
use ash::vk;

/// Fence wait used by the frame loop before giving up on a frame.
pub const FRAME_FENCE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence, optionally already signaled so the first wait returns at once.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Wait for one or all of `fences`.
///
/// Returns `Ok(false)` if the timeout expired before the condition was met.
///
/// # Safety
/// The device and fences must be valid.
pub unsafe fn wait_for_fences(
    device: &ash::Device,
    fences: &[vk::Fence],
    wait_all: bool,
    timeout_ns: u64,
) -> Result<bool> {
    if fences.is_empty() {
        return Ok(true);
    }
    match device.wait_for_fences(fences, wait_all, timeout_ns) {
        Ok(()) => Ok(true),
        Err(vk::Result::TIMEOUT) => Ok(false),
        Err(e) => Err(GpuError::from(e)),
    }
}

/// Wait for a single fence. Returns `Ok(false)` on timeout.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<bool> {
    wait_for_fences(device, &[fence], true, timeout_ns)
}

/// Reset fences to the unsignaled state.
///
/// # Safety
/// The device and fences must be valid and not in use by a pending submission.
pub unsafe fn reset_fences(device: &ash::Device, fences: &[vk::Fence]) -> Result<()> {
    if fences.is_empty() {
        return Ok(());
    }
    device.reset_fences(fences)?;
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    reset_fences(device, &[fence])
}

/// Per-frame-slot synchronization: the acquire semaphore and the CPU fence.
///
/// Render-finished semaphores are not in here; they belong to swapchain
/// images, since presentation may still hold one after the slot is reused.
#[derive(Debug, Clone, Copy)]
pub struct FrameSync {
    /// Semaphore signaled when the acquired image is ready to be written.
    pub image_available: vk::Semaphore,
    /// Fence signaled when this slot's last submission finished.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create frame synchronization resources. The fence starts signaled.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
        })
    }

    /// Wait until the slot is free. Returns `Ok(false)` on timeout.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device, timeout_ns: u64) -> Result<bool> {
        wait_for_fence(device, self.in_flight, timeout_ns)
    }

    /// Reset the fence for the next submission.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        reset_fence(device, self.in_flight)
    }

    /// Destroy synchronization resources.
    ///
    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// Round-robin index over the frames in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRing {
    current: usize,
    len: usize,
}

impl FrameRing {
    /// Create a ring of `len` slots starting at slot 0.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(GpuError::InvalidState(
                "at least one frame in flight is required".to_string(),
            ));
        }
        Ok(Self { current: 0, len })
    }

    /// Index of the slot the next frame records into.
    pub const fn current(&self) -> usize {
        self.current
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move to the next slot, wrapping around.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.len;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_wraps() {
        let mut ring = FrameRing::new(2).unwrap();
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.advance(), 1);
        assert_eq!(ring.advance(), 0);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn ring_visits_every_slot() {
        let mut ring = FrameRing::new(3).unwrap();
        let visited: Vec<usize> = (0..6).map(|_| ring.advance()).collect();
        assert_eq!(visited, vec![1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn single_slot_ring_stays_put() {
        let mut ring = FrameRing::new(1).unwrap();
        assert_eq!(ring.advance(), 0);
    }

    #[test]
    fn empty_ring_rejected() {
        assert!(matches!(FrameRing::new(0), Err(GpuError::InvalidState(_))));
    }
}
