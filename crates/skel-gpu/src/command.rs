//! Command pools, command buffers and queue submission.

use crate::error::{GpuError, Result};
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a single command buffer.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffer(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
    ) -> Result<vk::CommandBuffer> {
        let mut buffers = self.allocate_command_buffers(device, level, 1)?;
        buffers
            .pop()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_HOST_MEMORY))
    }

    /// Allocate `count` command buffers at the given level.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers)
    }

    /// Free command buffers back to this pool.
    ///
    /// # Safety
    /// The buffers must come from this pool and not be pending.
    pub unsafe fn free_command_buffers(&self, device: &ash::Device, buffers: &[vk::CommandBuffer]) {
        if !buffers.is_empty() {
            device.free_command_buffers(self.pool, buffers);
        }
    }

    /// Reset every command buffer allocated from the pool.
    ///
    /// # Safety
    /// The device must be valid and all command buffers from this pool must not be in use.
    pub unsafe fn reset(&self, device: &ash::Device, release_resources: bool) -> Result<()> {
        let flags = if release_resources {
            vk::CommandPoolResetFlags::RELEASE_RESOURCES
        } else {
            vk::CommandPoolResetFlags::empty()
        };
        device.reset_command_pool(self.pool, flags)?;
        Ok(())
    }

    /// Destroy the command pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

/// Begin recording a command buffer.
///
/// Pass `inheritance` when recording a secondary command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
    inheritance: Option<&vk::CommandBufferInheritanceInfo<'_>>,
) -> Result<()> {
    let mut begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    if let Some(inheritance) = inheritance {
        begin_info = begin_info.inheritance_info(inheritance);
    }
    device.begin_command_buffer(cmd, &begin_info)?;
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)?;
    Ok(())
}

/// Reset a single command buffer. The pool must allow individual resets.
///
/// # Safety
/// The command buffer must not be pending execution.
pub unsafe fn reset_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    release_resources: bool,
) -> Result<()> {
    let flags = if release_resources {
        vk::CommandBufferResetFlags::RELEASE_RESOURCES
    } else {
        vk::CommandBufferResetFlags::empty()
    };
    device.reset_command_buffer(cmd, flags)?;
    Ok(())
}

/// A semaphore a submission waits on, and the stage that waits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSemaphoreInfo {
    pub semaphore: vk::Semaphore,
    pub waiting_stage: vk::PipelineStageFlags,
}

impl WaitSemaphoreInfo {
    pub fn new(semaphore: vk::Semaphore, waiting_stage: vk::PipelineStageFlags) -> Self {
        Self {
            semaphore,
            waiting_stage,
        }
    }
}

/// Split wait infos into the parallel arrays `VkSubmitInfo` expects.
pub fn split_wait_infos(
    infos: &[WaitSemaphoreInfo],
) -> (Vec<vk::Semaphore>, Vec<vk::PipelineStageFlags>) {
    infos
        .iter()
        .map(|info| (info.semaphore, info.waiting_stage))
        .unzip()
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    wait_infos: &[WaitSemaphoreInfo],
    command_buffers: &[vk::CommandBuffer],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let (wait_semaphores, wait_stages) = split_wait_infos(wait_infos);

    let submit_info = vk::SubmitInfo::default()
        .wait_semaphores(&wait_semaphores)
        .wait_dst_stage_mask(&wait_stages)
        .command_buffers(command_buffers)
        .signal_semaphores(signal_semaphores);

    device.queue_submit(queue, &[submit_info], fence)?;
    Ok(())
}

/// Submit two batches where the second waits on semaphores signalled by the first.
///
/// The first batch signals every semaphore in `synchronizing` and has no
/// fence. The second batch waits on them at their `waiting_stage` and signals
/// `second_signal_semaphores` and `second_fence`.
///
/// # Safety
/// All handles must be valid.
#[allow(clippy::too_many_arguments)]
pub unsafe fn synchronize_two_command_buffers(
    device: &ash::Device,
    first_queue: vk::Queue,
    first_wait_infos: &[WaitSemaphoreInfo],
    first_command_buffers: &[vk::CommandBuffer],
    synchronizing: &[WaitSemaphoreInfo],
    second_queue: vk::Queue,
    second_command_buffers: &[vk::CommandBuffer],
    second_signal_semaphores: &[vk::Semaphore],
    second_fence: vk::Fence,
) -> Result<()> {
    let first_signal_semaphores: Vec<vk::Semaphore> =
        synchronizing.iter().map(|info| info.semaphore).collect();

    submit_command_buffers(
        device,
        first_queue,
        first_wait_infos,
        first_command_buffers,
        &first_signal_semaphores,
        vk::Fence::null(),
    )?;
    submit_command_buffers(
        device,
        second_queue,
        synchronizing,
        second_command_buffers,
        second_signal_semaphores,
        second_fence,
    )
}

/// Block until `queue` has drained.
///
/// # Safety
/// The queue must be valid and externally synchronized.
pub unsafe fn queue_wait_idle(device: &ash::Device, queue: vk::Queue) -> Result<()> {
    device.queue_wait_idle(queue)?;
    Ok(())
}

/// Block until every queue on the device has drained.
///
/// # Safety
/// The device must be valid.
pub unsafe fn device_wait_idle(device: &ash::Device) -> Result<()> {
    device.device_wait_idle()?;
    Ok(())
}

/// Record, submit and wait for a one-shot command buffer.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn execute_single_time_commands<F>(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let cmd = pool.allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY)?;

    let result = (|| {
        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, None)?;
        f(cmd);
        end_command_buffer(device, cmd)?;
        submit_command_buffers(device, queue, &[], &[cmd], &[], vk::Fence::null())?;
        queue_wait_idle(device, queue)
    })();

    pool.free_command_buffers(device, &[cmd]);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn wait_infos_split_in_order() {
        let infos = [
            WaitSemaphoreInfo::new(
                vk::Semaphore::from_raw(1),
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ),
            WaitSemaphoreInfo::new(vk::Semaphore::from_raw(2), vk::PipelineStageFlags::TRANSFER),
        ];

        let (semaphores, stages) = split_wait_infos(&infos);
        assert_eq!(
            semaphores,
            vec![vk::Semaphore::from_raw(1), vk::Semaphore::from_raw(2)]
        );
        assert_eq!(
            stages,
            vec![
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::TRANSFER
            ]
        );
    }

    #[test]
    fn no_wait_infos() {
        let (semaphores, stages) = split_wait_infos(&[]);
        assert!(semaphores.is_empty());
        assert!(stages.is_empty());
    }
}
