//! Buffer memory barriers.

use ash::vk;

/// An access and ownership change for a whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTransition {
    pub buffer: vk::Buffer,
    pub current_access: vk::AccessFlags,
    pub new_access: vk::AccessFlags,
    /// `vk::QUEUE_FAMILY_IGNORED` unless ownership moves between families.
    pub current_queue_family: u32,
    pub new_queue_family: u32,
}

impl BufferTransition {
    /// Barrier covering the entire buffer.
    pub fn to_barrier(&self) -> vk::BufferMemoryBarrier<'static> {
        vk::BufferMemoryBarrier::default()
            .src_access_mask(self.current_access)
            .dst_access_mask(self.new_access)
            .src_queue_family_index(self.current_queue_family)
            .dst_queue_family_index(self.new_queue_family)
            .buffer(self.buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE)
    }
}

/// Record one pipeline barrier for all `transitions`.
///
/// # Safety
/// `cmd` must be in the recording state.
pub unsafe fn set_buffer_memory_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    src_stages: vk::PipelineStageFlags,
    dst_stages: vk::PipelineStageFlags,
    transitions: &[BufferTransition],
) {
    if transitions.is_empty() {
        return;
    }

    let barriers: Vec<vk::BufferMemoryBarrier> =
        transitions.iter().map(BufferTransition::to_barrier).collect();

    device.cmd_pipeline_barrier(
        cmd,
        src_stages,
        dst_stages,
        vk::DependencyFlags::empty(),
        &[],
        &barriers,
        &[],
    );
}

/// Access mask and stages that will read a buffer created with `usage`.
pub fn read_access_for_usage(
    usage: vk::BufferUsageFlags,
) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    let mut access = vk::AccessFlags::empty();
    let mut stages = vk::PipelineStageFlags::empty();

    if usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER) {
        access |= vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
        stages |= vk::PipelineStageFlags::VERTEX_INPUT;
    }
    if usage.contains(vk::BufferUsageFlags::INDEX_BUFFER) {
        access |= vk::AccessFlags::INDEX_READ;
        stages |= vk::PipelineStageFlags::VERTEX_INPUT;
    }
    if usage.contains(vk::BufferUsageFlags::UNIFORM_BUFFER) {
        access |= vk::AccessFlags::UNIFORM_READ;
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
    }
    if usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER) {
        access |= vk::AccessFlags::SHADER_READ;
        stages |= vk::PipelineStageFlags::VERTEX_SHADER
            | vk::PipelineStageFlags::FRAGMENT_SHADER
            | vk::PipelineStageFlags::COMPUTE_SHADER;
    }
    if usage.contains(vk::BufferUsageFlags::INDIRECT_BUFFER) {
        access |= vk::AccessFlags::INDIRECT_COMMAND_READ;
        stages |= vk::PipelineStageFlags::DRAW_INDIRECT;
    }

    if stages.is_empty() {
        // Nothing we know reads it; fall back to a full memory read.
        (vk::AccessFlags::MEMORY_READ, vk::PipelineStageFlags::ALL_COMMANDS)
    } else {
        (access, stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn barrier_covers_whole_buffer() {
        let transition = BufferTransition {
            buffer: vk::Buffer::from_raw(7),
            current_access: vk::AccessFlags::TRANSFER_WRITE,
            new_access: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            current_queue_family: vk::QUEUE_FAMILY_IGNORED,
            new_queue_family: vk::QUEUE_FAMILY_IGNORED,
        };
        let barrier = transition.to_barrier();
        assert_eq!(barrier.buffer, vk::Buffer::from_raw(7));
        assert_eq!(barrier.src_access_mask, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags::VERTEX_ATTRIBUTE_READ);
        assert_eq!(barrier.offset, 0);
        assert_eq!(barrier.size, vk::WHOLE_SIZE);
        assert_eq!(barrier.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }

    #[test]
    fn queue_family_transfer_is_kept() {
        let transition = BufferTransition {
            buffer: vk::Buffer::null(),
            current_access: vk::AccessFlags::empty(),
            new_access: vk::AccessFlags::SHADER_READ,
            current_queue_family: 1,
            new_queue_family: 0,
        };
        let barrier = transition.to_barrier();
        assert_eq!(barrier.src_queue_family_index, 1);
        assert_eq!(barrier.dst_queue_family_index, 0);
    }

    #[test]
    fn usage_maps_to_read_access() {
        let (access, stages) =
            read_access_for_usage(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER);
        assert_eq!(
            access,
            vk::AccessFlags::VERTEX_ATTRIBUTE_READ | vk::AccessFlags::INDEX_READ
        );
        assert_eq!(stages, vk::PipelineStageFlags::VERTEX_INPUT);

        let (access, stages) = read_access_for_usage(vk::BufferUsageFlags::UNIFORM_BUFFER);
        assert_eq!(access, vk::AccessFlags::UNIFORM_READ);
        assert!(stages.contains(vk::PipelineStageFlags::VERTEX_SHADER));
    }

    #[test]
    fn unknown_usage_falls_back_to_memory_read() {
        let (access, stages) = read_access_for_usage(vk::BufferUsageFlags::TRANSFER_SRC);
        assert_eq!(access, vk::AccessFlags::MEMORY_READ);
        assert_eq!(stages, vk::PipelineStageFlags::ALL_COMMANDS);
    }
}
