//! Device abstraction shared by all backends.

use std::fmt;

use crate::ComputeResult;

/// Kind of execution unit behind a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Discrete, integrated or virtual GPU.
    Gpu,
    /// CPU execution (host threads or a software rasterizer).
    Cpu,
    /// Anything the driver could not classify.
    Other,
}

/// One discovered platform/device pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Device name as reported by the driver.
    pub name: String,
    /// Platform or API name (e.g. "Vulkan", "rayon").
    pub platform: String,
    /// Execution unit kind.
    pub kind: DeviceKind,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:?})", self.name, self.platform, self.kind)
    }
}

/// Host access mode of a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    /// Kernels read and write.
    ReadWrite,
    /// Kernels only read; filled once by the host.
    ReadOnly,
}

/// Handle to device memory.
pub trait DeviceBuffer: Send + Sync {
    /// Allocated size in bytes.
    fn size_bytes(&self) -> u64;
}

/// One positional kernel argument.
#[derive(Debug)]
pub enum KernelArg<'a, B> {
    /// A device buffer.
    Buffer(&'a B),
    /// Work-group local scratch of the given size; zero leaves the slot unused.
    Local(usize),
    /// A 32-bit scalar.
    U32(u32),
}

// Manual impls: derive would require `B: Clone`.
impl<B> Clone for KernelArg<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for KernelArg<'_, B> {}

impl<B> KernelArg<'_, B> {
    /// Scalar value, if this is a scalar argument.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }
}

/// Compute device operations.
///
/// Mirrors the handful of driver calls the filter session needs. Transfers
/// are blocking; [`enqueue`](ComputeDevice::enqueue) only submits into the
/// device's in-order queue and [`finish`](ComputeDevice::finish) drains it.
pub trait ComputeDevice: Send {
    /// Device memory handle.
    type Buffer: DeviceBuffer;
    /// Compiled program.
    type Program: Send;
    /// Kernel instantiated from a program.
    type Kernel: Send;

    /// Selected device name.
    fn name(&self) -> &str;

    /// Selected device kind.
    fn kind(&self) -> DeviceKind;

    /// Every platform/device pair seen during discovery.
    fn platforms(&self) -> &[PlatformInfo];

    /// Compiles kernel source for this device.
    fn build_program(&self, source: &str) -> ComputeResult<Self::Program>;

    /// Instantiates one entry point of a built program.
    fn create_kernel(&self, program: &Self::Program, entry_point: &str) -> ComputeResult<Self::Kernel>;

    /// Allocates device memory. `size_bytes` must be a non-zero multiple of 4.
    fn create_buffer(&self, size_bytes: u64, access: BufferAccess) -> ComputeResult<Self::Buffer>;

    /// Blocking host to device copy of the whole buffer.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]) -> ComputeResult<()>;

    /// Blocking device to host copy of the whole buffer.
    fn read_buffer(&self, buffer: &Self::Buffer, out: &mut [u8]) -> ComputeResult<()>;

    /// Preferred local work-group size for a kernel.
    fn work_group_size(&self, kernel: &Self::Kernel) -> ComputeResult<u32>;

    /// Submits a 1-D range of `global` work-items in groups of `local`.
    fn enqueue(
        &self,
        kernel: &Self::Kernel,
        args: &[KernelArg<'_, Self::Buffer>],
        global: u32,
        local: u32,
    ) -> ComputeResult<()>;

    /// Blocks until every submitted command has completed.
    fn finish(&self) -> ComputeResult<()>;
}

/// Checks the size rule shared by every backend's `create_buffer`.
pub(crate) fn check_buffer_size(size_bytes: u64) -> ComputeResult<()> {
    if size_bytes == 0 || size_bytes % 4 != 0 {
        return Err(crate::ComputeError::BufferCreation(format!(
            "size {size_bytes} is not a non-zero multiple of 4"
        )));
    }
    Ok(())
}

/// Checks a transfer covers the whole buffer.
pub(crate) fn check_transfer_len(buffer_bytes: u64, host_bytes: usize) -> ComputeResult<()> {
    if buffer_bytes != host_bytes as u64 {
        return Err(crate::ComputeError::BufferSizeMismatch {
            expected: buffer_bytes as usize,
            actual: host_bytes,
        });
    }
    Ok(())
}

/// Splits `groups` work-groups into an `(x, y)` grid with neither side above
/// `max_per_dim`. Kernels linearize as `y * x_groups * local + x`; trailing
/// items past the real count are discarded by their range guard.
#[cfg_attr(not(feature = "wgpu"), allow(dead_code))]
pub(crate) fn workgroup_grid(groups: u32, max_per_dim: u32) -> Option<(u32, u32)> {
    if groups == 0 {
        return Some((0, 1));
    }
    let x = groups.min(max_per_dim.max(1));
    let y = groups.div_ceil(x);
    (y <= max_per_dim).then_some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ranges_stay_one_dimensional() {
        assert_eq!(workgroup_grid(1, 65535), Some((1, 1)));
        assert_eq!(workgroup_grid(65535, 65535), Some((65535, 1)));
    }

    #[test]
    fn large_ranges_fold_into_rows() {
        // 2048x2048 blur: 16_777_216 items in groups of 256
        let groups = (2048u32 * 2048 * 4).div_ceil(256);
        assert_eq!(groups, 65536);
        let (x, y) = workgroup_grid(groups, 65535).unwrap();
        assert_eq!((x, y), (65535, 2));
        assert!(x as u64 * y as u64 >= groups as u64);
    }

    #[test]
    fn grid_covers_every_group_without_a_spare_row() {
        for groups in [7u32, 100, 1000, 4096] {
            let (x, y) = workgroup_grid(groups, 64).unwrap();
            assert!(x <= 64 && y <= 64);
            assert!(x * y >= groups);
            assert!(x * (y - 1) < groups);
        }
    }

    #[test]
    fn too_many_groups_is_none() {
        assert_eq!(workgroup_grid(65 * 64, 64), None);
    }
}
