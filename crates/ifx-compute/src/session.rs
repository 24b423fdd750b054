//! Filter dispatch over a ping-pong buffer pair.
//!
//! A [`FilterSession`] owns everything a sequence of dispatches needs: the
//! device context, the kernel name table, both pixel buffers and the blur
//! mask. Each [`dispatch`](FilterSession::dispatch) runs one filter to
//! completion, copies the result into the caller's pixels and swaps the
//! buffer roles.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use ifx_core::{FilterId, Pixel};

use crate::backend::{BufferAccess, ComputeDevice, DeviceBuffer, KernelArg};
use crate::buffers::PingPong;
use crate::context::{DeviceContext, KernelSource};
use crate::mask::GaussianMask;
use crate::registry::KernelNameTable;
use crate::{ComputeError, ComputeResult};

/// Channel items per pixel seen by the blur kernel.
const BLUR_ITEMS_PER_PIXEL: u32 = 4;

/// Timing and sizing of one completed dispatch.
#[derive(Debug, Clone)]
pub struct DispatchStats {
    pub filter: FilterId,
    pub entry_point: String,
    /// Work-items submitted.
    pub global_size: u32,
    /// Work-group size used.
    pub local_size: u32,
    /// Kernel creation through readback.
    pub elapsed: Duration,
}

impl fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} items / {} per group in {:.2} ms",
            self.filter,
            self.entry_point,
            self.global_size,
            self.local_size,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// Builds the argument list and global size for one filter.
///
/// Standard filters take `(input, output, pixel_count)` over `pixel_count`
/// work-items. The blur takes `(input, output, mask, scratch, width,
/// pixel_count * 4)` over `pixel_count * 4` work-items; the scaled count
/// only exists in the returned values.
pub fn bind_arguments<'a, B: DeviceBuffer>(
    filter: FilterId,
    buffers: &'a PingPong<B>,
    mask: &'a B,
    width: u32,
    pixel_count: u32,
) -> (Vec<KernelArg<'a, B>>, u32) {
    let input = KernelArg::Buffer(buffers.input());
    let output = KernelArg::Buffer(buffers.output());
    if filter.is_standard() {
        (vec![input, output, KernelArg::U32(pixel_count)], pixel_count)
    } else {
        let items = pixel_count * BLUR_ITEMS_PER_PIXEL;
        (
            vec![
                input,
                output,
                KernelArg::Buffer(mask),
                KernelArg::Local(0),
                KernelArg::U32(width),
                KernelArg::U32(items),
            ],
            items,
        )
    }
}

/// A live dispatch session on one device.
///
/// Fields drop in teardown order: program, device, kernel names, then the
/// buffers.
pub struct FilterSession<D: ComputeDevice> {
    context: DeviceContext<D>,
    names: KernelNameTable,
    buffers: PingPong<D::Buffer>,
    mask: D::Buffer,
    width: u32,
    height: u32,
    dispatches: u64,
}

fn validate_dimensions(pixels: &[Pixel], width: u32, height: u32) -> ComputeResult<u32> {
    let count = (width as u64) * (height as u64);
    // The blur item count must also fit in a u32.
    if width == 0 || height == 0 || count * BLUR_ITEMS_PER_PIXEL as u64 > u32::MAX as u64 {
        return Err(ComputeError::InvalidDimensions(width, height));
    }
    if pixels.len() as u64 != count {
        return Err(ComputeError::BufferSizeMismatch {
            expected: count as usize,
            actual: pixels.len(),
        });
    }
    Ok(count as u32)
}

impl<D: ComputeDevice> FilterSession<D> {
    /// Compiles the kernels and uploads `pixels` as the first input.
    pub fn new(device: D, source: &KernelSource, pixels: &[Pixel], width: u32, height: u32) -> ComputeResult<Self> {
        validate_dimensions(pixels, width, height)?;
        let context = DeviceContext::initialize(device, source)?;
        let names = KernelNameTable::build();

        let dev = context.device();
        let bytes: &[u8] = bytemuck::cast_slice(pixels);
        let buffers = PingPong::allocate(dev, bytes.len())?;
        buffers.upload(dev, bytes)?;

        let gaussian = GaussianMask::new();
        let mask = dev.create_buffer(GaussianMask::size_bytes(), BufferAccess::ReadOnly)?;
        dev.write_buffer(&mask, gaussian.as_bytes())?;

        tracing::debug!(width, height, device = dev.name(), "filter session ready");
        Ok(Self {
            context,
            names,
            buffers,
            mask,
            width,
            height,
            dispatches: 0,
        })
    }

    /// Loads the kernel source from `path`, then behaves like [`new`](Self::new).
    ///
    /// A missing file fails before any device memory is allocated.
    pub fn open(device: D, path: impl AsRef<Path>, pixels: &[Pixel], width: u32, height: u32) -> ComputeResult<Self> {
        let source = KernelSource::load(path)?;
        Self::new(device, &source, pixels, width, height)
    }

    /// Runs `filter` on the current input and writes the result to `pixels`.
    pub fn dispatch(&mut self, filter: FilterId, pixels: &mut [Pixel]) -> ComputeResult<DispatchStats> {
        let count = self.pixel_count();
        if pixels.len() != count as usize {
            return Err(ComputeError::BufferSizeMismatch {
                expected: count as usize,
                actual: pixels.len(),
            });
        }

        let start = Instant::now();
        let entry_point = self.names.entry_point(filter);
        tracing::trace!(%filter, entry_point, "dispatch");

        let device = self.context.device();
        let kernel = device.create_kernel(self.context.program(), entry_point)?;
        let (args, global) = bind_arguments(filter, &self.buffers, &self.mask, self.width, count);
        let local = device.work_group_size(&kernel)?;
        device.enqueue(&kernel, &args, global, local)?;
        device.finish()?;
        self.buffers.download(device, bytemuck::cast_slice_mut(pixels))?;

        let stats = DispatchStats {
            filter,
            entry_point: entry_point.to_string(),
            global_size: global,
            local_size: local,
            elapsed: start.elapsed(),
        };
        self.buffers.swap_roles();
        self.dispatches += 1;
        tracing::info!("{stats}");
        Ok(stats)
    }

    /// Releases the program, the device, the kernel names and both buffers,
    /// in that order.
    pub fn close(self) {
        let Self {
            context,
            names,
            buffers,
            mask,
            dispatches,
            ..
        } = self;
        context.release();
        let freed = names.release();
        buffers.release();
        drop(mask);
        tracing::debug!(dispatches, freed, "filter session closed");
    }

    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn device_name(&self) -> &str {
        self.context.device().name()
    }

    /// Ping-pong slot currently holding the input role.
    pub fn input_slot(&self) -> usize {
        self.buffers.input_slot()
    }
}
