//! CPU backend using rayon for parallelization.
//!
//! Building a program scans the kernel source for `@compute` entry points;
//! each one resolves to a native routine that applies the same per-pixel
//! math as the WGSL kernel. Work-items run in rayon tasks, one task per
//! work-group.

use std::sync::RwLock;

use ifx_core::{FilterId, Pixel};
use rayon::prelude::*;

use super::device::{BufferAccess, ComputeDevice, DeviceBuffer, DeviceKind, KernelArg, PlatformInfo};
use super::{check_buffer_size, check_transfer_len};
use crate::mask::{MASK_RADIUS, MASK_SIZE};
use crate::registry;
use crate::{ComputeError, ComputeResult};

/// Work-group size reported for every CPU kernel.
pub const CPU_WORK_GROUP_SIZE: u32 = 256;

// =============================================================================
// Handles
// =============================================================================

/// Host memory standing in for a device buffer. Stored as words so the
/// contents can be viewed as `f32` or `Pixel` without realignment.
pub struct CpuBuffer {
    words: RwLock<Vec<u32>>,
    size_bytes: u64,
    access: BufferAccess,
}

impl DeviceBuffer for CpuBuffer {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

impl std::fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBuffer")
            .field("size_bytes", &self.size_bytes)
            .field("access", &self.access)
            .finish()
    }
}

/// Entry points found in the kernel source.
#[derive(Debug, Clone)]
pub struct CpuProgram {
    entry_points: Vec<String>,
}

impl CpuProgram {
    /// Entry point names in source order.
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }
}

/// A resolved entry point.
#[derive(Debug, Clone)]
pub struct CpuKernel {
    name: String,
    filter: FilterId,
}

impl CpuKernel {
    /// Entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// CpuDevice
// =============================================================================

/// Host execution device.
pub struct CpuDevice {
    name: String,
    platforms: Vec<PlatformInfo>,
    work_group_size: u32,
}

impl CpuDevice {
    /// Create the host device. Always succeeds.
    pub fn new() -> Self {
        let name = format!("host ({} threads)", rayon::current_num_threads());
        let platforms = vec![PlatformInfo {
            name: name.clone(),
            platform: "rayon".into(),
            kind: DeviceKind::Cpu,
        }];
        Self {
            name,
            platforms,
            work_group_size: CPU_WORK_GROUP_SIZE,
        }
    }

    /// Override the work-group size reported to the dispatcher.
    pub fn with_work_group_size(mut self, size: u32) -> Self {
        self.work_group_size = size.max(1);
        self
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for CpuDevice {
    type Buffer = CpuBuffer;
    type Program = CpuProgram;
    type Kernel = CpuKernel;

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn platforms(&self) -> &[PlatformInfo] {
        &self.platforms
    }

    fn build_program(&self, source: &str) -> ComputeResult<CpuProgram> {
        check_braces(source)?;
        let entry_points = scan_entry_points(source);
        if entry_points.is_empty() {
            return Err(ComputeError::build_failed("no @compute entry points in kernel source"));
        }
        tracing::debug!(count = entry_points.len(), "cpu program built");
        Ok(CpuProgram { entry_points })
    }

    fn create_kernel(&self, program: &CpuProgram, entry_point: &str) -> ComputeResult<CpuKernel> {
        if !program.entry_points.iter().any(|e| e == entry_point) {
            return Err(ComputeError::KernelNotFound(entry_point.to_string()));
        }
        let filter = registry::filter_for_entry_point(entry_point).ok_or_else(|| {
            ComputeError::KernelNotFound(format!("{entry_point} (no host implementation)"))
        })?;
        Ok(CpuKernel {
            name: entry_point.to_string(),
            filter,
        })
    }

    fn create_buffer(&self, size_bytes: u64, access: BufferAccess) -> ComputeResult<CpuBuffer> {
        check_buffer_size(size_bytes)?;
        let words = usize::try_from(size_bytes / 4)
            .map_err(|_| ComputeError::BufferCreation(format!("{size_bytes} bytes exceeds address space")))?;
        Ok(CpuBuffer {
            words: RwLock::new(vec![0; words]),
            size_bytes,
            access,
        })
    }

    fn write_buffer(&self, buffer: &CpuBuffer, data: &[u8]) -> ComputeResult<()> {
        check_transfer_len(buffer.size_bytes, data.len())?;
        let mut words = buffer
            .words
            .write()
            .map_err(|_| ComputeError::Transfer("buffer lock poisoned".into()))?;
        bytemuck::cast_slice_mut::<u32, u8>(&mut words).copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, buffer: &CpuBuffer, out: &mut [u8]) -> ComputeResult<()> {
        check_transfer_len(buffer.size_bytes, out.len())?;
        let words = buffer
            .words
            .read()
            .map_err(|_| ComputeError::Transfer("buffer lock poisoned".into()))?;
        out.copy_from_slice(bytemuck::cast_slice::<u32, u8>(&words));
        Ok(())
    }

    fn work_group_size(&self, _kernel: &CpuKernel) -> ComputeResult<u32> {
        Ok(self.work_group_size)
    }

    fn enqueue(
        &self,
        kernel: &CpuKernel,
        args: &[KernelArg<'_, CpuBuffer>],
        global: u32,
        local: u32,
    ) -> ComputeResult<()> {
        if local == 0 {
            return Err(ComputeError::Enqueue("work-group size is zero".into()));
        }
        if kernel.filter.is_standard() {
            run_standard(kernel, args, global as usize, local as usize)
        } else {
            run_blur(kernel, args, global as usize, local as usize)
        }
    }

    fn finish(&self) -> ComputeResult<()> {
        // Work runs to completion inside enqueue.
        Ok(())
    }
}

// =============================================================================
// Argument checks
// =============================================================================

fn bind_error(kernel: &CpuKernel, index: usize, reason: impl Into<String>) -> ComputeError {
    ComputeError::ArgumentBind {
        kernel: kernel.name.clone(),
        index,
        reason: reason.into(),
    }
}

fn arg_buffer<'a>(kernel: &CpuKernel, args: &[KernelArg<'a, CpuBuffer>], index: usize) -> ComputeResult<&'a CpuBuffer> {
    match args.get(index) {
        Some(KernelArg::Buffer(b)) => Ok(*b),
        Some(_) => Err(bind_error(kernel, index, "expected a buffer")),
        None => Err(bind_error(kernel, index, "missing argument")),
    }
}

fn arg_u32(kernel: &CpuKernel, args: &[KernelArg<'_, CpuBuffer>], index: usize) -> ComputeResult<u32> {
    match args.get(index) {
        Some(KernelArg::U32(v)) => Ok(*v),
        Some(_) => Err(bind_error(kernel, index, "expected a u32 scalar")),
        None => Err(bind_error(kernel, index, "missing argument")),
    }
}

fn check_arity(kernel: &CpuKernel, args: &[KernelArg<'_, CpuBuffer>], expected: usize) -> ComputeResult<()> {
    if args.len() != expected {
        return Err(bind_error(
            kernel,
            args.len().min(expected),
            format!("expected {expected} arguments, got {}", args.len()),
        ));
    }
    Ok(())
}

fn check_output(kernel: &CpuKernel, index: usize, src: &CpuBuffer, dst: &CpuBuffer) -> ComputeResult<()> {
    if std::ptr::eq(src, dst) {
        return Err(bind_error(kernel, index, "output aliases another argument"));
    }
    if dst.access != BufferAccess::ReadWrite {
        return Err(bind_error(kernel, index, "output buffer is read-only"));
    }
    Ok(())
}

fn poisoned<T>(_: T) -> ComputeError {
    ComputeError::Enqueue("buffer lock poisoned".into())
}

// =============================================================================
// Routines
// =============================================================================

/// `(input, output, count)`
fn run_standard(kernel: &CpuKernel, args: &[KernelArg<'_, CpuBuffer>], global: usize, local: usize) -> ComputeResult<()> {
    check_arity(kernel, args, 3)?;
    let src_buf = arg_buffer(kernel, args, 0)?;
    let dst_buf = arg_buffer(kernel, args, 1)?;
    let count = arg_u32(kernel, args, 2)? as usize;
    check_output(kernel, 1, src_buf, dst_buf)?;

    let src = src_buf.words.read().map_err(poisoned)?;
    let mut dst = dst_buf.words.write().map_err(poisoned)?;
    let src_px: &[Pixel] = bytemuck::cast_slice(&src);
    let dst_px: &mut [Pixel] = bytemuck::cast_slice_mut(&mut dst);

    if count > src_px.len() || count > dst_px.len() {
        return Err(bind_error(kernel, 2, format!("count {count} exceeds buffer capacity")));
    }

    // Work-items past `count` are inactive, like the guard in the kernel.
    let active = global.min(count);
    let filter = kernel.filter;
    dst_px[..active]
        .par_chunks_mut(local)
        .enumerate()
        .for_each(|(group, items)| {
            let base = group * local;
            for (lid, out) in items.iter_mut().enumerate() {
                *out = shade(filter, src_px[base + lid]);
            }
        });
    Ok(())
}

/// `(input, output, mask, scratch, width, count)` where `count` is in
/// channel items, four per pixel.
fn run_blur(kernel: &CpuKernel, args: &[KernelArg<'_, CpuBuffer>], global: usize, local: usize) -> ComputeResult<()> {
    check_arity(kernel, args, 6)?;
    let src_buf = arg_buffer(kernel, args, 0)?;
    let dst_buf = arg_buffer(kernel, args, 1)?;
    let mask_buf = arg_buffer(kernel, args, 2)?;
    if !matches!(args[3], KernelArg::Local(_)) {
        return Err(bind_error(kernel, 3, "expected a local scratch slot"));
    }
    let width = arg_u32(kernel, args, 4)? as usize;
    let count = arg_u32(kernel, args, 5)? as usize;
    check_output(kernel, 1, src_buf, dst_buf)?;
    check_output(kernel, 1, mask_buf, dst_buf)?;

    let src = src_buf.words.read().map_err(poisoned)?;
    let mask_words = mask_buf.words.read().map_err(poisoned)?;
    let mut dst = dst_buf.words.write().map_err(poisoned)?;
    let src_bytes: &[u8] = bytemuck::cast_slice(&src);
    let dst_bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut dst);
    let mask: &[f32] = bytemuck::cast_slice(&mask_words);

    if mask.len() < MASK_SIZE * MASK_SIZE {
        return Err(bind_error(kernel, 2, format!("mask holds {} weights", mask.len())));
    }
    if count > src_bytes.len() || count > dst_bytes.len() || count % 4 != 0 {
        return Err(bind_error(kernel, 5, format!("count {count} does not fit the buffers")));
    }
    let pixels = count / 4;
    if width == 0 || pixels % width != 0 {
        return Err(bind_error(kernel, 4, format!("width {width} does not divide {pixels} pixels")));
    }
    let height = pixels / width;

    let active = global.min(count);
    dst_bytes[..active]
        .par_chunks_mut(local)
        .enumerate()
        .for_each(|(group, items)| {
            let base = group * local;
            for (lid, out) in items.iter_mut().enumerate() {
                *out = blur_item(src_bytes, mask, width, height, base + lid);
            }
        });
    Ok(())
}

// =============================================================================
// Per-pixel math (kept in step with kernels/filters.wgsl)
// =============================================================================

const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

#[inline]
fn to_u8(v: f32) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma(p: Pixel) -> f32 {
    0.299 * p.red as f32 + 0.587 * p.green as f32 + 0.114 * p.blue as f32
}

fn shade(filter: FilterId, p: Pixel) -> Pixel {
    let (r, g, b) = (p.red as f32, p.green as f32, p.blue as f32);
    match filter {
        FilterId::Invert => Pixel::new(255 - p.red, 255 - p.green, 255 - p.blue, p.alpha),
        FilterId::Gray => {
            let l = to_u8(luma(p));
            Pixel::new(l, l, l, p.alpha)
        }
        FilterId::GrayToBinary => {
            let v = if to_u8(luma(p)) >= 128 { 255 } else { 0 };
            Pixel::new(v, v, v, p.alpha)
        }
        FilterId::Acos => {
            let curve = |c: f32| to_u8((c / 255.0).clamp(0.0, 1.0).acos() / HALF_PI * 255.0);
            Pixel::new(curve(r), curve(g), curve(b), p.alpha)
        }
        FilterId::Sepia => Pixel::new(
            to_u8(0.393 * r + 0.769 * g + 0.189 * b),
            to_u8(0.349 * r + 0.686 * g + 0.168 * b),
            to_u8(0.272 * r + 0.534 * g + 0.131 * b),
            p.alpha,
        ),
        FilterId::RedChannel => Pixel::new(p.red, 0, 0, p.alpha),
        FilterId::GreenChannel => Pixel::new(0, p.green, 0, p.alpha),
        FilterId::BlueChannel => Pixel::new(0, 0, p.blue, p.alpha),
        // Dispatched through run_blur.
        FilterId::GaussianBlur => p,
    }
}

/// One channel of one pixel, clamping reads to the image edge.
fn blur_item(src: &[u8], mask: &[f32], width: usize, height: usize, item: usize) -> u8 {
    let pixel = item / 4;
    let channel = item % 4;
    let x = (pixel % width) as isize;
    let y = (pixel / width) as isize;
    let r = MASK_RADIUS as isize;

    let mut acc = 0.0f32;
    for my in 0..MASK_SIZE {
        let sy = (y + my as isize - r).clamp(0, height as isize - 1) as usize;
        for mx in 0..MASK_SIZE {
            let sx = (x + mx as isize - r).clamp(0, width as isize - 1) as usize;
            acc += mask[my * MASK_SIZE + mx] * src[(sy * width + sx) * 4 + channel] as f32;
        }
    }
    to_u8(acc)
}

// =============================================================================
// Source scanning
// =============================================================================

/// Names of functions marked `@compute`, in source order.
fn scan_entry_points(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut pending = false;
    for line in source.lines() {
        let code = line.split("//").next().unwrap_or("").trim();
        if code.contains("@compute") {
            pending = true;
        }
        if !pending {
            continue;
        }
        if let Some(name) = fn_name(code) {
            names.push(name.to_string());
            pending = false;
        }
    }
    names
}

fn fn_name(code: &str) -> Option<&str> {
    let mut rest = code;
    while let Some(pos) = rest.find("fn ") {
        let at_boundary = pos == 0 || !rest.as_bytes()[pos - 1].is_ascii_alphanumeric();
        let tail = &rest[pos + 3..];
        if at_boundary {
            let end = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            let name = tail[..end].trim();
            if !name.is_empty() {
                return Some(name);
            }
        }
        rest = tail;
    }
    None
}

fn check_braces(source: &str) -> ComputeResult<()> {
    let mut depth = 0i64;
    for (n, line) in source.lines().enumerate() {
        let code = line.split("//").next().unwrap_or("");
        for c in code.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(ComputeError::build_failed(format!("line {}: unmatched '}}'", n + 1)));
            }
        }
    }
    if depth != 0 {
        return Err(ComputeError::build_failed(format!("{depth} unclosed '{{' at end of source")));
    }
    Ok(())
}
