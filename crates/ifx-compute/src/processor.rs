//! Backend-erased filter processor.
//!
//! ```ignore
//! use ifx_compute::{Backend, FilterProcessor, KernelSource};
//!
//! let mut proc = FilterProcessor::new(Backend::Auto, &KernelSource::load_default()?, &image)?;
//! proc.apply(FilterId::Invert, &mut image)?;
//! ```

use ifx_core::{FilterId, HostImage};

use crate::backend::{Backend, ComputeDevice, CpuDevice};
use crate::context::KernelSource;
use crate::session::{DispatchStats, FilterSession};
use crate::{ComputeError, ComputeResult};

/// Object-safe view of a [`FilterSession`].
pub trait FilterPipeline: Send {
    /// Runs one filter, writing the result into `pixels`.
    fn dispatch(&mut self, filter: FilterId, pixels: &mut [ifx_core::Pixel]) -> ComputeResult<DispatchStats>;

    /// Name of the device the session runs on.
    fn device_name(&self) -> &str;

    /// `(width, height)` the session was created for.
    fn dimensions(&self) -> (u32, u32);

    /// Dispatches completed so far.
    fn dispatch_count(&self) -> u64;

    /// Releases all device resources in teardown order.
    fn close(self: Box<Self>);
}

impl<D: ComputeDevice + 'static> FilterPipeline for FilterSession<D> {
    fn dispatch(&mut self, filter: FilterId, pixels: &mut [ifx_core::Pixel]) -> ComputeResult<DispatchStats> {
        FilterSession::dispatch(self, filter, pixels)
    }

    fn device_name(&self) -> &str {
        FilterSession::device_name(self)
    }

    fn dimensions(&self) -> (u32, u32) {
        FilterSession::dimensions(self)
    }

    fn dispatch_count(&self) -> u64 {
        FilterSession::dispatch_count(self)
    }

    fn close(self: Box<Self>) {
        FilterSession::close(*self)
    }
}

/// Filter processor over whichever backend was selected.
pub struct FilterProcessor {
    pipeline: Box<dyn FilterPipeline>,
    backend: Backend,
}

impl FilterProcessor {
    /// Opens a session for `image` on `backend` (`Auto` resolves to the best
    /// available).
    pub fn new(backend: Backend, source: &KernelSource, image: &HostImage) -> ComputeResult<Self> {
        let backend = backend.resolve();
        if !backend.is_available() {
            return Err(ComputeError::BackendNotAvailable(backend.name().into()));
        }
        let (width, height) = image.dimensions();
        let pixels = image.pixels();

        let pipeline: Box<dyn FilterPipeline> = match backend {
            #[cfg(feature = "wgpu")]
            Backend::Wgpu => {
                let device = crate::backend::WgpuDevice::new()?;
                Box::new(FilterSession::new(device, source, pixels, width, height)?)
            }
            _ => Box::new(FilterSession::new(CpuDevice::new(), source, pixels, width, height)?),
        };
        tracing::info!(backend = backend.name(), device = pipeline.device_name(), "filter processor ready");
        Ok(Self { pipeline, backend })
    }

    /// Applies `filter` to `image` in place.
    pub fn apply(&mut self, filter: FilterId, image: &mut HostImage) -> ComputeResult<DispatchStats> {
        if image.dimensions() != self.pipeline.dimensions() {
            let (w, h) = self.pipeline.dimensions();
            return Err(ComputeError::BufferSizeMismatch {
                expected: (w * h) as usize,
                actual: image.pixel_count(),
            });
        }
        self.pipeline.dispatch(filter, image.pixels_mut())
    }

    /// Applies each filter in order, stopping at the first error.
    pub fn apply_sequence(&mut self, filters: &[FilterId], image: &mut HostImage) -> ComputeResult<Vec<DispatchStats>> {
        filters.iter().map(|f| self.apply(*f, image)).collect()
    }

    /// Resolved backend name.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn device_name(&self) -> &str {
        self.pipeline.device_name()
    }

    pub fn dispatch_count(&self) -> u64 {
        self.pipeline.dispatch_count()
    }

    /// Releases device resources.
    pub fn close(self) {
        self.pipeline.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifx_core::Pixel;

    #[test]
    fn cpu_processor_applies_sequence() {
        let mut img = HostImage::filled(3, 3, Pixel::rgb(10, 20, 30)).unwrap();
        let mut proc = FilterProcessor::new(Backend::Cpu, &KernelSource::embedded(), &img).unwrap();
        assert_eq!(proc.backend_name(), "cpu");

        let stats = proc
            .apply_sequence(&[FilterId::Invert, FilterId::Invert], &mut img)
            .unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(proc.dispatch_count(), 2);
        assert_eq!(img.get(1, 1), Some(Pixel::rgb(10, 20, 30)));
        proc.close();
    }

    #[test]
    fn rejects_other_image_sizes() {
        let img = HostImage::filled(2, 2, Pixel::BLACK).unwrap();
        let mut proc = FilterProcessor::new(Backend::Cpu, &KernelSource::embedded(), &img).unwrap();
        let mut other = HostImage::filled(3, 2, Pixel::BLACK).unwrap();
        assert!(proc.apply(FilterId::Gray, &mut other).is_err());
    }
}
