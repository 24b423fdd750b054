//! Command implementations.

#[cfg(feature = "viewer")]
pub mod view;
pub mod apply;
pub mod backends;

use anyhow::{Context, Result};
use ifx_compute::{Backend, ComputeError, FilterProcessor, KernelSource};
use ifx_core::HostImage;
use ifx_io::IoError;
use std::path::Path;

/// Load an image, with the path in the error context.
pub fn load_image(path: &Path) -> Result<HostImage> {
    ifx_io::load_image(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save an image, with the path in the error context.
pub fn save_image(path: &Path, image: &HostImage) -> Result<()> {
    ifx_io::save_image(path, image).with_context(|| format!("Failed to save: {}", path.display()))
}

/// Reads the kernel source and opens a filter session sized for `image`.
pub fn open_processor(backend: Backend, kernels: Option<&Path>, image: &HostImage) -> Result<FilterProcessor> {
    let source = match kernels {
        Some(path) => KernelSource::load(path)?,
        None => KernelSource::load_default()?,
    };
    if let Some(origin) = source.origin() {
        tracing::debug!("kernel source: {}", origin.display());
    }
    let processor = FilterProcessor::new(backend, &source, image)?;
    tracing::info!(
        "Using {} backend on {}",
        processor.backend_name(),
        processor.device_name()
    );
    Ok(processor)
}

/// Stable code for the first typed error in the chain.
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<ComputeError>() {
                Some(e.code())
            } else {
                cause.downcast_ref::<IoError>().map(IoError::code)
            }
        })
        .unwrap_or("error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_survive_context() {
        let err = anyhow::Error::new(ComputeError::NoDevice).context("opening session");
        assert_eq!(error_code(&err), "no_device");

        let err = load_image(Path::new("/nonexistent/nature.jpg")).unwrap_err();
        assert_eq!(error_code(&err), "io");

        assert_eq!(error_code(&anyhow::anyhow!("plain")), "error");
    }

    #[test]
    fn missing_kernels_fail_before_device_work() {
        let image = HostImage::filled(2, 2, ifx_core::Pixel::BLACK).unwrap();
        let err = open_processor(Backend::Cpu, Some(Path::new("/nonexistent/filters.wgsl")), &image).err().unwrap();
        assert_eq!(error_code(&err), "source_missing");
    }
}
