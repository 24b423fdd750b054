//! Device context: selected device plus the compiled kernel program.

use std::path::{Path, PathBuf};

use crate::backend::{ComputeDevice, DeviceKind, PlatformInfo};
use crate::{ComputeError, ComputeResult};

/// Kernel source location relative to the working directory.
pub const DEFAULT_KERNEL_PATH: &str = "kernels/filters.wgsl";

/// Environment variable overriding [`DEFAULT_KERNEL_PATH`].
pub const KERNEL_PATH_ENV: &str = "IFX_KERNEL_PATH";

/// Picks the first GPU, otherwise the first CPU device.
pub fn select_device(platforms: &[PlatformInfo]) -> Option<usize> {
    platforms
        .iter()
        .position(|p| p.kind == DeviceKind::Gpu)
        .or_else(|| platforms.iter().position(|p| p.kind == DeviceKind::Cpu))
}

/// Kernel program text and where it came from.
#[derive(Debug, Clone)]
pub struct KernelSource {
    origin: Option<PathBuf>,
    text: String,
}

impl KernelSource {
    /// Reads the kernel file at `path`.
    pub fn load(path: impl AsRef<Path>) -> ComputeResult<Self> {
        let path = path.as_ref();
        tracing::trace!("loading kernel source from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ComputeError::SourceMissing {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            origin: Some(path.to_path_buf()),
            text,
        })
    }

    /// Reads from `$IFX_KERNEL_PATH`, or [`DEFAULT_KERNEL_PATH`] when unset.
    pub fn load_default() -> ComputeResult<Self> {
        match std::env::var_os(KERNEL_PATH_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Self::load(DEFAULT_KERNEL_PATH),
        }
    }

    /// Wraps in-memory source text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            origin: None,
            text: text.into(),
        }
    }

    /// The filter kernels compiled into this crate.
    pub fn embedded() -> Self {
        Self::from_text(include_str!("../../../kernels/filters.wgsl"))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File the source was read from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

/// An initialized device with its compiled program.
///
/// Fields drop in declaration order: the program is released before the
/// device, which in turn releases its queue, context and platform list.
pub struct DeviceContext<D: ComputeDevice> {
    program: D::Program,
    device: D,
}

impl<D: ComputeDevice> DeviceContext<D> {
    /// Compiles `source` for `device`.
    pub fn initialize(device: D, source: &KernelSource) -> ComputeResult<Self> {
        tracing::info!(
            "Found {} platform(s), using {} ({:?})",
            device.platforms().len(),
            device.name(),
            device.kind()
        );
        let program = device.build_program(source.text()).inspect_err(|e| {
            if let ComputeError::BuildFailed { log } = e {
                tracing::error!("Failed to build program executable:\n{log}");
            }
        })?;
        tracing::debug!("program built");
        Ok(Self { program, device })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn program(&self) -> &D::Program {
        &self.program
    }

    /// Releases the program, then the device.
    pub fn release(self) {
        let Self { program, device } = self;
        drop(program);
        tracing::debug!("program released");
        let name = device.name().to_string();
        drop(device);
        tracing::debug!("device {name} released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuDevice;

    fn info(kind: DeviceKind) -> PlatformInfo {
        PlatformInfo {
            name: format!("{kind:?}"),
            platform: "test".into(),
            kind,
        }
    }

    #[test]
    fn gpu_preferred_over_cpu() {
        let list = [info(DeviceKind::Cpu), info(DeviceKind::Other), info(DeviceKind::Gpu)];
        assert_eq!(select_device(&list), Some(2));
    }

    #[test]
    fn cpu_when_no_gpu() {
        let list = [info(DeviceKind::Other), info(DeviceKind::Cpu)];
        assert_eq!(select_device(&list), Some(1));
        assert_eq!(select_device(&[info(DeviceKind::Other)]), None);
        assert_eq!(select_device(&[]), None);
    }

    #[test]
    fn missing_source_reports_path() {
        let err = KernelSource::load("/nonexistent/filters.wgsl").unwrap_err();
        assert_eq!(err.code(), "source_missing");
        assert!(err.to_string().contains("/nonexistent/filters.wgsl"));
    }

    #[test]
    fn origin_tracks_the_file_read() {
        assert!(KernelSource::embedded().origin().is_none());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filters.wgsl");
        std::fs::write(&path, KernelSource::embedded().text()).unwrap();
        assert_eq!(KernelSource::load(&path).unwrap().origin(), Some(path.as_path()));
    }

    #[test]
    fn embedded_source_builds_on_cpu() {
        let ctx = DeviceContext::initialize(CpuDevice::new(), &KernelSource::embedded()).unwrap();
        assert_eq!(ctx.program().entry_points().len(), ifx_core::FILTER_COUNT);
        ctx.release();
    }
}
