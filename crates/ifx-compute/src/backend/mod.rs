//! Compute backends for filter dispatch.
//!
//! Provides CPU (rayon) and wgpu backends with automatic selection.
//!
//! # Architecture
//!
//! ```text
//! FilterSession<D: ComputeDevice>
//!     +-- CpuDevice  (rayon work-groups over host memory)
//!     +-- WgpuDevice (Vulkan/Metal/DX12 compute pipelines)
//! ```

mod cpu_backend;
mod detect;
mod device;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use cpu_backend::{CpuBuffer, CpuDevice, CpuKernel, CpuProgram};
pub use detect::{BackendInfo, describe_backends, detect_backends, select_best_backend};
pub use device::{BufferAccess, ComputeDevice, DeviceBuffer, DeviceKind, KernelArg, PlatformInfo};
pub(crate) use device::{check_buffer_size, check_transfer_len};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuBuffer, WgpuDevice, WgpuKernel};

use std::str::FromStr;

/// Environment variable that overrides [`Backend::Auto`] selection.
pub const BACKEND_ENV: &str = "IFX_BACKEND";

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (wgpu > CPU).
    #[default]
    Auto,
    /// CPU backend using rayon for parallelization.
    Cpu,
    /// wgpu backend (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuDevice::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Lowercase backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }

    /// Resolves `Auto` to a concrete backend, honouring [`BACKEND_ENV`].
    pub fn resolve(self) -> Backend {
        match self {
            Self::Auto => {
                if let Some(forced) = std::env::var(BACKEND_ENV)
                    .ok()
                    .and_then(|v| v.parse::<Backend>().ok())
                    .filter(|b| *b != Backend::Auto)
                {
                    tracing::debug!(backend = forced.name(), "backend forced by {BACKEND_ENV}");
                    return forced;
                }
                select_best_backend()
            }
            other => other,
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(format!("unknown backend '{other}' (expected auto, cpu or wgpu)")),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
