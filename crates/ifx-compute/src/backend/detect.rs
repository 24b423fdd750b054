//! Backend discovery.
//!
//! Each concrete backend reports the devices it can open. A backend with no
//! devices is unavailable; [`Backend::Auto`] takes the first available one
//! in preference order.

use super::{Backend, ComputeDevice, CpuDevice, PlatformInfo};

/// Concrete backends, most preferred first.
const PREFERENCE: [Backend; 2] = [Backend::Wgpu, Backend::Cpu];

/// A backend and the devices it can see.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: Backend,
    /// Empty when the backend is missing or compiled out.
    pub devices: Vec<PlatformInfo>,
}

impl BackendInfo {
    pub fn available(&self) -> bool {
        !self.devices.is_empty()
    }
}

fn devices(backend: Backend) -> Vec<PlatformInfo> {
    match backend {
        #[cfg(feature = "wgpu")]
        Backend::Wgpu => super::WgpuDevice::adapters(),
        Backend::Cpu => CpuDevice::new().platforms().to_vec(),
        _ => Vec::new(),
    }
}

/// Every concrete backend with its devices, in preference order.
pub fn detect_backends() -> Vec<BackendInfo> {
    PREFERENCE
        .into_iter()
        .map(|backend| BackendInfo {
            backend,
            devices: devices(backend),
        })
        .collect()
}

/// First available backend; the CPU backend is always present.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .find(BackendInfo::available)
        .map(|info| info.backend)
        .unwrap_or(Backend::Cpu)
}

/// One line per backend, followed by its devices.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let mark = if info.available() { '+' } else { '-' };
        desc.push_str(&format!("[{mark}] {}\n", info.backend));
        for device in &info.devices {
            desc.push_str(&format!("      {device}\n"));
        }
    }
    desc
}
