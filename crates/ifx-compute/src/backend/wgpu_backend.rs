//! wgpu backend: WGSL compute pipelines on Vulkan/Metal/DX12.
//!
//! Buffer arguments bind to `@binding(0..)` of group 0 in argument order,
//! scalar arguments are packed into the `vec4<u32>` uniform at
//! [`PARAMS_BINDING`] and local scratch slots are ignored (WGSL declares
//! workgroup memory statically). The work-group size is injected through
//! the `WORKGROUP_SIZE` override constant when the pipeline is created.
//! Ranges wider than one grid row are folded into a 2-D grid of work-groups;
//! the kernels linearize the invocation id against `num_workgroups`.

use std::collections::HashMap;
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use super::device::{BufferAccess, ComputeDevice, DeviceBuffer, DeviceKind, KernelArg, PlatformInfo, workgroup_grid};
use super::{check_buffer_size, check_transfer_len};
use crate::{ComputeError, ComputeResult};

/// Binding slot of the scalar parameter uniform.
pub const PARAMS_BINDING: u32 = 3;

/// Upper bound for the preferred work-group size.
const MAX_WORK_GROUP: u32 = 256;

/// Number of scalar slots in the parameter uniform.
const PARAM_SLOTS: usize = 4;

/// Device buffer.
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
    access: BufferAccess,
}

impl DeviceBuffer for WgpuBuffer {
    fn size_bytes(&self) -> u64 {
        self.size
    }
}

/// Compiled shader module.
pub struct WgpuProgram {
    module: wgpu::ShaderModule,
}

/// Compute pipeline for one entry point.
pub struct WgpuKernel {
    name: String,
    pipeline: wgpu::ComputePipeline,
    work_group_size: u32,
}

/// GPU device selected through wgpu adapter enumeration.
///
/// Fields drop top to bottom, so the instance outlives device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    name: String,
    kind: DeviceKind,
    platforms: Vec<PlatformInfo>,
    work_group_size: u32,
    max_workgroups: u32,
    _instance: wgpu::Instance,
}

fn device_kind(t: wgpu::DeviceType) -> DeviceKind {
    match t {
        wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::IntegratedGpu | wgpu::DeviceType::VirtualGpu => {
            DeviceKind::Gpu
        }
        wgpu::DeviceType::Cpu => DeviceKind::Cpu,
        wgpu::DeviceType::Other => DeviceKind::Other,
    }
}

fn platform_info(adapter: &wgpu::Adapter) -> PlatformInfo {
    let info = adapter.get_info();
    PlatformInfo {
        name: info.name,
        platform: format!("{:?}", info.backend),
        kind: device_kind(info.device_type),
    }
}

impl WgpuDevice {
    /// Check if any wgpu adapter is present.
    pub fn is_available() -> bool {
        !Self::adapters().is_empty()
    }

    /// Every adapter wgpu can enumerate.
    pub fn adapters() -> Vec<PlatformInfo> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        instance
            .enumerate_adapters(wgpu::Backends::all())
            .iter()
            .map(platform_info)
            .collect()
    }

    /// Enumerate adapters and open the first GPU, falling back to a CPU
    /// adapter (software rasterizer) when no GPU exists.
    pub fn new() -> ComputeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapters = instance.enumerate_adapters(wgpu::Backends::all());
        if adapters.is_empty() {
            return Err(ComputeError::NoPlatform);
        }

        let platforms: Vec<PlatformInfo> = adapters.iter().map(platform_info).collect();
        for p in &platforms {
            tracing::debug!("wgpu adapter: {p}");
        }

        let index = crate::context::select_device(&platforms).ok_or(ComputeError::NoDevice)?;
        let adapter = adapters
            .into_iter()
            .nth(index)
            .ok_or(ComputeError::NoDevice)?;
        let chosen = platforms[index].clone();
        tracing::info!("wgpu device: {chosen}");

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ifx-compute"),
                required_features: wgpu::Features::empty(),
                required_limits: limits.clone(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|e| ComputeError::DeviceCreation(e.to_string()))?;

        let work_group_size = MAX_WORK_GROUP
            .min(limits.max_compute_invocations_per_workgroup)
            .min(limits.max_compute_workgroup_size_x)
            .max(1);

        Ok(Self {
            device,
            queue,
            name: chosen.name,
            kind: chosen.kind,
            platforms,
            work_group_size,
            max_workgroups: limits.max_compute_workgroups_per_dimension,
            _instance: instance,
        })
    }

    fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }

    /// Runs `f` inside a validation error scope and reports the first error.
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }
}

impl ComputeDevice for WgpuDevice {
    type Buffer = WgpuBuffer;
    type Program = WgpuProgram;
    type Kernel = WgpuKernel;

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn platforms(&self) -> &[PlatformInfo] {
        &self.platforms
    }

    fn build_program(&self, source: &str) -> ComputeResult<WgpuProgram> {
        let (module, error) = self.scoped(|| {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("filters"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::build_failed(e.to_string()));
        }
        Ok(WgpuProgram { module })
    }

    fn create_kernel(&self, program: &WgpuProgram, entry_point: &str) -> ComputeResult<WgpuKernel> {
        let constants = HashMap::from([("WORKGROUP_SIZE".to_string(), self.work_group_size as f64)]);
        let (pipeline, error) = self.scoped(|| {
            self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: None,
                module: &program.module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    zero_initialize_workgroup_memory: true,
                },
                cache: None,
            })
        });
        if let Some(e) = error {
            tracing::debug!("pipeline {entry_point}: {e}");
            return Err(ComputeError::KernelNotFound(entry_point.to_string()));
        }
        Ok(WgpuKernel {
            name: entry_point.to_string(),
            pipeline,
            work_group_size: self.work_group_size,
        })
    }

    fn create_buffer(&self, size_bytes: u64, access: BufferAccess) -> ComputeResult<WgpuBuffer> {
        check_buffer_size(size_bytes)?;
        let (buffer, error) = self.scoped(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: None,
                size: size_bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::BufferCreation(e.to_string()));
        }
        Ok(WgpuBuffer {
            buffer,
            size: size_bytes,
            access,
        })
    }

    fn write_buffer(&self, buffer: &WgpuBuffer, data: &[u8]) -> ComputeResult<()> {
        check_transfer_len(buffer.size, data.len())?;
        self.queue.write_buffer(&buffer.buffer, 0, data);
        self.queue.submit(std::iter::empty());
        self.wait_idle();
        Ok(())
    }

    fn read_buffer(&self, buffer: &WgpuBuffer, out: &mut [u8]) -> ComputeResult<()> {
        check_transfer_len(buffer.size, out.len())?;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: buffer.size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("download"),
        });
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, buffer.size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait_idle();

        rx.recv()
            .map_err(|_| ComputeError::Transfer("map callback never fired".into()))?
            .map_err(|e| ComputeError::Transfer(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(&data);
        }
        staging.unmap();
        Ok(())
    }

    fn work_group_size(&self, kernel: &WgpuKernel) -> ComputeResult<u32> {
        Ok(kernel.work_group_size)
    }

    fn enqueue(
        &self,
        kernel: &WgpuKernel,
        args: &[KernelArg<'_, WgpuBuffer>],
        global: u32,
        local: u32,
    ) -> ComputeResult<()> {
        if local != kernel.work_group_size {
            return Err(ComputeError::Enqueue(format!(
                "{}: local size {local} differs from pipeline size {}",
                kernel.name, kernel.work_group_size
            )));
        }
        let groups = global.div_ceil(local);
        let (groups_x, groups_y) = workgroup_grid(groups, self.max_workgroups).ok_or_else(|| {
            ComputeError::Enqueue(format!(
                "{groups} work-groups exceed device limit {0}x{0}",
                self.max_workgroups
            ))
        })?;

        let mut params = [0u32; PARAM_SLOTS];
        let mut scalars = 0usize;
        let mut buffers: Vec<(u32, &WgpuBuffer)> = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            match arg {
                KernelArg::Buffer(b) => {
                    if index as u32 >= PARAMS_BINDING {
                        return Err(ComputeError::ArgumentBind {
                            kernel: kernel.name.clone(),
                            index,
                            reason: "buffer arguments must precede the parameter slot".into(),
                        });
                    }
                    buffers.push((index as u32, b));
                }
                KernelArg::Local(_) => {}
                KernelArg::U32(v) => {
                    let slot = params.get_mut(scalars).ok_or_else(|| ComputeError::ArgumentBind {
                        kernel: kernel.name.clone(),
                        index,
                        reason: format!("more than {PARAM_SLOTS} scalar arguments"),
                    })?;
                    *slot = *v;
                    scalars += 1;
                }
            }
        }
        // Binding 1 is the kernel output.
        if let Some((_, out)) = buffers.iter().find(|(binding, _)| *binding == 1) {
            if out.access != BufferAccess::ReadWrite {
                return Err(ComputeError::ArgumentBind {
                    kernel: kernel.name.clone(),
                    index: 1,
                    reason: "output buffer is read-only".into(),
                });
            }
        }

        let uniform = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params"),
            contents: bytemuck::cast_slice(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
            .iter()
            .map(|(binding, b)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: b.buffer.as_entire_binding(),
            })
            .collect();
        if scalars > 0 {
            entries.push(wgpu::BindGroupEntry {
                binding: PARAMS_BINDING,
                resource: uniform.as_entire_binding(),
            });
        }

        let (bind_group, error) = self.scoped(|| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.name.as_str()),
                layout: &kernel.pipeline.get_bind_group_layout(0),
                entries: &entries,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::ArgumentBind {
                kernel: kernel.name.clone(),
                index: 0,
                reason: e.to_string(),
            });
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.name.as_str()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.name.as_str()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn finish(&self) -> ComputeResult<()> {
        self.wait_idle();
        Ok(())
    }
}
