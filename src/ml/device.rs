// ============================================================
// Layer 5 - Device Selection
// ============================================================
// GPUs are probed once at startup and turned into a DevicePlan
// that is passed explicitly to everything that allocates
// tensors. Nothing reads a global "current device".
//
// device_policy (config):
//   auto → GPU when one is visible, otherwise CPU with a warning
//   cpu  → always the NdArray CPU backend
//   gpu  → GPU or fail
//
// `--device 0,2` narrows the visible GPUs to those adapter
// indices. `n_gpu` > 1 asks for data-parallel replication over
// that many of the visible GPUs.

use serde::{Deserialize, Serialize};

use crate::domain::error::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePolicy {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuKind {
    Discrete,
    Integrated,
    Virtual,
}

/// A GPU adapter seen by the probe. `ordinal` counts adapters of the
/// same kind, which is how the wgpu backend addresses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuAdapter {
    pub index:   usize,
    pub name:    String,
    pub kind:    GpuKind,
    pub ordinal: usize,
}

impl std::fmt::Display for GpuAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            GpuKind::Discrete   => "discrete",
            GpuKind::Integrated => "integrated",
            GpuKind::Virtual    => "virtual",
        };
        write!(f, "[{}] {} ({kind})", self.index, self.name)
    }
}

/// Where the run executes. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePlan {
    Cpu,
    /// First adapter is the primary device; more than one means replication.
    Gpu(Vec<GpuAdapter>),
}

impl DevicePlan {
    pub fn describe(&self) -> String {
        match self {
            Self::Cpu => "cpu".to_string(),
            Self::Gpu(adapters) => adapters
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Enumerate non-CPU adapters on the platform's primary graphics APIs.
#[cfg(feature = "wgpu")]
pub fn probe_gpus() -> Vec<GpuAdapter> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let mut counts = [0usize; 3];
    let mut gpus = Vec::new();
    for (index, adapter) in instance.enumerate_adapters(wgpu::Backends::PRIMARY).into_iter().enumerate() {
        let info = adapter.get_info();
        let (kind, slot) = match info.device_type {
            wgpu::DeviceType::DiscreteGpu   => (GpuKind::Discrete, 0),
            wgpu::DeviceType::IntegratedGpu => (GpuKind::Integrated, 1),
            wgpu::DeviceType::VirtualGpu    => (GpuKind::Virtual, 2),
            wgpu::DeviceType::Cpu | wgpu::DeviceType::Other => continue,
        };
        gpus.push(GpuAdapter { index, name: info.name, kind, ordinal: counts[slot] });
        counts[slot] += 1;
    }
    tracing::debug!("Probed {} GPU adapter(s)", gpus.len());
    gpus
}

#[cfg(not(feature = "wgpu"))]
pub fn probe_gpus() -> Vec<GpuAdapter> {
    Vec::new()
}

#[cfg(feature = "wgpu")]
impl GpuAdapter {
    pub fn wgpu_device(&self) -> burn::backend::wgpu::WgpuDevice {
        use burn::backend::wgpu::WgpuDevice;
        match self.kind {
            GpuKind::Discrete   => WgpuDevice::DiscreteGpu(self.ordinal),
            GpuKind::Integrated => WgpuDevice::IntegratedGpu(self.ordinal),
            GpuKind::Virtual    => WgpuDevice::VirtualGpu(self.ordinal),
        }
    }
}

/// Decide the devices for this run from the policy, the requested
/// replica count, an optional `--device` list and the probed adapters.
pub fn prepare_device(
    policy:    DevicePolicy,
    n_gpu:     usize,
    requested: Option<&[usize]>,
    available: Vec<GpuAdapter>,
) -> Result<DevicePlan, DeviceError> {
    if policy == DevicePolicy::Cpu {
        return Ok(DevicePlan::Cpu);
    }
    if policy == DevicePolicy::Gpu && !cfg!(feature = "wgpu") {
        return Err(DeviceError::GpuSupportDisabled);
    }

    let visible: Vec<GpuAdapter> = match requested {
        None => available,
        Some(ids) => ids
            .iter()
            .filter_map(|&id| {
                let found = available.iter().find(|a| a.index == id).cloned();
                if found.is_none() {
                    tracing::warn!("GPU index {id} requested with --device is not available, ignoring it");
                }
                found
            })
            .collect(),
    };

    if visible.is_empty() {
        return match policy {
            DevicePolicy::Gpu => Err(DeviceError::NoGpu),
            _ => {
                tracing::warn!("No GPU available, evaluating on the CPU");
                Ok(DevicePlan::Cpu)
            }
        };
    }

    let wanted = n_gpu.max(1);
    if wanted > visible.len() {
        tracing::warn!(
            "n_gpu is {wanted} but only {} GPU(s) are visible, using those",
            visible.len()
        );
    }
    Ok(DevicePlan::Gpu(visible.into_iter().take(wanted).collect()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn gpus(n: usize) -> Vec<GpuAdapter> {
        (0..n)
            .map(|i| GpuAdapter { index: i, name: format!("gpu{i}"), kind: GpuKind::Discrete, ordinal: i })
            .collect()
    }

    #[test]
    fn test_cpu_policy_ignores_gpus() {
        let plan = prepare_device(DevicePolicy::Cpu, 2, None, gpus(2)).unwrap();
        assert_eq!(plan, DevicePlan::Cpu);
    }

    #[test]
    fn test_auto_falls_back_to_cpu() {
        let plan = prepare_device(DevicePolicy::Auto, 1, None, Vec::new()).unwrap();
        assert_eq!(plan, DevicePlan::Cpu);
    }

    #[test]
    fn test_gpu_policy_without_gpu_fails() {
        assert!(prepare_device(DevicePolicy::Gpu, 1, None, Vec::new()).is_err());
    }

    #[test]
    fn test_single_gpu_by_default() {
        let plan = prepare_device(DevicePolicy::Auto, 1, None, gpus(3)).unwrap();
        assert_eq!(plan, DevicePlan::Gpu(gpus(1)));
    }

    #[test]
    fn test_n_gpu_replicas_capped_by_visible() {
        match prepare_device(DevicePolicy::Auto, 4, None, gpus(2)).unwrap() {
            DevicePlan::Gpu(adapters) => assert_eq!(adapters.len(), 2),
            DevicePlan::Cpu => panic!("expected GPUs"),
        }
    }

    #[test]
    fn test_device_list_narrows_visible() {
        let plan = prepare_device(DevicePolicy::Auto, 2, Some(&[2, 7, 0]), gpus(3)).unwrap();
        match plan {
            DevicePlan::Gpu(adapters) => {
                let ids: Vec<usize> = adapters.iter().map(|a| a.index).collect();
                assert_eq!(ids, vec![2, 0]);
            }
            DevicePlan::Cpu => panic!("expected GPUs"),
        }
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let p: DevicePolicy = serde_json::from_str("\"gpu\"").unwrap();
        assert_eq!(p, DevicePolicy::Gpu);
    }
}
