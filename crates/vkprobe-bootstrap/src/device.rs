//! Physical device and queue family selection.
//!
//! Two-stage policy: device type first (discrete, then integrated — a
//! throughput preference), queue capability second (the workload needs a
//! family with both compute and transfer, which is a correctness
//! requirement, not a preference).

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info};

use crate::enumerate::{enumerate, ExtensionDescriptor, LayerDescriptor};
use crate::error::{BootstrapError, Result};
use crate::instance::VulkanContext;
use crate::version::ApiVersion;

/// One queue family of a physical device. The index is the position in
/// the driver's enumeration order, not a stable identifier across
/// driver versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamily {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
}

/// Read-only snapshot of one physical device.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: ApiVersion,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub queue_families: Vec<QueueFamily>,
}

/// The outcome of device selection.
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub device_index: usize,
    pub queue_family_index: u32,
    pub profile: DeviceProfile,
}

/// First discrete GPU, else first integrated GPU. Virtual GPUs and CPU
/// software devices are never picked.
pub fn pick_device(profiles: &[DeviceProfile]) -> Result<usize> {
    profiles
        .iter()
        .position(|p| p.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
        .or_else(|| {
            profiles
                .iter()
                .position(|p| p.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU)
        })
        .ok_or(BootstrapError::NoSuitableDevice)
}

/// Among families supporting both compute and transfer, the one with
/// the most queues; ties go to the lowest family index.
pub fn pick_queue_family(families: &[QueueFamily]) -> Result<u32> {
    let required = vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
    let mut best: Option<&QueueFamily> = None;
    for family in families {
        if !family.flags.contains(required) {
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => family.queue_count > current.queue_count,
        };
        if better {
            best = Some(family);
        }
    }
    best.map(|f| f.index)
        .ok_or(BootstrapError::NoSuitableQueueFamily)
}

fn require_devices(devices: Vec<vk::PhysicalDevice>) -> Result<Vec<vk::PhysicalDevice>> {
    if devices.is_empty() {
        return Err(BootstrapError::NoPhysicalDevice);
    }
    Ok(devices)
}

impl VulkanContext {
    /// Enumerate the physical device handles visible to this instance.
    pub fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        enumerate("vkEnumeratePhysicalDevices", |count, buf| unsafe {
            (self.commands.enumerate_physical_devices)(self.instance, count, buf)
        })
    }

    /// Query the selection-relevant properties of one device.
    pub fn device_profile(&self, device: vk::PhysicalDevice) -> Result<DeviceProfile> {
        let mut props = vk::PhysicalDeviceProperties::default();
        unsafe { (self.commands.get_physical_device_properties)(device, &mut props) };

        let families =
            enumerate("vkGetPhysicalDeviceQueueFamilyProperties", |count, buf| {
                unsafe {
                    (self.commands.get_physical_device_queue_family_properties)(
                        device, count, buf,
                    )
                };
                // The query returns nothing; adapt it to the two-call
                // status contract.
                vk::Result::SUCCESS
            })?;

        let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Ok(DeviceProfile {
            name,
            device_type: props.device_type,
            api_version: ApiVersion::from_raw(props.api_version),
            driver_version: props.driver_version,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            queue_families: families
                .iter()
                .enumerate()
                .map(|(index, f)| QueueFamily {
                    index: index as u32,
                    flags: f.queue_flags,
                    queue_count: f.queue_count,
                })
                .collect(),
        })
    }

    /// Extensions offered by one device (unscoped query).
    pub fn device_extensions(
        &self,
        device: vk::PhysicalDevice,
    ) -> Result<Vec<ExtensionDescriptor>> {
        Ok(
            enumerate("vkEnumerateDeviceExtensionProperties", |count, buf| unsafe {
                (self.commands.enumerate_device_extension_properties)(
                    device,
                    std::ptr::null(),
                    count,
                    buf,
                )
            })?
            .into_iter()
            .map(ExtensionDescriptor::from)
            .collect(),
        )
    }

    /// Layers reported by one device (legacy query, kept for reporting).
    pub fn device_layers(&self, device: vk::PhysicalDevice) -> Result<Vec<LayerDescriptor>> {
        Ok(
            enumerate("vkEnumerateDeviceLayerProperties", |count, buf| unsafe {
                (self.commands.enumerate_device_layer_properties)(device, count, buf)
            })?
            .into_iter()
            .map(LayerDescriptor::from)
            .collect(),
        )
    }

    /// Enumerate devices, rank them, and pick a compute+transfer queue
    /// family on the winner. An empty enumeration fails immediately;
    /// nothing further is queried.
    pub fn select_device(&self) -> Result<DeviceSelection> {
        let devices = require_devices(self.physical_devices()?)?;

        let profiles = devices
            .iter()
            .map(|&device| self.device_profile(device))
            .collect::<Result<Vec<_>>>()?;
        for profile in &profiles {
            debug!(
                "candidate {} ({:?}, api {}, {} queue families)",
                profile.name,
                profile.device_type,
                profile.api_version,
                profile.queue_families.len(),
            );
        }

        let device_index = pick_device(&profiles)?;
        let profile = profiles[device_index].clone();
        let queue_family_index = pick_queue_family(&profile.queue_families)?;
        info!(
            "selected {} ({:?}), queue family {}",
            profile.name, profile.device_type, queue_family_index,
        );

        Ok(DeviceSelection {
            physical_device: devices[device_index],
            device_index,
            queue_family_index,
            profile,
        })
    }
}
