//! Dynamic resolution of the native Vulkan driver's entry points.
//!
//! The loader library exports exactly one symbol we rely on,
//! `vkGetInstanceProcAddr`; every other command is resolved through it.
//! Instance-level commands must go through the bootstrap symbol rather
//! than direct dynamic lookup because the loader hands out trampolines
//! for them, not exported symbols.

use std::ffi::CStr;

use ash::vk;
use libloading::Library;
use tracing::debug;

use crate::error::{BootstrapError, Result};

/// The loaded native driver library plus the bootstrap symbol resolved
/// from it. Keeps the library mapped for its own lifetime; anything
/// resolved through it is only valid while this value is alive.
pub struct DriverLibrary {
    get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    // Held only to keep the mapping alive until drop.
    _lib: Library,
}

impl DriverLibrary {
    /// Load the platform Vulkan loader library and resolve the bootstrap
    /// entry point.
    pub fn load() -> Result<Self> {
        let names = vkprobe_common::platform::driver_library_names();
        let mut last_err = None;
        for name in names {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    debug!("loaded vulkan driver library {}", name);
                    return Self::from_library(lib);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(BootstrapError::DriverNotFound(
            last_err.expect("at least one candidate driver library name"),
        ))
    }

    fn from_library(lib: Library) -> Result<Self> {
        let get_instance_proc_addr = unsafe {
            lib.get::<vk::PFN_vkGetInstanceProcAddr>(b"vkGetInstanceProcAddr\0")
                .map(|sym| *sym)
                .map_err(|_| BootstrapError::MissingEntryPoint {
                    name: c"vkGetInstanceProcAddr",
                })?
        };
        Ok(Self {
            get_instance_proc_addr,
            _lib: lib,
        })
    }

    /// Resolve a command through the bootstrap symbol. A null instance
    /// yields library-level commands; a live instance yields that
    /// instance's trampolines.
    pub fn resolve(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { (self.get_instance_proc_addr)(instance, name.as_ptr()) }
    }
}

/// Resolve a mandatory entry point and cast it to its typed signature.
macro_rules! load_pfn {
    ($driver:expr, $instance:expr, $pfn:ty, $name:literal) => {
        match $driver.resolve($instance, $name) {
            Some(f) => unsafe { std::mem::transmute::<unsafe extern "system" fn(), $pfn>(f) },
            None => return Err(BootstrapError::MissingEntryPoint { name: $name }),
        }
    };
}

/// Resolve an optional entry point; absence is not an error.
macro_rules! load_pfn_opt {
    ($driver:expr, $instance:expr, $pfn:ty, $name:literal) => {
        $driver
            .resolve($instance, $name)
            .map(|f| unsafe { std::mem::transmute::<unsafe extern "system" fn(), $pfn>(f) })
    };
}

/// Library-level dispatch table: the commands callable before an
/// instance exists. Built once, immutable afterwards.
pub struct GlobalCommands {
    /// Absent on Vulkan 1.0 loaders; callers fall back to 1.0.
    pub enumerate_instance_version: Option<vk::PFN_vkEnumerateInstanceVersion>,
    pub enumerate_instance_layer_properties: vk::PFN_vkEnumerateInstanceLayerProperties,
    pub enumerate_instance_extension_properties: vk::PFN_vkEnumerateInstanceExtensionProperties,
    pub create_instance: vk::PFN_vkCreateInstance,
}

impl GlobalCommands {
    pub fn load(driver: &DriverLibrary) -> Result<Self> {
        let null = vk::Instance::null();
        Ok(Self {
            enumerate_instance_version: load_pfn_opt!(
                driver,
                null,
                vk::PFN_vkEnumerateInstanceVersion,
                c"vkEnumerateInstanceVersion"
            ),
            enumerate_instance_layer_properties: load_pfn!(
                driver,
                null,
                vk::PFN_vkEnumerateInstanceLayerProperties,
                c"vkEnumerateInstanceLayerProperties"
            ),
            enumerate_instance_extension_properties: load_pfn!(
                driver,
                null,
                vk::PFN_vkEnumerateInstanceExtensionProperties,
                c"vkEnumerateInstanceExtensionProperties"
            ),
            create_instance: load_pfn!(
                driver,
                null,
                vk::PFN_vkCreateInstance,
                c"vkCreateInstance"
            ),
        })
    }
}

/// Instance-level dispatch table, resolved through the bootstrap symbol
/// against a live instance. The instance handle is useless without it.
pub struct InstanceCommands {
    pub destroy_instance: vk::PFN_vkDestroyInstance,
    pub enumerate_physical_devices: vk::PFN_vkEnumeratePhysicalDevices,
    pub get_physical_device_properties: vk::PFN_vkGetPhysicalDeviceProperties,
    pub get_physical_device_queue_family_properties:
        vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
    pub enumerate_device_extension_properties: vk::PFN_vkEnumerateDeviceExtensionProperties,
    pub enumerate_device_layer_properties: vk::PFN_vkEnumerateDeviceLayerProperties,
}

impl InstanceCommands {
    pub fn load(driver: &DriverLibrary, instance: vk::Instance) -> Result<Self> {
        Ok(Self {
            destroy_instance: load_pfn!(
                driver,
                instance,
                vk::PFN_vkDestroyInstance,
                c"vkDestroyInstance"
            ),
            enumerate_physical_devices: load_pfn!(
                driver,
                instance,
                vk::PFN_vkEnumeratePhysicalDevices,
                c"vkEnumeratePhysicalDevices"
            ),
            get_physical_device_properties: load_pfn!(
                driver,
                instance,
                vk::PFN_vkGetPhysicalDeviceProperties,
                c"vkGetPhysicalDeviceProperties"
            ),
            get_physical_device_queue_family_properties: load_pfn!(
                driver,
                instance,
                vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
                c"vkGetPhysicalDeviceQueueFamilyProperties"
            ),
            enumerate_device_extension_properties: load_pfn!(
                driver,
                instance,
                vk::PFN_vkEnumerateDeviceExtensionProperties,
                c"vkEnumerateDeviceExtensionProperties"
            ),
            enumerate_device_layer_properties: load_pfn!(
                driver,
                instance,
                vk::PFN_vkEnumerateDeviceLayerProperties,
                c"vkEnumerateDeviceLayerProperties"
            ),
        })
    }
}
