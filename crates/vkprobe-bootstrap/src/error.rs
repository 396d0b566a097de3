use ash::vk;

/// Bootstrap failure taxonomy. Every stage surfaces its own variant; no
/// partial recovery is attempted above the bounded enumeration retry.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("vulkan driver library not found: {0}")]
    DriverNotFound(#[source] libloading::Error),

    #[error("driver is missing mandatory entry point {name:?}")]
    MissingEntryPoint { name: &'static std::ffi::CStr },

    #[error("{call} did not stabilize after {attempts} attempts")]
    EnumerationUnstable { call: &'static str, attempts: u32 },

    #[error("{call} failed: {code:?}")]
    Status { call: &'static str, code: vk::Result },

    #[error("no vulkan physical devices present")]
    NoPhysicalDevice,

    #[error("no discrete or integrated gpu available")]
    NoSuitableDevice,

    #[error("no queue family supports both compute and transfer")]
    NoSuitableQueueFamily,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
