//! Vulkan instance and device bootstrap negotiation.
//!
//! Loads the native Vulkan driver at runtime, resolves its entry points
//! through `vkGetInstanceProcAddr`, discovers layers and extensions via
//! the count-then-fill protocol, negotiates which optional features to
//! enable, creates an instance with the matching creation-info chain,
//! and selects a physical device plus a compute+transfer queue family.
//! The bootstrap ends there: no surfaces, no logical devices, no
//! command submission.

pub mod chain;
pub mod debug;
pub mod device;
pub mod enumerate;
pub mod error;
pub mod instance;
pub mod loader;
pub mod version;

pub use device::{pick_device, pick_queue_family, DeviceProfile, DeviceSelection, QueueFamily};
pub use enumerate::{enumerate, ExtensionDescriptor, LayerDescriptor, MAX_ENUMERATION_ATTEMPTS};
pub use error::{BootstrapError, Result};
pub use instance::{
    negotiate, AppInfo, EnabledFeatures, InstanceCapabilities, VulkanContext, VALIDATION_LAYER,
};
pub use loader::{DriverLibrary, GlobalCommands, InstanceCommands};
pub use version::ApiVersion;
