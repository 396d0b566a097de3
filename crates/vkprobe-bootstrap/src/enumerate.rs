//! Generic "count, then fill" enumeration.
//!
//! Vulkan reports variable-length result sets through a two-call
//! protocol: a null buffer yields the element count, a second call fills
//! a buffer of that size. The set can grow between the calls (a layer
//! gets installed, a device is hotplugged), which the driver signals
//! with `VK_INCOMPLETE`; the query is then restarted from the count
//! step. One algorithm serves layers, extensions, physical devices and
//! queue families.

use std::ffi::CStr;

use ash::vk;
use tracing::trace;

use crate::error::{BootstrapError, Result};
use crate::version::ApiVersion;

/// Retry budget for enumeration restarts. A driver that keeps growing
/// its result set past this is reported as unstable rather than looped
/// on forever.
pub const MAX_ENUMERATION_ATTEMPTS: u32 = 8;

/// Run one count-then-fill enumeration to completion.
///
/// `query` receives the in/out count and a buffer pointer (null for the
/// count step) and returns the native status. Queries that return
/// nothing (`vkGetPhysicalDeviceQueueFamilyProperties`) are adapted by a
/// closure that reports `SUCCESS`. A partially filled result is never
/// returned: `VK_INCOMPLETE` from the fill step restarts the protocol.
pub fn enumerate<T, F>(call: &'static str, mut query: F) -> Result<Vec<T>>
where
    T: Copy + Default,
    F: FnMut(&mut u32, *mut T) -> vk::Result,
{
    for attempt in 0..MAX_ENUMERATION_ATTEMPTS {
        let mut count: u32 = 0;
        let status = query(&mut count, std::ptr::null_mut());
        if status != vk::Result::SUCCESS && status != vk::Result::INCOMPLETE {
            return Err(BootstrapError::Status { call, code: status });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut items = vec![T::default(); count as usize];
        let status = query(&mut count, items.as_mut_ptr());
        match status {
            vk::Result::SUCCESS => {
                // The driver may have written fewer items than it first
                // promised; count holds the number actually filled.
                items.truncate(count as usize);
                return Ok(items);
            }
            vk::Result::INCOMPLETE => {
                trace!("{} grew mid-enumeration (attempt {})", call, attempt + 1);
                continue;
            }
            code => return Err(BootstrapError::Status { call, code }),
        }
    }
    Err(BootstrapError::EnumerationUnstable {
        call,
        attempts: MAX_ENUMERATION_ATTEMPTS,
    })
}

/// An instance or device layer as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub name: String,
    pub spec_version: ApiVersion,
    pub implementation_version: u32,
    pub description: String,
}

impl From<vk::LayerProperties> for LayerDescriptor {
    fn from(props: vk::LayerProperties) -> Self {
        Self {
            name: fixed_cstr_to_string(&props.layer_name),
            spec_version: ApiVersion::from_raw(props.spec_version),
            implementation_version: props.implementation_version,
            description: fixed_cstr_to_string(&props.description),
        }
    }
}

/// An instance or device extension as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub spec_version: u32,
}

impl From<vk::ExtensionProperties> for ExtensionDescriptor {
    fn from(props: vk::ExtensionProperties) -> Self {
        Self {
            name: fixed_cstr_to_string(&props.extension_name),
            spec_version: props.spec_version,
        }
    }
}

/// Decode one of Vulkan's fixed-length, null-terminated char arrays.
fn fixed_cstr_to_string(raw: &[std::os::raw::c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
