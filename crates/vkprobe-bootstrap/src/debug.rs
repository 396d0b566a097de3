//! Native debug callbacks.
//!
//! The driver may invoke these from its own threads, including while the
//! bootstrap thread is still inside `vkCreateInstance`, so they are
//! statically defined, reentrant, touch no shared mutable state, and do
//! nothing but emit a diagnostic. Both always return `VK_FALSE`, the
//! "do not abort the call" sentinel.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

use ash::vk;
use tracing::{debug, error, info, warn};

/// `VK_EXT_debug_utils` messenger callback.
pub unsafe extern "system" fn debug_utils_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = unsafe {
        p_callback_data
            .as_ref()
            .filter(|data| !data.p_message.is_null())
            .map(|data| CStr::from_ptr(data.p_message).to_string_lossy())
    }
    .unwrap_or(Cow::Borrowed("<no message>"));

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(types = ?message_types, "vulkan: {}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(types = ?message_types, "vulkan: {}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        info!(types = ?message_types, "vulkan: {}", message);
    } else {
        debug!(types = ?message_types, "vulkan: {}", message);
    }

    vk::FALSE
}

/// `VK_EXT_debug_report` callback, the legacy fallback.
pub unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    _object_type: vk::DebugReportObjectTypeEXT,
    _object: u64,
    _location: usize,
    _message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        unsafe { CStr::from_ptr(p_message) }.to_string_lossy()
    };
    let prefix = if p_layer_prefix.is_null() {
        Cow::Borrowed("?")
    } else {
        unsafe { CStr::from_ptr(p_layer_prefix) }.to_string_lossy()
    };

    if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
        error!("vulkan[{}]: {}", prefix, message);
    } else if flags
        .intersects(vk::DebugReportFlagsEXT::WARNING | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING)
    {
        warn!("vulkan[{}]: {}", prefix, message);
    } else {
        debug!("vulkan[{}]: {}", prefix, message);
    }

    vk::FALSE
}

/// Messenger descriptor with every severity and type bit set, bound to
/// the static callback above.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_utils_callback))
}

/// Report descriptor with every report flag set, bound to the static
/// callback above.
pub fn report_create_info() -> vk::DebugReportCallbackCreateInfoEXT<'static> {
    vk::DebugReportCallbackCreateInfoEXT::default()
        .flags(
            vk::DebugReportFlagsEXT::INFORMATION
                | vk::DebugReportFlagsEXT::WARNING
                | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING
                | vk::DebugReportFlagsEXT::ERROR
                | vk::DebugReportFlagsEXT::DEBUG,
        )
        .pfn_callback(Some(debug_report_callback))
}
