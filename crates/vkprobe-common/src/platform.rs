/// Candidate file names for the native Vulkan loader library, tried in order.
pub fn driver_library_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["vulkan-1.dll"]
    }
    #[cfg(target_os = "macos")]
    {
        &["libvulkan.dylib", "libvulkan.1.dylib", "libMoltenVK.dylib"]
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        &["libvulkan.so.1", "libvulkan.so"]
    }
}

/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    { "windows" }
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    { "unknown" }
}
