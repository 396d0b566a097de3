//! Instance negotiation and creation.
//!
//! The factory enumerates what the driver offers, decides what to turn
//! on (validation layer, one debug extension, one validation-config
//! extension), builds the creation-info chain and creates the instance.
//! Nothing is enabled speculatively: every name handed to the driver
//! came out of a preceding enumeration.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::vk;
use tracing::{debug, info};

use crate::chain::{FeatureNode, LayerSetting, LayerSettingValue, LayerSettingsNode, StructChain};
use crate::debug;
use crate::enumerate::{enumerate, ExtensionDescriptor, LayerDescriptor};
use crate::error::{BootstrapError, Result};
use crate::loader::{DriverLibrary, GlobalCommands, InstanceCommands};
use crate::version::ApiVersion;

/// The Khronos validation layer, enabled whenever the driver offers it.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Application identity advertised to the driver at instance creation.
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub application_name: CString,
    pub application_version: ApiVersion,
    pub engine_name: CString,
    pub engine_version: ApiVersion,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            application_name: c"vkprobe".to_owned(),
            application_version: ApiVersion::new(0, 1, 0),
            engine_name: c"vkprobe".to_owned(),
            engine_version: ApiVersion::new(0, 1, 0),
        }
    }
}

/// Everything the driver advertised before instance creation: loader
/// API version, instance layers, and instance extensions (unscoped ones
/// merged with those scoped to the validation layer).
#[derive(Debug, Clone, Default)]
pub struct InstanceCapabilities {
    pub api_version: ApiVersion,
    pub layers: Vec<LayerDescriptor>,
    pub extensions: Vec<ExtensionDescriptor>,
}

impl InstanceCapabilities {
    pub fn has_layer(&self, name: &CStr) -> bool {
        self.layers.iter().any(|l| l.name.as_bytes() == name.to_bytes())
    }

    pub fn has_extension(&self, name: &CStr) -> bool {
        self.extensions
            .iter()
            .any(|e| e.name.as_bytes() == name.to_bytes())
    }
}

/// The negotiated result: which layer and extension names get enabled.
/// Every member was present in a preceding enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnabledFeatures {
    pub layers: Vec<&'static CStr>,
    pub extensions: Vec<&'static CStr>,
}

impl EnabledFeatures {
    pub fn contains_extension(&self, name: &CStr) -> bool {
        self.extensions.iter().any(|n| *n == name)
    }
}

/// Decide what to enable from an advertised capability set.
///
/// At most one debug-reporting extension (debug-utils preferred over the
/// legacy debug-report) and at most one validation-configuration
/// extension (layer-settings preferred over validation-features) are
/// chosen. Deterministic: the same capabilities always negotiate the
/// same result.
pub fn negotiate(caps: &InstanceCapabilities) -> EnabledFeatures {
    let mut enabled = EnabledFeatures::default();

    if caps.has_layer(VALIDATION_LAYER) {
        enabled.layers.push(VALIDATION_LAYER);
    }

    if caps.has_extension(ash::ext::debug_utils::NAME) {
        enabled.extensions.push(ash::ext::debug_utils::NAME);
    } else if caps.has_extension(ash::ext::debug_report::NAME) {
        enabled.extensions.push(ash::ext::debug_report::NAME);
    }

    if caps.has_extension(ash::ext::layer_settings::NAME) {
        enabled.extensions.push(ash::ext::layer_settings::NAME);
    } else if caps.has_extension(ash::ext::validation_features::NAME) {
        enabled.extensions.push(ash::ext::validation_features::NAME);
    }

    enabled
}

/// Validation-feature toggles requested through `VK_EXT_validation_features`.
static VALIDATION_FEATURE_TOGGLES: [vk::ValidationFeatureEnableEXT; 4] = [
    vk::ValidationFeatureEnableEXT::GPU_ASSISTED,
    vk::ValidationFeatureEnableEXT::GPU_ASSISTED_RESERVE_BINDING_SLOT,
    vk::ValidationFeatureEnableEXT::SYNCHRONIZATION_VALIDATION,
    vk::ValidationFeatureEnableEXT::BEST_PRACTICES,
];

fn validation_features_info() -> vk::ValidationFeaturesEXT<'static> {
    vk::ValidationFeaturesEXT::default().enabled_validation_features(&VALIDATION_FEATURE_TOGGLES)
}

/// The same toggles expressed as `VK_EXT_layer_settings` settings for
/// the Khronos validation layer.
fn validation_layer_settings() -> LayerSettingsNode {
    LayerSettingsNode::new(&[
        LayerSetting {
            layer: VALIDATION_LAYER,
            name: c"validate_gpu_based",
            value: LayerSettingValue::Str(c"GPU_BASED_GPU_ASSISTED"),
        },
        LayerSetting {
            layer: VALIDATION_LAYER,
            name: c"validate_sync",
            value: LayerSettingValue::Bool(true),
        },
        LayerSetting {
            layer: VALIDATION_LAYER,
            name: c"validate_best_practices",
            value: LayerSettingValue::Bool(true),
        },
    ])
}

fn query_capabilities(global: &GlobalCommands) -> Result<InstanceCapabilities> {
    let api_version = match global.enumerate_instance_version {
        Some(pfn) => {
            let mut raw: u32 = 0;
            let status = unsafe { pfn(&mut raw) };
            if status != vk::Result::SUCCESS {
                return Err(BootstrapError::Status {
                    call: "vkEnumerateInstanceVersion",
                    code: status,
                });
            }
            ApiVersion::from_raw(raw)
        }
        // A 1.0 loader predates the query.
        None => ApiVersion::V1_0,
    };

    let layers: Vec<LayerDescriptor> =
        enumerate("vkEnumerateInstanceLayerProperties", |count, buf| unsafe {
            (global.enumerate_instance_layer_properties)(count, buf)
        })?
        .into_iter()
        .map(LayerDescriptor::from)
        .collect();

    let mut extensions: Vec<ExtensionDescriptor> = Vec::new();
    let mut merge = |found: Vec<vk::ExtensionProperties>| {
        for props in found {
            let desc = ExtensionDescriptor::from(props);
            if !extensions.iter().any(|e| e.name == desc.name) {
                extensions.push(desc);
            }
        }
    };

    if layers
        .iter()
        .any(|l| l.name.as_bytes() == VALIDATION_LAYER.to_bytes())
    {
        // Extensions the validation layer itself provides are a
        // separate, layer-scoped query.
        merge(enumerate(
            "vkEnumerateInstanceExtensionProperties",
            |count, buf| unsafe {
                (global.enumerate_instance_extension_properties)(
                    VALIDATION_LAYER.as_ptr(),
                    count,
                    buf,
                )
            },
        )?);
    }

    merge(enumerate(
        "vkEnumerateInstanceExtensionProperties",
        |count, buf| unsafe {
            (global.enumerate_instance_extension_properties)(std::ptr::null(), count, buf)
        },
    )?);

    Ok(InstanceCapabilities {
        api_version,
        layers,
        extensions,
    })
}

fn create_instance(
    global: &GlobalCommands,
    app: &AppInfo,
    caps: &InstanceCapabilities,
    enabled: &EnabledFeatures,
) -> Result<vk::Instance> {
    let app_info = vk::ApplicationInfo::default()
        .application_name(app.application_name.as_c_str())
        .application_version(app.application_version.as_raw())
        .engine_name(app.engine_name.as_c_str())
        .engine_version(app.engine_version.as_raw())
        .api_version(caps.api_version.as_raw());

    let layer_ptrs: Vec<*const c_char> = enabled.layers.iter().map(|n| n.as_ptr()).collect();
    let extension_ptrs: Vec<*const c_char> =
        enabled.extensions.iter().map(|n| n.as_ptr()).collect();

    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_ptrs)
        .enabled_extension_names(&extension_ptrs);

    let mut chain = StructChain::default();
    if enabled.contains_extension(ash::ext::debug_utils::NAME) {
        chain.push(FeatureNode::DebugUtilsMessenger(Box::new(
            debug::messenger_create_info(),
        )));
    }
    if enabled.contains_extension(ash::ext::debug_report::NAME) {
        chain.push(FeatureNode::DebugReportCallback(Box::new(
            debug::report_create_info(),
        )));
    }
    if enabled.contains_extension(ash::ext::layer_settings::NAME) {
        chain.push(FeatureNode::LayerSettings(validation_layer_settings()));
    }
    if enabled.contains_extension(ash::ext::validation_features::NAME) {
        chain.push(FeatureNode::ValidationFeatures(Box::new(
            validation_features_info(),
        )));
    }

    let mut instance = vk::Instance::null();
    let status = unsafe {
        chain.attach((&mut create_info as *mut vk::InstanceCreateInfo<'_>).cast());
        (global.create_instance)(&create_info, std::ptr::null(), &mut instance)
    };
    // INCOMPLETE is an enumeration status; from a creation call it is a
    // failure like any other.
    if status != vk::Result::SUCCESS {
        return Err(BootstrapError::Status {
            call: "vkCreateInstance",
            code: status,
        });
    }
    Ok(instance)
}

/// A bootstrapped connection to the driver: the loaded library, the
/// created instance and its dispatch table. Dropping the context
/// destroys the instance first; the library mapping is released last.
pub struct VulkanContext {
    pub(crate) instance: vk::Instance,
    pub(crate) commands: InstanceCommands,
    capabilities: InstanceCapabilities,
    enabled: EnabledFeatures,
    driver: DriverLibrary,
}

impl VulkanContext {
    /// Run the whole negotiation: load the driver, discover
    /// capabilities, create the instance, resolve its dispatch table.
    pub fn bootstrap(app: &AppInfo) -> Result<Self> {
        let driver = DriverLibrary::load()?;
        let global = GlobalCommands::load(&driver)?;

        let capabilities = query_capabilities(&global)?;
        info!(
            "driver offers api {}, {} layer(s), {} extension(s)",
            capabilities.api_version,
            capabilities.layers.len(),
            capabilities.extensions.len(),
        );

        let enabled = negotiate(&capabilities);
        debug!(
            "negotiated {} layer(s), {} extension(s)",
            enabled.layers.len(),
            enabled.extensions.len(),
        );

        let instance = create_instance(&global, app, &capabilities, &enabled)?;

        let commands = match InstanceCommands::load(&driver, instance) {
            Ok(commands) => commands,
            Err(e) => {
                // The instance is unusable without its dispatch table,
                // but it still has to be destroyed exactly once.
                if let Some(f) = driver.resolve(instance, c"vkDestroyInstance") {
                    let destroy: vk::PFN_vkDestroyInstance = unsafe { std::mem::transmute(f) };
                    unsafe { destroy(instance, std::ptr::null()) };
                }
                return Err(e);
            }
        };
        info!("created vulkan instance");

        Ok(Self {
            instance,
            commands,
            capabilities,
            enabled,
            driver,
        })
    }

    pub fn capabilities(&self) -> &InstanceCapabilities {
        &self.capabilities
    }

    pub fn enabled_features(&self) -> &EnabledFeatures {
        &self.enabled
    }

    pub fn driver(&self) -> &DriverLibrary {
        &self.driver
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        debug!("destroying vulkan instance");
        unsafe { (self.commands.destroy_instance)(self.instance, std::ptr::null()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(layers: &[&str], extensions: &[&str]) -> InstanceCapabilities {
        InstanceCapabilities {
            api_version: ApiVersion::new(1, 3, 0),
            layers: layers
                .iter()
                .map(|name| LayerDescriptor {
                    name: (*name).to_string(),
                    spec_version: ApiVersion::new(1, 3, 0),
                    implementation_version: 1,
                    description: String::new(),
                })
                .collect(),
            extensions: extensions
                .iter()
                .map(|name| ExtensionDescriptor {
                    name: (*name).to_string(),
                    spec_version: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn negotiation_is_idempotent() {
        let caps = caps(
            &["VK_LAYER_KHRONOS_validation"],
            &["VK_EXT_debug_utils", "VK_EXT_validation_features"],
        );
        let first = negotiate(&caps);
        let second = negotiate(&caps);
        assert_eq!(first, second);
    }

    #[test]
    fn messenger_extension_wins_over_report() {
        let caps = caps(&[], &["VK_EXT_debug_report", "VK_EXT_debug_utils"]);
        let enabled = negotiate(&caps);
        assert!(enabled.contains_extension(ash::ext::debug_utils::NAME));
        assert!(!enabled.contains_extension(ash::ext::debug_report::NAME));
    }

    #[test]
    fn report_extension_is_the_fallback() {
        let caps = caps(&[], &["VK_EXT_debug_report"]);
        let enabled = negotiate(&caps);
        assert!(enabled.contains_extension(ash::ext::debug_report::NAME));
    }

    #[test]
    fn layer_settings_wins_over_validation_features() {
        let caps = caps(
            &[],
            &["VK_EXT_validation_features", "VK_EXT_layer_settings"],
        );
        let enabled = negotiate(&caps);
        assert!(enabled.contains_extension(ash::ext::layer_settings::NAME));
        assert!(!enabled.contains_extension(ash::ext::validation_features::NAME));
    }

    #[test]
    fn validation_layer_enabled_only_when_present() {
        let with = negotiate(&caps(&["VK_LAYER_KHRONOS_validation"], &[]));
        assert_eq!(with.layers, vec![VALIDATION_LAYER]);

        let without = negotiate(&caps(&["VK_LAYER_LUNARG_api_dump"], &[]));
        assert!(without.layers.is_empty());
    }

    #[test]
    fn nothing_is_enabled_speculatively() {
        let enabled = negotiate(&caps(&[], &[]));
        assert!(enabled.layers.is_empty());
        assert!(enabled.extensions.is_empty());
    }

    #[test]
    fn layer_settings_node_carries_the_validation_toggles() {
        let node = validation_layer_settings();
        assert_eq!(node.setting_count(), 3);
    }
}
