//! Extension struct chains for creation-info structures.
//!
//! Vulkan creation calls accept optional feature blocks through a single
//! `pNext` field: every block starts with the same two-field header (a
//! structure-type tag and a forward link), so the driver walks them as a
//! singly linked list. Nodes are built here as tagged variants owning
//! their payloads and are only flattened to the raw header shape at the
//! FFI boundary.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};

use ash::vk;

/// Append `node` at the tail of the chain rooted at `root`.
///
/// The tail is found by traversal, so repeated appends preserve
/// insertion order and never overwrite a link that is already set.
///
/// # Safety
/// `root` and `node` must point to live structures that start with the
/// `VkBaseInStructure` header, and `node`'s own link must be null.
pub unsafe fn append_node<'a>(
    root: *mut vk::BaseInStructure<'a>,
    node: *mut vk::BaseInStructure<'a>,
) {
    unsafe {
        debug_assert!((*node).p_next.is_null(), "chain node is already linked");
        let mut tail = root;
        while !(*tail).p_next.is_null() {
            tail = (*tail).p_next.cast_mut();
        }
        (*tail).p_next = node;
    }
}

/// Walk the chain hanging off `root` and collect the structure-type tag
/// of every node, in link order. The root itself is not included.
///
/// # Safety
/// `root` must point to a live structure starting with the
/// `VkBaseInStructure` header whose chain links are valid.
pub unsafe fn chain_types(root: *const vk::BaseInStructure<'_>) -> Vec<vk::StructureType> {
    let mut types = Vec::new();
    let mut node = unsafe { (*root).p_next };
    while !node.is_null() {
        unsafe {
            types.push((*node).s_type);
            node = (*node).p_next;
        }
    }
    types
}

/// One optional feature block, in its typed form. The raw header layout
/// only appears when a node is linked onto a chain.
pub enum FeatureNode {
    DebugUtilsMessenger(Box<vk::DebugUtilsMessengerCreateInfoEXT<'static>>),
    DebugReportCallback(Box<vk::DebugReportCallbackCreateInfoEXT<'static>>),
    ValidationFeatures(Box<vk::ValidationFeaturesEXT<'static>>),
    LayerSettings(LayerSettingsNode),
}

impl FeatureNode {
    pub fn structure_type(&self) -> vk::StructureType {
        match self {
            Self::DebugUtilsMessenger(info) => info.s_type,
            Self::DebugReportCallback(info) => info.s_type,
            Self::ValidationFeatures(info) => info.s_type,
            Self::LayerSettings(node) => node.info.s_type,
        }
    }

    fn as_base_mut(&mut self) -> *mut vk::BaseInStructure<'static> {
        match self {
            Self::DebugUtilsMessenger(info) => {
                (&mut **info as *mut vk::DebugUtilsMessengerCreateInfoEXT<'static>).cast()
            }
            Self::DebugReportCallback(info) => {
                (&mut **info as *mut vk::DebugReportCallbackCreateInfoEXT<'static>).cast()
            }
            Self::ValidationFeatures(info) => {
                (&mut **info as *mut vk::ValidationFeaturesEXT<'static>).cast()
            }
            Self::LayerSettings(node) => {
                (&mut *node.info as *mut vk::LayerSettingsCreateInfoEXT<'static>).cast()
            }
        }
    }
}

/// The feature blocks selected for one creation call. Payloads are
/// heap-allocated, so pushing more nodes never moves one that has
/// already been built.
#[derive(Default)]
pub struct StructChain {
    nodes: Vec<FeatureNode>,
}

impl StructChain {
    pub fn push(&mut self, node: FeatureNode) {
        self.nodes.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Link every node onto `root` in insertion order. Call once, after
    /// the last push; the chain must stay alive until the creation call
    /// that consumes `root` has returned.
    ///
    /// # Safety
    /// `root` must point to a live structure starting with the
    /// `VkBaseInStructure` header.
    pub unsafe fn attach(&mut self, root: *mut vk::BaseInStructure<'static>) {
        for node in &mut self.nodes {
            unsafe { append_node(root, node.as_base_mut()) };
        }
    }
}

/// A configuration value for a single layer setting.
pub enum LayerSettingValue {
    Bool(bool),
    Str(&'static CStr),
}

/// One layer setting, in its typed form.
pub struct LayerSetting {
    pub layer: &'static CStr,
    pub name: &'static CStr,
    pub value: LayerSettingValue,
}

/// Owns the storage behind a `VkLayerSettingsCreateInfoEXT`: the native
/// struct points into the boxed slices, which stay put for the node's
/// lifetime.
pub struct LayerSettingsNode {
    _bool_values: Box<[vk::Bool32]>,
    _string_values: Box<[*const c_char]>,
    _settings: Box<[vk::LayerSettingEXT<'static>]>,
    info: Box<vk::LayerSettingsCreateInfoEXT<'static>>,
}

impl LayerSettingsNode {
    pub fn new(settings: &[LayerSetting]) -> Self {
        let bool_values: Box<[vk::Bool32]> = settings
            .iter()
            .filter_map(|s| match s.value {
                LayerSettingValue::Bool(v) => Some(if v { vk::TRUE } else { vk::FALSE }),
                LayerSettingValue::Str(_) => None,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let string_values: Box<[*const c_char]> = settings
            .iter()
            .filter_map(|s| match s.value {
                LayerSettingValue::Str(v) => Some(v.as_ptr()),
                LayerSettingValue::Bool(_) => None,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let mut next_bool = 0;
        let mut next_string = 0;
        let raw_settings: Box<[vk::LayerSettingEXT<'static>]> = settings
            .iter()
            .map(|s| {
                let mut raw = vk::LayerSettingEXT::default();
                raw.p_layer_name = s.layer.as_ptr();
                raw.p_setting_name = s.name.as_ptr();
                raw.value_count = 1;
                match s.value {
                    LayerSettingValue::Bool(_) => {
                        raw.ty = vk::LayerSettingTypeEXT::BOOL32;
                        raw.p_values =
                            (&bool_values[next_bool] as *const vk::Bool32).cast::<c_void>();
                        next_bool += 1;
                    }
                    LayerSettingValue::Str(_) => {
                        raw.ty = vk::LayerSettingTypeEXT::STRING;
                        raw.p_values =
                            (&string_values[next_string] as *const *const c_char).cast::<c_void>();
                        next_string += 1;
                    }
                }
                raw
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let mut info = Box::new(vk::LayerSettingsCreateInfoEXT::default());
        info.setting_count = raw_settings.len() as u32;
        info.p_settings = raw_settings.as_ptr();

        Self {
            _bool_values: bool_values,
            _string_values: string_values,
            _settings: raw_settings,
            info,
        }
    }

    pub fn setting_count(&self) -> u32 {
        self.info.setting_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_ptr(info: &mut vk::InstanceCreateInfo<'static>) -> *mut vk::BaseInStructure<'static> {
        (info as *mut vk::InstanceCreateInfo<'static>).cast()
    }

    #[test]
    fn traversal_order_equals_insertion_order() {
        let mut root = vk::InstanceCreateInfo::default();
        let mut chain = StructChain::default();
        chain.push(FeatureNode::DebugUtilsMessenger(Box::default()));
        chain.push(FeatureNode::ValidationFeatures(Box::default()));
        chain.push(FeatureNode::DebugReportCallback(Box::default()));

        unsafe { chain.attach(root_ptr(&mut root)) };

        let types = unsafe { chain_types(root_ptr(&mut root)) };
        assert_eq!(
            types,
            vec![
                vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
                vk::StructureType::VALIDATION_FEATURES_EXT,
                vk::StructureType::DEBUG_REPORT_CALLBACK_CREATE_INFO_EXT,
            ]
        );
    }

    #[test]
    fn appending_never_overwrites_existing_links() {
        let mut root = vk::InstanceCreateInfo::default();
        let mut a = vk::DebugUtilsMessengerCreateInfoEXT::default();
        let mut b = vk::ValidationFeaturesEXT::default();
        let mut c = vk::DebugReportCallbackCreateInfoEXT::default();

        let root_base = root_ptr(&mut root);
        let a_base = (&mut a as *mut vk::DebugUtilsMessengerCreateInfoEXT<'_>)
            .cast::<vk::BaseInStructure<'_>>();
        let b_base =
            (&mut b as *mut vk::ValidationFeaturesEXT<'_>).cast::<vk::BaseInStructure<'_>>();
        let c_base = (&mut c as *mut vk::DebugReportCallbackCreateInfoEXT<'_>)
            .cast::<vk::BaseInStructure<'_>>();

        unsafe {
            append_node(root_base, a_base);
            append_node(root_base, b_base);
            assert_eq!(root.p_next, a_base.cast_const().cast());
            assert_eq!(a.p_next, b_base.cast_const().cast());

            append_node(root_base, c_base);
            assert_eq!(root.p_next, a_base.cast_const().cast());
            assert_eq!(a.p_next, b_base.cast_const().cast());
            assert_eq!(b.p_next, c_base.cast_const().cast());
            assert!(c.p_next.is_null());
        }
    }

    #[test]
    fn empty_chain_leaves_root_unlinked() {
        let mut root = vk::InstanceCreateInfo::default();
        let mut chain = StructChain::default();
        assert!(chain.is_empty());
        unsafe { chain.attach(root_ptr(&mut root)) };
        assert!(root.p_next.is_null());
    }

    #[test]
    fn layer_settings_node_owns_its_storage() {
        let node = LayerSettingsNode::new(&[
            LayerSetting {
                layer: c"VK_LAYER_KHRONOS_validation",
                name: c"validate_sync",
                value: LayerSettingValue::Bool(true),
            },
            LayerSetting {
                layer: c"VK_LAYER_KHRONOS_validation",
                name: c"validate_gpu_based",
                value: LayerSettingValue::Str(c"GPU_BASED_GPU_ASSISTED"),
            },
        ]);
        assert_eq!(node.setting_count(), 2);
        assert!(!node.info.p_settings.is_null());
        let first = unsafe { *node.info.p_settings };
        assert_eq!(first.ty, vk::LayerSettingTypeEXT::BOOL32);
        assert_eq!(first.value_count, 1);
        let enabled = unsafe { *first.p_values.cast::<vk::Bool32>() };
        assert_eq!(enabled, vk::TRUE);
    }
}
