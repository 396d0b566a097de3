//! Integration test: negotiation and selection policy
//!
//! Exercises the public bootstrap API against mocked capability sets
//! and device lists — no driver required. The driver-dependent path is
//! covered by running the `vkprobe` binary on a machine with a GPU.

use ash::vk;

use vkprobe_bootstrap::instance::{negotiate, InstanceCapabilities};
use vkprobe_bootstrap::{
    enumerate, pick_device, pick_queue_family, ApiVersion, BootstrapError, DeviceProfile,
    ExtensionDescriptor, LayerDescriptor, QueueFamily,
};

fn capability_set(layers: &[&str], extensions: &[&str]) -> InstanceCapabilities {
    InstanceCapabilities {
        api_version: ApiVersion::new(1, 3, 0),
        layers: layers
            .iter()
            .map(|name| LayerDescriptor {
                name: (*name).to_string(),
                spec_version: ApiVersion::new(1, 3, 0),
                implementation_version: 1,
                description: "test layer".to_string(),
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

fn gpu(device_type: vk::PhysicalDeviceType, queue_counts: &[u32]) -> DeviceProfile {
    DeviceProfile {
        name: format!("test {:?}", device_type),
        device_type,
        api_version: ApiVersion::new(1, 3, 0),
        driver_version: 1,
        vendor_id: 0x8086,
        device_id: 0x4680,
        queue_families: queue_counts
            .iter()
            .enumerate()
            .map(|(index, &queue_count)| QueueFamily {
                index: index as u32,
                flags: vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                queue_count,
            })
            .collect(),
    }
}

#[test]
fn test_full_negotiation_over_a_validation_capable_driver() {
    let caps = capability_set(
        &["VK_LAYER_KHRONOS_validation", "VK_LAYER_LUNARG_api_dump"],
        &[
            "VK_KHR_surface",
            "VK_EXT_debug_report",
            "VK_EXT_debug_utils",
            "VK_EXT_validation_features",
            "VK_EXT_layer_settings",
        ],
    );

    let enabled = negotiate(&caps);

    // One debug extension, one validation-config extension, validation
    // layer on: nothing else.
    assert_eq!(enabled.layers.len(), 1);
    assert_eq!(enabled.extensions.len(), 2);
    assert!(enabled.contains_extension(ash::ext::debug_utils::NAME));
    assert!(enabled.contains_extension(ash::ext::layer_settings::NAME));

    // Running the same negotiation again changes nothing.
    assert_eq!(negotiate(&caps), enabled);
}

#[test]
fn test_negotiation_on_a_bare_driver_enables_nothing() {
    let caps = capability_set(&[], &["VK_KHR_surface"]);
    let enabled = negotiate(&caps);
    assert!(enabled.layers.is_empty());
    assert!(enabled.extensions.is_empty());
}

#[test]
fn test_selection_prefers_discrete_then_richest_family() {
    let profiles = vec![
        gpu(vk::PhysicalDeviceType::INTEGRATED_GPU, &[4]),
        gpu(vk::PhysicalDeviceType::DISCRETE_GPU, &[2, 5]),
        gpu(vk::PhysicalDeviceType::INTEGRATED_GPU, &[16]),
    ];

    let device_index = pick_device(&profiles).expect("device");
    assert_eq!(device_index, 1);

    let family = pick_queue_family(&profiles[device_index].queue_families).expect("family");
    assert_eq!(family, 1);
}

#[test]
fn test_selection_falls_back_to_integrated() {
    let profiles = vec![
        gpu(vk::PhysicalDeviceType::CPU, &[1]),
        gpu(vk::PhysicalDeviceType::INTEGRATED_GPU, &[2, 5]),
    ];

    let device_index = pick_device(&profiles).expect("device");
    assert_eq!(device_index, 1);
    assert_eq!(
        pick_queue_family(&profiles[device_index].queue_families).expect("family"),
        1
    );
}

#[test]
fn test_enumeration_protocol_survives_driver_side_growth() {
    // A driver whose layer set grows once between the count and fill
    // calls; the protocol restarts and returns the complete set.
    let mut grown = false;
    let result = enumerate("test_layers", |count, buf: *mut u32| {
        let items: &[u32] = if grown { &[10, 20, 30] } else { &[10, 20] };
        if buf.is_null() {
            *count = items.len() as u32;
            return vk::Result::SUCCESS;
        }
        if !grown {
            grown = true;
            return vk::Result::INCOMPLETE;
        }
        let written = (*count as usize).min(items.len());
        for (i, item) in items.iter().take(written).enumerate() {
            unsafe { *buf.add(i) = *item };
        }
        *count = written as u32;
        vk::Result::SUCCESS
    })
    .expect("enumeration");

    assert_eq!(result, vec![10, 20, 30]);
}

#[test]
fn test_unstable_enumeration_is_an_error_not_a_hang() {
    let result: vkprobe_bootstrap::Result<Vec<u32>> = enumerate("test_unstable", |count, buf: *mut u32| {
        if buf.is_null() {
            *count = 1;
            vk::Result::SUCCESS
        } else {
            vk::Result::INCOMPLETE
        }
    });
    match result {
        Err(BootstrapError::EnumerationUnstable { call, .. }) => {
            assert_eq!(call, "test_unstable");
        }
        other => panic!("expected EnumerationUnstable, got {:?}", other),
    }
}
