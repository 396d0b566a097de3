use std::ffi::CString;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use vkprobe_bootstrap::{ApiVersion, AppInfo, VulkanContext};

#[derive(Parser)]
#[command(name = "vkprobe")]
#[command(about = "Vulkan bootstrap probe — negotiates an instance and selects a compute device")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AppArgs {
    /// Application name advertised to the driver
    #[arg(long, default_value = "vkprobe")]
    app_name: String,

    /// Application version (major.minor.patch)
    #[arg(long, default_value = "0.1.0")]
    app_version: String,

    /// Engine name advertised to the driver
    #[arg(long, default_value = "vkprobe")]
    engine_name: String,

    /// Engine version (major.minor.patch)
    #[arg(long, default_value = "0.1.0")]
    engine_version: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe layers, extensions and devices, and report the full negotiation
    Probe {
        #[command(flatten)]
        app: AppArgs,
    },

    /// Bootstrap quietly and print only the selected device and queue family
    Select {
        #[command(flatten)]
        app: AppArgs,
    },
}

fn parse_version(text: &str) -> anyhow::Result<ApiVersion> {
    let mut parts = text.split('.');
    let mut next = |what: &str| -> anyhow::Result<u32> {
        parts
            .next()
            .with_context(|| format!("version {:?} is missing its {} component", text, what))?
            .parse::<u32>()
            .with_context(|| format!("bad {} component in version {:?}", what, text))
    };
    let major = next("major")?;
    let minor = next("minor")?;
    let patch = next("patch")?;
    Ok(ApiVersion::new(major, minor, patch))
}

impl AppArgs {
    fn into_app_info(self) -> anyhow::Result<AppInfo> {
        Ok(AppInfo {
            application_name: CString::new(self.app_name).context("app name contains a NUL")?,
            application_version: parse_version(&self.app_version)?,
            engine_name: CString::new(self.engine_name).context("engine name contains a NUL")?,
            engine_version: parse_version(&self.engine_version)?,
        })
    }
}

fn device_type_name(device_type: ash::vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        ash::vk::PhysicalDeviceType::DISCRETE_GPU => "discrete gpu",
        ash::vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated gpu",
        ash::vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual gpu",
        ash::vk::PhysicalDeviceType::CPU => "cpu",
        _ => "other",
    }
}

fn probe(app: AppArgs) -> anyhow::Result<()> {
    let ctx = VulkanContext::bootstrap(&app.into_app_info()?)?;
    let caps = ctx.capabilities();

    println!("platform: {}", vkprobe_common::platform::platform_name());
    println!("instance api version: {}", caps.api_version);

    println!("layers ({}):", caps.layers.len());
    for layer in &caps.layers {
        println!(
            "  - {} (spec {}, impl {}): {}",
            layer.name, layer.spec_version, layer.implementation_version, layer.description,
        );
    }

    println!("extensions ({}):", caps.extensions.len());
    for ext in &caps.extensions {
        println!("  - {} (rev {})", ext.name, ext.spec_version);
    }

    let enabled = ctx.enabled_features();
    println!(
        "enabled layers: {}",
        join_names(enabled.layers.iter().copied())
    );
    println!(
        "enabled extensions: {}",
        join_names(enabled.extensions.iter().copied())
    );

    let devices = ctx.physical_devices()?;
    println!("devices ({}):", devices.len());
    for (index, &device) in devices.iter().enumerate() {
        let profile = ctx.device_profile(device)?;
        println!(
            "  [{}] {} ({}, api {}, vendor 0x{:04x}, device 0x{:04x})",
            index,
            profile.name,
            device_type_name(profile.device_type),
            profile.api_version,
            profile.vendor_id,
            profile.device_id,
        );
        for family in &profile.queue_families {
            println!(
                "      queue family {}: {:?}, {} queue(s)",
                family.index, family.flags, family.queue_count,
            );
        }
    }

    let selection = ctx.select_device()?;
    println!(
        "selected: [{}] {} ({})",
        selection.device_index,
        selection.profile.name,
        device_type_name(selection.profile.device_type),
    );
    println!("selected queue family: {}", selection.queue_family_index);

    let device_extensions = ctx.device_extensions(selection.physical_device)?;
    let device_layers = ctx.device_layers(selection.physical_device)?;
    println!(
        "selected device offers {} extension(s), {} layer(s)",
        device_extensions.len(),
        device_layers.len(),
    );

    Ok(())
}

fn select(app: AppArgs) -> anyhow::Result<()> {
    let ctx = VulkanContext::bootstrap(&app.into_app_info()?)?;
    let selection = ctx.select_device()?;
    info!(
        "selected {} with queue family {}",
        selection.profile.name, selection.queue_family_index,
    );
    println!(
        "{} queue-family={}",
        selection.profile.name, selection.queue_family_index,
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    vkprobe_common::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Probe { app } => probe(app),
        Commands::Select { app } => select(app),
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a std::ffi::CStr>) -> String {
    let joined = names
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}
