use std::sync::Arc;

use vulkano::{
    device::{
        physical::{PhysicalDevice, PhysicalDeviceType},
        Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateInfo},
    memory::allocator::StandardMemoryAllocator,
    VulkanLibrary,
};

use crate::error::{Error, Result};

/// Vulkan instance, device and the graphics queue used by the viewer.
pub struct Manager {
    pub instance: Arc<Instance>,
    pub physical_device: Arc<PhysicalDevice>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub memory_allocator: StandardMemoryAllocator,
}

impl Manager {
    pub fn new() -> Result<Self> {
        let library = VulkanLibrary::new()
            .map_err(|err| Error::viewer(format!("Vulkan is not supported by this system: {err}")))?;
        let required_extensions = vulkano_win::required_extensions(&library);

        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                application_name: Some("pcdtools".to_string()),
                enabled_extensions: required_extensions,
                enumerate_portability: true,
                ..Default::default()
            },
        )
        .map_err(Error::viewer)?;

        let physical_device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };
        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()
            .map_err(Error::viewer)?
            .filter(|p| p.supported_extensions().contains(&physical_device_extensions))
            .filter_map(|p| {
                p.queue_family_properties()
                    .iter()
                    .position(|q| q.queue_flags.intersects(QueueFlags::GRAPHICS))
                    .map(|q| (p, q as u32))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 0,
                PhysicalDeviceType::IntegratedGpu => 1,
                PhysicalDeviceType::VirtualGpu => 2,
                PhysicalDeviceType::Cpu => 3,
                _ => 4,
            })
            .ok_or_else(|| Error::viewer("no Vulkan device with graphics and swapchain support"))?;

        let (device, mut queues) = Device::new(
            physical_device.clone(),
            DeviceCreateInfo {
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                enabled_extensions: physical_device_extensions,
                ..Default::default()
            },
        )
        .map_err(Error::viewer)?;
        let queue = queues
            .next()
            .ok_or_else(|| Error::viewer("device was created without queues"))?;
        let memory_allocator = StandardMemoryAllocator::new_default(device.clone());

        Ok(Self {
            instance,
            physical_device,
            device,
            queue,
            memory_allocator,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.physical_device.properties().device_name
    }
}
