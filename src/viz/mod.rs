//! Vulkan point cloud viewer, built with the `viz` feature.
mod controllers;
pub use controllers::{FrameStepInfo, SceneState, VirtualCameraControl, WASDVirtualCameraControl};

mod manager;
pub use manager::Manager;

mod virtual_camera;
pub use virtual_camera::{VirtualCamera, VirtualCameraSphericalBuilder};

mod virtual_projection;
pub use virtual_projection::{PerspectiveVirtualProjectionBuilder, VirtualProjection};

mod vkpointcloud;
pub use vkpointcloud::{height_color, point_vertices, PointVertex, VkPointCloud};

mod window;
pub use window::Window;

use tracing::{info, warn};

use crate::{error::Result, pointcloud::PointCloud};

/// Opens a window showing `pcl` and blocks until the user closes it.
/// Empty clouds are not shown.
pub fn show_point_cloud(pcl: &PointCloud) -> Result<()> {
    if pcl.is_empty() {
        warn!("point cloud is empty, skipping the viewer");
        return Ok(());
    }

    let manager = Manager::new()?;
    info!(device = manager.device_name(), "opening viewer");

    let vk_pointcloud = VkPointCloud::from_pointcloud(&manager.memory_allocator, pcl)?;
    let mut window = Window::create(&manager, vk_pointcloud, pcl.bounding_sphere())?;
    window.show()
}
