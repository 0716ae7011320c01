pub mod bounds;
pub mod error;
pub mod export;
pub mod io;
pub mod logging;
pub mod pointcloud;
pub mod sampling;
pub mod table;


#[cfg(feature = "viz")]
pub mod viz;

pub use crate::error::{Error, Result};
pub use crate::export::PointCloudExporter;
pub use crate::pointcloud::PointCloud;
pub use crate::sampling::{IntervalSampler, SamplerParams};
