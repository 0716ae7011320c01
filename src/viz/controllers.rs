mod state;
pub use state::{FrameStepInfo, SceneState};

mod wasd;
pub use wasd::{VirtualCameraControl, WASDVirtualCameraControl};
