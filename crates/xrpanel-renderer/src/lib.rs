pub mod camera;
pub mod frame;
pub mod overlay;
pub mod panel;
pub mod pipeline;
pub mod pose;
pub mod scene;
pub mod stereo;
