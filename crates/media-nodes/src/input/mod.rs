//! Input node adapters
//!
//! Source nodes that turn per-instance settings into media items without
//! calling the generation backend.

mod image;
mod text;
mod video;

pub use image::ImageInputNode;
pub use text::TextInputNode;
pub use video::VideoInputNode;
