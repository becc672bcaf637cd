pub mod antiforgery;
pub mod image;
pub mod recognition;

pub use antiforgery::AntiForgeryService;
pub use image::ImageService;
pub use recognition::RecognitionService;
