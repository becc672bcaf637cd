pub mod blob;
pub mod image;
