pub mod image_io;

pub use image_io::{list_sequence, load_frame, save_image, save_png, save_tiff};
