//! PDF output: direct drawing with standard fonts, image pages and output
//! checks.

pub mod font;
pub mod image_page;
pub mod inspect;
pub mod layout;
pub mod writer;

pub use font::{StandardFont, to_ascii};
pub use image_page::{decoded_image, from_dynamic, image_document, jpeg_image};
pub use layout::{TextStyle, error_page, table_document, text_document, wrap_text};
pub use inspect::page_count;
pub use writer::{A4, EmbeddedImage, ImageData, PageSize, PdfWriter};
