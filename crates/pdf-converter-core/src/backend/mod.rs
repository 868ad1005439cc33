//! Rendering backends used by the conversion strategies.
//!
//! - [`renderer`]: the HTML-to-PDF contract and its factory
//! - [`chrome`]: headless Chrome behind a shared, lazily launched engine
//! - [`raster`]: image decoding, transcoding and SVG rasterization
//! - [`docx`] and [`sheet`]: office document extraction
//! - [`repair`]: recovery of damaged zip containers

pub mod chrome;
pub mod docx;
pub mod raster;
pub mod renderer;
pub mod repair;
pub mod shared;
pub mod sheet;

pub use chrome::ChromeRenderer;
pub use docx::{Block, DocxDocument, Run};
pub use renderer::{
    DisabledRenderer, DocumentRenderer, Margins, PrintOptions, RenderSource, RendererInfo,
    create_renderer,
};
pub use shared::{Engine, EngineLauncher, SharedEngine};
pub use sheet::Sheet;
