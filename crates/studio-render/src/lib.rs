pub mod assets;
pub mod blur;
pub mod fonts;
pub mod hit;
pub mod preview;
pub mod raster;
pub mod shape;
pub mod text;

pub use assets::{DecodedImage, DefaultLoader, ImageError, ImageLoader, ImageSlot, ImageStore};
pub use fonts::FontBook;
pub use preview::{PreviewFrame, PreviewState, render_preview};
pub use raster::{RasterError, RasterOptions, encode_png, rasterize};
