use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use image::imageops::FilterType;

use crate::foundation::core::Canvas;
use crate::foundation::error::ReelResult;

/// Decoded still image as premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed premultiplied RGBA8 pixels.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Load an image from disk and stretch it to the oversized working canvas.
///
/// The working canvas is the output canvas times the motion headroom, so every pan/zoom
/// window sampled later stays inside real pixels.
pub fn load_working_image(path: &Path, working: Canvas) -> ReelResult<PreparedImage> {
    let dyn_img =
        image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    let rgba = if dyn_img.width() == working.width && dyn_img.height() == working.height {
        dyn_img.to_rgba8()
    } else {
        dyn_img
            .resize_exact(working.width, working.height, FilterType::CatmullRom)
            .to_rgba8()
    };
    Ok(prepare_rgba(rgba))
}

fn prepare_rgba(rgba: image::RgbaImage) -> PreparedImage {
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
