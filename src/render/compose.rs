//! CPU compositing of the clips showing at one instant.

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Canvas, FrameIndex, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{mul_div255_u16, opacity_to_u8};
use crate::timeline::{Timeline, TimelineEntry};

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Opaque black, the color under every frame.
pub const BACKGROUND: PremulRgba8 = [0, 0, 0, 255];

/// One rendered output frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame filled with `color`.
    pub fn filled(size: Canvas, color: PremulRgba8) -> Self {
        let data = std::iter::repeat_n(color, size.width as usize * size.height as usize)
            .flatten()
            .collect();
        Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Convert to an `image` buffer for saving previews. Frames rendered here are opaque, so
    /// premultiplied and straight alpha coincide.
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            ReelError::validation(format!(
                "frame buffer of {} bytes does not match {}x{}",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }
}

/// Source-over for premultiplied pixels, with an extra opacity on `src`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = opacity_to_u8(opacity);
    if op == 0 || src[3] == 0 {
        return dst;
    }
    let sa = mul_div255_u16(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = (sa + mul_div255_u16(u16::from(dst[3]), inv)).min(255) as u8;
    for i in 0..3 {
        let sc = mul_div255_u16(u16::from(src[i]), op);
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = (sc + dc).min(255) as u8;
    }
    out
}

/// Render frame `frame` of `timeline`.
///
/// Every clip showing at `frame / fps` is sampled at its local elapsed time, its crop window
/// is bilinearly resampled to the frame size, and clips are layered in timeline order with
/// their fade opacity over [`BACKGROUND`]. A clip with a successor layered on top keeps full
/// opacity through its fade-out, so a cross-dissolve is a linear blend of the pair and only
/// the first fade-in and last fade-out pass through black.
pub fn render_frame(timeline: &Timeline, frame: FrameIndex) -> ReelResult<FrameRGBA> {
    let count = timeline.frame_count();
    if frame.0 >= count {
        return Err(ReelError::validation(format!(
            "frame {} is out of range (timeline has {count} frames)",
            frame.0
        )));
    }

    let t = timeline.frame_time_sec(frame);
    let mut out = FrameRGBA::filled(timeline.frame_size(), BACKGROUND);
    let active: Vec<_> = timeline.active_at(t).collect();
    for (i, (entry, elapsed)) in active.iter().enumerate() {
        let covered = i + 1 < active.len();
        draw_entry(&mut out, entry, *elapsed, covered);
    }
    Ok(out)
}

fn draw_entry(out: &mut FrameRGBA, entry: &TimelineEntry, elapsed: f64, covered: bool) {
    let clip = &entry.clip;
    let opacity = if covered {
        clip.fade.fade_in_opacity(elapsed, clip.duration_sec)
    } else {
        clip.fade.opacity(elapsed, clip.duration_sec)
    };
    if opacity <= 0.0 {
        return;
    }
    let window = entry
        .geometry
        .window(clip.transform.sample(elapsed, clip.duration_sec));
    draw_window(out, &clip.image, window, opacity);
}

/// Resample `window` of `src` (in source pixels) onto the whole of `out`.
fn draw_window(out: &mut FrameRGBA, src: &PreparedImage, window: Rect, opacity: f32) {
    if out.width == 0 || out.height == 0 || src.width == 0 || src.height == 0 {
        return;
    }
    let sx = window.width() / f64::from(out.width);
    let sy = window.height() / f64::from(out.height);
    let row_len = out.width as usize * 4;

    for (y, row) in out.data.chunks_exact_mut(row_len).enumerate() {
        let src_y = window.y0 + (y as f64 + 0.5) * sy - 0.5;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let src_x = window.x0 + (x as f64 + 0.5) * sx - 0.5;
            let s = sample_bilinear(src, src_x, src_y);
            let d = over([px[0], px[1], px[2], px[3]], s, opacity);
            px.copy_from_slice(&d);
        }
    }
}

/// Bilinear sample at pixel-center coordinates, clamped to the image edges.
fn sample_bilinear(img: &PreparedImage, x: f64, y: f64) -> PremulRgba8 {
    let max_x = f64::from(img.width - 1);
    let max_y = f64::from(img.height - 1);
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width - 1);
    let y1 = (y0 + 1).min(img.height - 1);
    let fx = (x - f64::from(x0)) as f32;
    let fy = (y - f64::from(y0)) as f32;

    let data = img.rgba8_premul.as_slice();
    let at = |px: u32, py: u32| (py as usize * img.width as usize + px as usize) * 4;
    let (i00, i10, i01, i11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f32::from(data[i00 + c]) * (1.0 - fx) + f32::from(data[i10 + c]) * fx;
        let bottom = f32::from(data[i01 + c]) * (1.0 - fx) + f32::from(data[i11 + c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
