// Maps the dye field onto a Bevy image asset once per tick. The image
// lives in both the main and render worlds so CPU writes reach the GPU
// on the next extract.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use glam::UVec2;

use crate::sim::fields::Grid;

pub fn create_display_image(images: &mut Assets<Image>, size: UVec2) -> Handle<Image> {
    images.add(blank_image(size))
}

pub fn blank_image(size: UVec2) -> Image {
    Image::new_fill(
        Extent3d {
            width: size.x.max(1),
            height: size.y.max(1),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
}

/// Encodes the linear dye field to sRGB bytes and writes them into the
/// image. A size mismatch (the tick straddling a resize) or a zero-sized
/// surface skips the draw for this tick instead of failing.
pub fn write_dye(dye: &Grid, image: &mut Image) {
    let size = image.size();
    if size.x != dye.width() || size.y != dye.height() {
        return;
    }
    if size.x == 0 || size.y == 0 {
        return;
    }

    let mut pixels: Vec<[u8; 4]> = Vec::with_capacity((size.x * size.y) as usize);
    for y in 0..size.y {
        for x in 0..size.x {
            pixels.push([
                encode_srgb(dye.get(x, y, 0)),
                encode_srgb(dye.get(x, y, 1)),
                encode_srgb(dye.get(x, y, 2)),
                255,
            ]);
        }
    }
    image.data = Some(bytemuck::cast_slice(&pixels).to_vec());
}

#[inline]
fn encode_srgb(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints() {
        assert_eq!(encode_srgb(0.0), 0);
        assert_eq!(encode_srgb(1.0), 255);
        assert_eq!(encode_srgb(2.0), 255);
    }

    #[test]
    fn mismatched_sizes_skip_the_draw() {
        let dye = Grid::new(UVec2::new(8, 8), 3);
        let mut image = blank_image(UVec2::new(4, 4));
        let before = image.data.clone();
        write_dye(&dye, &mut image);
        assert_eq!(image.data, before);
    }
}
