//! Alpha flattening for targets without an alpha channel.

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, Rgba};

/// Background used when flattening transparent pixels.
pub const WHITE: [u8; 3] = [255, 255, 255];

/// Composite an image over a solid background, producing opaque RGB.
pub fn flatten_alpha(img: &DynamicImage, background_color: [u8; 3]) -> DynamicImage {
    let (width, height) = img.dimensions();
    let rgba_img = img.to_rgba8();

    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in rgba_img.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;

        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;

        let blend = |c: u8, bg: u8| ((c as f32 * alpha) + (bg as f32 * inv_alpha)).round() as u8;

        output.put_pixel(
            x,
            y,
            Rgb([
                blend(r, background_color[0]),
                blend(g, background_color[1]),
                blend(b, background_color[2]),
            ]),
        );
    }

    DynamicImage::ImageRgb8(output)
}

/// Check if an image has an alpha channel
pub fn has_alpha_channel(img: &DynamicImage) -> bool {
    img.color().has_alpha()
}
