//! Deterministic identicon generation
//!
//! A SHA-256 digest of the seed picks a foreground colour and a horizontally
//! mirrored block grid. The same seed always encodes to the same PNG bytes.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::error::{FeedsError, Result};

/// Edge length of generated avatars, in pixels
pub const AVATAR_RESOLUTION: u32 = 60;

/// Edge length of one grid block, in pixels
pub const BLOCK_SIZE: u32 = 12;

const BACKGROUND: Rgb<u8> = Rgb([0xf0, 0xf0, 0xf0]);

/// Render the identicon for `seed` as an image
pub fn render(seed: &[u8], resolution: u32, block: u32) -> RgbImage {
    let digest = Sha256::digest(seed);
    let cells = (resolution / block.max(1)).max(1);
    let offset = (resolution - cells * block) / 2;

    // Keep the colour away from the pale background.
    let foreground = Rgb([digest[0] / 2 + 32, digest[1] / 2 + 32, digest[2] / 2 + 32]);

    let mut img = RgbImage::from_pixel(resolution, resolution, BACKGROUND);
    let half = cells.div_ceil(2);
    let mut bit = 0usize;
    for col in 0..half {
        for row in 0..cells {
            // Skip the colour bytes; wrap around on large grids.
            let byte = digest[3 + (bit / 8) % (digest.len() - 3)];
            let filled = byte >> (bit % 8) & 1 == 1;
            bit += 1;
            if !filled {
                continue;
            }
            for mirrored in [col, cells - 1 - col] {
                fill_block(&mut img, offset + mirrored * block, offset + row * block, block, foreground);
            }
        }
    }
    img
}

fn fill_block(img: &mut RgbImage, x0: u32, y0: u32, block: u32, color: Rgb<u8>) {
    for y in y0..y0 + block {
        for x in x0..x0 + block {
            img.put_pixel(x, y, color);
        }
    }
}

/// Render and PNG-encode the default avatar for a feed name
pub fn generate_png(name: &str) -> Result<Vec<u8>> {
    let img = render(name.as_bytes(), AVATAR_RESOLUTION, BLOCK_SIZE);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| FeedsError::Image(e.to_string()))?;
    Ok(buf.into_inner())
}
