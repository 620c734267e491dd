//! Round-trip property for the RLE decoder: decompressing the output of a
//! conformant encoder reproduces the source pixels at every supported depth.
//!
//! The reference encoder here is deliberately naive — literal color images
//! plus run orders where a run is obvious — but every order it emits follows
//! the wire format, which is all the property needs.

use proptest::prelude::*;

use autordp_graphics::rle;

/// Encodes pixels as a sequence of COLOR_IMAGE and COLOR_RUN orders.
fn encode_reference(pixels: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut index = 0;

    while index < pixels.len() {
        // Measure the run of identical pixels.
        let mut run = 1;
        while index + run < pixels.len() && pixels[index + run] == pixels[index] {
            run += 1;
        }

        if run >= 4 {
            emit_color_run(&mut out, &pixels[index], run);
            index += run;
        } else {
            // Collect literals until the next long run.
            let start = index;
            while index < pixels.len() {
                let mut next_run = 1;
                while index + next_run < pixels.len() && pixels[index + next_run] == pixels[index] {
                    next_run += 1;
                }
                if next_run >= 4 {
                    break;
                }
                index += next_run;
            }
            emit_color_image(&mut out, &pixels[start..index]);
        }
    }

    out
}

fn emit_color_run(out: &mut Vec<u8>, pixel: &[u8], mut count: usize) {
    while count > 0 {
        // Regular form carries up to 31; the 8-bit supplement form carries
        // 32..=287.
        let chunk = count.min(287);
        if chunk <= 31 {
            out.push(0x60 | chunk as u8);
        } else {
            out.push(0x60);
            out.push((chunk - 32) as u8);
        }
        out.extend_from_slice(pixel);
        count -= chunk;
    }
}

fn emit_color_image(out: &mut Vec<u8>, pixels: &[Vec<u8>]) {
    let mut start = 0;
    while start < pixels.len() {
        let chunk = (pixels.len() - start).min(287);
        if chunk <= 31 {
            out.push(0x80 | chunk as u8);
        } else {
            out.push(0x80);
            out.push((chunk - 32) as u8);
        }
        for pixel in &pixels[start..start + chunk] {
            out.extend_from_slice(pixel);
        }
        start += chunk;
    }
}

fn pixel_strategy(bytes_per_pixel: usize) -> impl Strategy<Value = Vec<u8>> {
    // A small alphabet makes runs likely, exercising both order kinds.
    proptest::collection::vec(prop_oneof![Just(0x00u8), Just(0x55), Just(0xAB)], bytes_per_pixel)
}

fn roundtrip(bpp: usize, width: usize, height: usize, pixels: Vec<Vec<u8>>) {
    let compressed = encode_reference(&pixels);

    let mut decompressed = Vec::new();
    rle::decompress(&compressed, &mut decompressed, width, height, bpp).unwrap();

    let expected: Vec<u8> = pixels.iter().flatten().copied().collect();
    assert_eq!(decompressed, expected, "bpp={bpp} width={width} height={height}");
}

macro_rules! roundtrip_property {
    ($name:ident, $bpp:expr, $bytes_per_pixel:expr) => {
        proptest! {
            #[test]
            fn $name((width, height) in (1usize..32, 1usize..16), seed in proptest::collection::vec(pixel_strategy($bytes_per_pixel), 1..=32 * 16)) {
                let pixel_count = width * height;
                // Cycle the seed to fill the exact image size.
                let pixels: Vec<Vec<u8>> = (0..pixel_count).map(|i| seed[i % seed.len()].clone()).collect();

                roundtrip($bpp, width, height, pixels);
            }
        }
    };
}

roundtrip_property!(roundtrip_8bpp, 8, 1);
roundtrip_property!(roundtrip_15bpp, 15, 2);
roundtrip_property!(roundtrip_16bpp, 16, 2);
roundtrip_property!(roundtrip_24bpp, 24, 3);

#[test]
fn reference_encoder_emits_runs_and_literals() {
    let mut pixels = vec![vec![0x55u8]; 40];
    pixels.extend([vec![0x01], vec![0x02], vec![0x03]]);

    let compressed = encode_reference(&pixels);

    // A 40-pixel run needs the supplement form: 0x60, 40 - 32.
    assert_eq!(&compressed[..2], &[0x60, 8]);

    let mut decompressed = Vec::new();
    rle::decompress(&compressed, &mut decompressed, 43, 1, 8).unwrap();
    let expected: Vec<u8> = pixels.iter().flatten().copied().collect();
    assert_eq!(decompressed, expected);
}
