//! Minimal TGA texture reader.
//!
//! Only uncompressed true-colour images at 24 or 32 bits per pixel are
//! supported. Samples keep the file's BGR(A) order and are promoted to the
//! fixed-point scale with [`fixed16::promote_channel`].

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use super::layout::*;
use crate::db::Texture;
use crate::util::TextureError;

/// Read and decode a texture file.
///
/// `mem_start` is recorded on the texture as its offset in the texture table.
pub fn read_texture(path: &Path, mem_start: usize) -> Result<Texture, TextureError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TextureError::NotFound(path.to_path_buf())
        } else {
            TextureError::Io(e)
        }
    })?;
    decode_texture(&bytes, mem_start)
}

/// Decode a texture held in memory.
pub fn decode_texture(bytes: &[u8], mem_start: usize) -> Result<Texture, TextureError> {
    if bytes.len() < TGA_HEADER_SIZE {
        return Err(TextureError::TruncatedHeader(bytes.len()));
    }
    let header = &bytes[..TGA_HEADER_SIZE];

    let image_type = header[TGA_IMAGE_TYPE_OFFSET];
    if image_type != TGA_TRUE_COLOUR {
        return Err(TextureError::UnsupportedImageType(image_type));
    }

    let width = LittleEndian::read_u16(&header[TGA_WIDTH_OFFSET..]);
    let height = LittleEndian::read_u16(&header[TGA_HEIGHT_OFFSET..]);
    let depth = header[TGA_DEPTH_OFFSET];
    let alpha = match depth {
        24 => false,
        32 => true,
        other => return Err(TextureError::UnsupportedDepth(other)),
    };
    if width == 0 || height == 0 {
        return Err(TextureError::Empty { width, height });
    }

    let channels = if alpha { 4 } else { 3 };
    let expected = width as usize * height as usize * channels;
    let start = TGA_HEADER_SIZE + header[TGA_ID_LENGTH_OFFSET] as usize;
    let data = bytes.get(start..).unwrap_or(&[]);
    if data.len() < expected {
        return Err(TextureError::TruncatedPixels { expected, actual: data.len() });
    }

    let pixels = data[..expected]
        .iter()
        .map(|&s| fixed16::promote_channel(s))
        .collect();

    Ok(Texture {
        width: width as u32,
        height: height as u32,
        alpha,
        mem_start,
        pixels,
    })
}

/// Encode raw BGR(A) samples as an uncompressed TGA.
pub fn encode_texture(width: u16, height: u16, alpha: bool, samples: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; TGA_HEADER_SIZE];
    out[TGA_IMAGE_TYPE_OFFSET] = TGA_TRUE_COLOUR;
    LittleEndian::write_u16(&mut out[TGA_WIDTH_OFFSET..], width);
    LittleEndian::write_u16(&mut out[TGA_HEIGHT_OFFSET..], height);
    out[TGA_DEPTH_OFFSET] = if alpha { 32 } else { 24 };
    out.extend_from_slice(samples);
    out
}
