//! Content-type detection and the thumbnail pass-through.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::warn;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Largest width or height a thumbnail may be resized to.
pub const MAX_THUMBNAIL_SIDE: u32 = 4096;

/// Guess a MIME type from the leading bytes of `data`.
///
/// Images are recognized by their magic numbers; a few common container
/// formats are special-cased; anything else is plain text when it decodes as
/// UTF-8 without binary control bytes, and an octet stream otherwise.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(data) {
        return format.to_mime_type();
    }
    let signatures: [(&[u8], &str); 5] = [
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
        (b"OggS\x00", "application/ogg"),
        (b"\x00asm", "application/wasm"),
    ];
    for (magic, mime) in signatures {
        if data.starts_with(magic) {
            return mime;
        }
    }
    let head = &data[..data.len().min(512)];
    let trimmed = head.trim_ascii_start();
    if starts_with_ignore_case(trimmed, b"<!doctype html") || starts_with_ignore_case(trimmed, b"<html")
    {
        return "text/html; charset=utf-8";
    }
    if looks_like_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn looks_like_text(head: &[u8]) -> bool {
    // The 512-byte window may split a multi-byte character at its end.
    let valid = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    valid
        && !head
            .iter()
            .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b))
}

/// Resize PNG and JPEG images to `width` x `height` with a Lanczos3 filter.
///
/// A zero dimension is derived from the other one, keeping the aspect
/// ratio. Other content types, images that fail to decode or encode, and
/// targets with a side above [`MAX_THUMBNAIL_SIDE`] are returned untouched.
pub fn thumbnail(id: &str, content_type: &str, data: Bytes, width: u32, height: u32) -> Bytes {
    let format = match content_type {
        "image/png" => ImageFormat::Png,
        "image/jpeg" => ImageFormat::Jpeg,
        _ => return data,
    };
    if data.is_empty() || (width == 0 && height == 0) {
        return data;
    }

    let img = match image::load_from_memory_with_format(&data, format) {
        Ok(img) => img,
        Err(e) => {
            warn!(id = %id, error = %e, "cannot decode image for resizing");
            return data;
        }
    };
    let (w, h) = target_size(img.width(), img.height(), width, height);
    if w > MAX_THUMBNAIL_SIDE || h > MAX_THUMBNAIL_SIDE {
        warn!(id = %id, width = w, height = h, "thumbnail size out of range");
        return data;
    }
    let resized = img.resize_exact(w, h, FilterType::Lanczos3);
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };

    let mut out = Cursor::new(Vec::new());
    match resized.write_to(&mut out, format) {
        Ok(()) => Bytes::from(out.into_inner()),
        Err(e) => {
            warn!(id = %id, error = %e, "cannot encode resized image");
            data
        }
    }
}

fn target_size(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    let scale = |num: u32, a: u32, b: u32| -> u32 {
        let v = u64::from(num) * u64::from(a) / u64::from(b.max(1));
        u32::try_from(v).unwrap_or(u32::MAX).max(1)
    };
    match (width, height) {
        (0, h) => (scale(h, src_w, src_h), h),
        (w, 0) => (w, scale(w, src_h, src_w)),
        (w, h) => (w, h),
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn encoded(format: ImageFormat, w: u32, h: u32) -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 30, 30])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        Bytes::from(out.into_inner())
    }

    #[test]
    fn sniffs_images() {
        assert_eq!(sniff_content_type(&encoded(ImageFormat::Png, 2, 2)), "image/png");
        assert_eq!(sniff_content_type(&encoded(ImageFormat::Jpeg, 2, 2)), "image/jpeg");
        assert_eq!(sniff_content_type(b"GIF89a......"), "image/gif");
    }

    #[test]
    fn sniffs_text_and_binary() {
        assert_eq!(sniff_content_type(b"hello\nworld"), TEXT_PLAIN);
        assert_eq!(sniff_content_type("h\u{e9}llo".as_bytes()), TEXT_PLAIN);
        assert_eq!(sniff_content_type(b""), TEXT_PLAIN);
        assert_eq!(sniff_content_type(b"\x00\x01\x02\xff"), OCTET_STREAM);
        assert_eq!(sniff_content_type(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(
            sniff_content_type(b"  <!DOCTYPE html><html></html>"),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn resizes_png() {
        let data = encoded(ImageFormat::Png, 40, 20);
        let out = thumbnail("id", "image/png", data, 10, 5);
        let img = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }

    #[test]
    fn resizes_jpeg_keeping_aspect_when_one_side_is_zero() {
        let data = encoded(ImageFormat::Jpeg, 40, 20);
        let out = thumbnail("id", "image/jpeg", data, 20, 0);
        let img = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[test]
    fn oversized_target_is_returned_as_is() {
        let data = encoded(ImageFormat::Png, 2, 2);
        assert_eq!(thumbnail("id", "image/png", data.clone(), 100_000, 100_000), data);

        // A derived side can exceed the bound even when the requested one does not.
        let tall = encoded(ImageFormat::Png, 1, 8);
        assert_eq!(thumbnail("id", "image/png", tall.clone(), 1024, 0), tall);
    }

    #[test]
    fn other_content_is_untouched() {
        let data = Bytes::from_static(b"plain text");
        assert_eq!(thumbnail("id", TEXT_PLAIN, data.clone(), 10, 10), data);

        let gif = Bytes::from_static(b"GIF89a");
        assert_eq!(thumbnail("id", "image/gif", gif.clone(), 10, 10), gif);
    }

    #[test]
    fn undecodable_image_is_returned_as_is() {
        let data = Bytes::from_static(b"\x89PNG\r\n\x1a\nbroken");
        assert_eq!(thumbnail("id", "image/png", data.clone(), 10, 10), data);
    }
}
