//! Prompt-submit hook that shrinks oversized pasted images in place.
//!
//! The newest transcript entry (last JSONL line) is scanned for base64
//! `image` blocks. Any whose longer side exceeds the limit is resized with
//! Lanczos resampling, re-encoded in its original format and written back.

use crate::config::Config;
use crate::error::{HookError, Result};
use crate::hook::{HookInput, PromptBlock};
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;

pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

/// Plugin that performs the same resizing; running both does the work twice.
pub const CONFLICTING_PLUGIN: &str = "auto-resize-images";

/// Images with a side beyond this are refused rather than decoded.
pub const MAX_DECODE_DIMENSION: u32 = 8000;

const JPEG_QUALITY: u8 = 95;

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Scale so the longer side equals `max`, preserving aspect ratio. The
/// shorter side is truncated.
pub fn calculate_resize_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width >= height {
        let h = (height as u64 * max as u64 / width.max(1) as u64) as u32;
        (max, h)
    } else {
        let w = (width as u64 * max as u64 / height.max(1) as u64) as u32;
        (w, max)
    }
}

pub fn has_plugin_conflict(enabled_plugins: &[String]) -> bool {
    enabled_plugins.iter().any(|p| p == CONFLICTING_PLUGIN)
}

fn format_for(media_type: &str) -> Result<ImageFormat> {
    if !SUPPORTED_MEDIA_TYPES.contains(&media_type) {
        let name = media_type.rsplit('/').next().unwrap_or(media_type);
        return Err(HookError::UnsupportedImage(name.to_uppercase()));
    }
    ImageFormat::from_mime_type(media_type)
        .ok_or_else(|| HookError::UnsupportedImage(media_type.to_string()))
}

// ---------------------------------------------------------------------------
// Single image
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resized {
    pub data: String,
    pub from: (u32, u32),
    pub to: (u32, u32),
}

impl Resized {
    pub fn notification(&self, max: u32) -> String {
        format!(
            "Image resized to meet {max}px limit: {}x{} to {}x{}",
            self.from.0, self.from.1, self.to.0, self.to.1
        )
    }
}

/// Resize one base64 image if its longer side exceeds `max`. `Ok(None)`
/// when it already fits; images are never upscaled.
pub fn resize_base64(data: &str, media_type: &str, max: u32) -> Result<Option<Resized>> {
    let format = format_for(media_type)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|_| HookError::CorruptImage)?;

    let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
        .into_dimensions()
        .map_err(|_| HookError::CorruptImage)?;
    if width.max(height) <= max {
        return Ok(None);
    }
    if width.max(height) > MAX_DECODE_DIMENSION {
        return Err(HookError::ImageTooLarge { width, height });
    }

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|_| HookError::CorruptImage)?;
    let (new_w, new_h) = calculate_resize_dimensions(width, height, max);
    let resized = img.resize_exact(new_w, new_h, FilterType::Lanczos3);
    tracing::debug!("resized image {width}x{height} -> {new_w}x{new_h}");

    Ok(Some(Resized {
        data: base64::engine::general_purpose::STANDARD.encode(encode(&resized, format)?),
        from: (width, height),
        to: (new_w, new_h),
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if format == ImageFormat::Jpeg {
        let flat = flatten_on_white(img);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        encoder.encode_image(&flat)?;
    } else {
        img.write_to(&mut Cursor::new(&mut buf), format)?;
    }
    Ok(buf)
}

/// JPEG has no alpha channel; composite translucent pixels over white.
fn flatten_on_white(img: &DynamicImage) -> image::RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    image::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Resize every oversized image block in one transcript entry, in place.
pub fn process_entry(entry: &mut Value, max: u32) -> Result<Vec<String>> {
    let mut notifications = Vec::new();
    let Some(blocks) = entry.get_mut("content").and_then(Value::as_array_mut) else {
        return Ok(notifications);
    };
    for block in blocks {
        if block.get("type").and_then(Value::as_str) != Some("image") {
            continue;
        }
        let Some(source) = block.get_mut("source").and_then(Value::as_object_mut) else {
            continue;
        };
        if source.get("type").and_then(Value::as_str) != Some("base64") {
            continue;
        }
        let media_type = source
            .get("media_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = source
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if let Some(resized) = resize_base64(data, &media_type, max)? {
            notifications.push(resized.notification(max));
            source.insert("data".to_string(), Value::String(resized.data));
        }
    }
    Ok(notifications)
}

/// Process the last entry of a JSONL transcript, rewriting the file only
/// when something was resized. Earlier entries are kept as they are.
pub fn process_transcript(path: &Path, max: u32) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines: Vec<&str> = content.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let Some(last) = lines.pop() else {
        return Err(HookError::EmptyTranscript(path.display().to_string()));
    };

    let mut entry: Value = serde_json::from_str(last)?;
    let notifications = process_entry(&mut entry, max)?;
    if notifications.is_empty() {
        return Ok(notifications);
    }

    let mut out = String::new();
    for line in &lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&serde_json::to_string(&entry)?);
    out.push('\n');
    crate::io::atomic_write(path, out.as_bytes())?;
    Ok(notifications)
}

// ---------------------------------------------------------------------------
// Hook entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ResizeResult {
    /// Disabled in config.
    Skipped,
    /// One line per resized image; empty when nothing needed resizing.
    Resized(Vec<String>),
    /// The prompt must not be submitted.
    Blocked(PromptBlock),
}

/// Image problems the user can fix become a block; anything else (missing
/// transcript, bad JSON) is returned as an error.
pub fn run_resize_hook(raw_input: &str, config: &Config) -> Result<ResizeResult> {
    let input = HookInput::parse(raw_input)?;
    if has_plugin_conflict(&input.enabled_plugins) {
        tracing::warn!(
            "both {CONFLICTING_PLUGIN} and workhooks image resizing are enabled; \
             uninstall one with: claude plugin uninstall {CONFLICTING_PLUGIN}"
        );
    }
    if !config.auto_resize_images {
        return Ok(ResizeResult::Skipped);
    }
    let Some(path) = input.transcript_path.as_deref() else {
        return Err(HookError::EmptyTranscript("missing transcript_path".to_string()));
    };

    match process_transcript(Path::new(path), config.max_image_dimension) {
        Ok(notes) => Ok(ResizeResult::Resized(notes)),
        Err(
            e @ (HookError::UnsupportedImage(_)
            | HookError::CorruptImage
            | HookError::ImageTooLarge { .. }),
        ) => Ok(ResizeResult::Blocked(PromptBlock::new(e.to_string()))),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png(width: u32, height: u32, pixel: [u8; 4]) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(pixel)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf)
    }

    fn jpeg(width: u32, height: u32) -> String {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf)
    }

    fn decode(data: &str, format: ImageFormat) -> DynamicImage {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .unwrap();
        image::load_from_memory_with_format(&bytes, format).unwrap()
    }

    fn entry(blocks: Vec<Value>) -> Value {
        serde_json::json!({ "role": "user", "content": blocks })
    }

    fn image_block(media_type: &str, data: &str) -> Value {
        serde_json::json!({
            "type": "image",
            "source": { "type": "base64", "media_type": media_type, "data": data }
        })
    }

    #[test]
    fn dimensions_preserve_aspect_ratio() {
        assert_eq!(calculate_resize_dimensions(3000, 2000, 2000), (2000, 1333));
        assert_eq!(calculate_resize_dimensions(1500, 4000, 2000), (750, 2000));
        assert_eq!(calculate_resize_dimensions(5000, 1000, 2000), (2000, 400));
        assert_eq!(calculate_resize_dimensions(2500, 2500, 2000), (2000, 2000));
    }

    #[test]
    fn small_images_are_left_alone() {
        assert_eq!(resize_base64(&png(20, 10, [0, 0, 0, 255]), "image/png", 20).unwrap(), None);
        assert_eq!(resize_base64(&png(4, 3, [0, 0, 0, 255]), "image/png", 20).unwrap(), None);
    }

    #[test]
    fn transparent_png_keeps_alpha() {
        let resized = resize_base64(&png(300, 200, [255, 0, 0, 128]), "image/png", 200)
            .unwrap()
            .unwrap();
        assert_eq!(resized.from, (300, 200));
        assert_eq!(resized.to, (200, 133));
        let img = decode(&resized.data, ImageFormat::Png);
        assert_eq!((img.width(), img.height()), (200, 133));
        assert!(img.color().has_alpha());
        assert_eq!(
            resized.notification(200),
            "Image resized to meet 200px limit: 300x200 to 200x133"
        );
    }

    #[test]
    fn jpeg_stays_jpeg() {
        let resized = resize_base64(&jpeg(100, 400), "image/jpeg", 100)
            .unwrap()
            .unwrap();
        let img = decode(&resized.data, ImageFormat::Jpeg);
        assert_eq!((img.width(), img.height()), (25, 100));
    }

    #[test]
    fn flattening_blends_towards_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [255, 255, 255]);
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn oversized_images_are_refused_before_decoding() {
        let err = resize_base64(&png(MAX_DECODE_DIMENSION + 1, 1, [0, 0, 0, 255]), "image/png", 2000)
            .unwrap_err();
        assert!(matches!(err, HookError::ImageTooLarge { width: 8001, height: 1 }));
        assert_eq!(
            err.to_string(),
            "Image dimensions (8001x1) require too much memory to resize. \
             Please resize manually to under 8000px before pasting."
        );
    }

    #[test]
    fn unsupported_media_type_is_rejected() {
        let err = resize_base64("AAAA", "image/webp", 2000).unwrap_err();
        assert!(matches!(err, HookError::UnsupportedImage(ref f) if f == "WEBP"));
        assert!(err.to_string().starts_with("Image format not supported: WEBP."));
    }

    #[test]
    fn corrupt_data_is_rejected() {
        let garbage = base64::engine::general_purpose::STANDARD.encode(b"not an image at all");
        assert!(matches!(
            resize_base64(&garbage, "image/png", 2000),
            Err(HookError::CorruptImage)
        ));
        assert!(matches!(
            resize_base64("!!!", "image/png", 2000),
            Err(HookError::CorruptImage)
        ));
    }

    #[test]
    fn mixed_blocks_only_touch_oversized_images() {
        let small = png(50, 50, [0, 255, 0, 255]);
        let mut e = entry(vec![
            serde_json::json!({ "type": "text", "text": "look at these" }),
            image_block("image/png", &png(300, 100, [0, 0, 255, 255])),
            image_block("image/png", &small),
        ]);
        let notes = process_entry(&mut e, 100).unwrap();
        assert_eq!(notes, vec!["Image resized to meet 100px limit: 300x100 to 100x33"]);
        assert_eq!(e["content"][2]["source"]["data"], small.as_str());
        assert_eq!(e["content"][0]["text"], "look at these");
    }

    #[test]
    fn transcript_rewrite_keeps_earlier_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let first = r#"{"role":"assistant","content":[]}"#;
        let last = entry(vec![image_block("image/png", &png(300, 300, [1, 2, 3, 255]))]);
        std::fs::write(&path, format!("{first}\n{last}\n")).unwrap();

        let notes = process_transcript(&path, 150).unwrap();
        assert_eq!(notes.len(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], first);
        let rewritten: Value = serde_json::from_str(lines[1]).unwrap();
        let data = rewritten["content"][0]["source"]["data"].as_str().unwrap();
        let img = decode(data, ImageFormat::Png);
        assert_eq!((img.width(), img.height()), (150, 150));
    }

    #[test]
    fn untouched_transcript_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let original = "{\"role\":\"user\",\"content\":[{\"type\":\"text\",\"text\":\"hi\"}]}\n";
        std::fs::write(&path, original).unwrap();
        assert!(process_transcript(&path, 2000).unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn hook_blocks_unsupported_images() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.jsonl");
        let e = entry(vec![image_block("image/bmp", "AAAA")]);
        std::fs::write(&path, format!("{e}\n")).unwrap();
        let input = serde_json::json!({ "transcript_path": path }).to_string();

        match run_resize_hook(&input, &Config::default()).unwrap() {
            ResizeResult::Blocked(block) => {
                assert_eq!(block.decision, "block");
                assert!(block.reason.contains("BMP"));
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn hook_respects_disabled_config() {
        let config = Config {
            auto_resize_images: false,
            ..Config::default()
        };
        let input = r#"{"transcript_path":"/nonexistent/t.jsonl"}"#;
        assert_eq!(run_resize_hook(input, &config).unwrap(), ResizeResult::Skipped);
    }

    #[test]
    fn detects_plugin_conflict() {
        assert!(has_plugin_conflict(&["auto-resize-images".to_string()]));
        assert!(!has_plugin_conflict(&["other".to_string()]));
        assert!(!has_plugin_conflict(&[]));
    }
}
