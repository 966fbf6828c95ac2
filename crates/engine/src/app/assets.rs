use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::debug;

use crate::asset_keys::{validate_asset_key, AssetKeyError};

use super::node::{Color, FontSpec};

/// Immutable RGBA8 pixel block. Clones share the pixel storage.
#[derive(Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl Bitmap {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let rgba: Vec<u8> = (0..(width as usize * height as usize))
            .flat_map(|_| color.components())
            .collect();
        Self {
            width,
            height,
            rgba: rgba.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// True when both handles point at the same pixel storage.
    pub fn same_pixels(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.rgba, &other.rgba)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.same_pixels(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("invalid asset key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("asset '{key}' is not available")]
    NotFound { key: String },
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Image/text source consumed by scenes. Failures are reported to the
/// caller, which decides whether to degrade.
pub trait AssetResolver {
    fn bitmap(&mut self, key: &str) -> Result<Bitmap, AssetError>;

    /// Sorted frames named `*_<token>_*.png` inside `dir`.
    fn frames(&mut self, dir: &str, token: &str) -> Vec<Bitmap>;

    fn render_text(&mut self, font: &FontSpec, text: &str) -> Bitmap {
        render_builtin_text(font, text)
    }
}

/// Resolver with no files behind it; every bitmap is missing.
#[derive(Debug, Default)]
pub struct NullAssets;

impl AssetResolver for NullAssets {
    fn bitmap(&mut self, key: &str) -> Result<Bitmap, AssetError> {
        Err(AssetError::NotFound {
            key: key.to_string(),
        })
    }

    fn frames(&mut self, _dir: &str, _token: &str) -> Vec<Bitmap> {
        Vec::new()
    }
}

/// PNG loader rooted at the project's assets directory, caching by key.
#[derive(Debug)]
pub struct FileAssets {
    root: PathBuf,
    cache: HashMap<String, Result<Bitmap, AssetError>>,
    frame_cache: HashMap<(String, String), Vec<Bitmap>>,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
            frame_cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for FileAssets {
    fn bitmap(&mut self, key: &str) -> Result<Bitmap, AssetError> {
        if let Some(cached) = self.cache.get(key) {
            return cached.clone();
        }
        let loaded = validate_asset_key(key)
            .map_err(|source| AssetError::InvalidKey {
                key: key.to_string(),
                source,
            })
            .and_then(|()| load_png(&self.root.join(format!("{key}.png"))));
        self.cache.insert(key.to_string(), loaded.clone());
        loaded
    }

    fn frames(&mut self, dir: &str, token: &str) -> Vec<Bitmap> {
        let cache_key = (dir.to_string(), token.to_string());
        if let Some(cached) = self.frame_cache.get(&cache_key) {
            return cached.clone();
        }
        if validate_asset_key(dir).is_err() {
            return Vec::new();
        }

        let pattern = format!("_{token}_");
        let mut paths: Vec<PathBuf> = match fs::read_dir(self.root.join(dir)) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        return false;
                    };
                    name.ends_with(".png") && name.contains(&pattern)
                })
                .collect(),
            Err(error) => {
                debug!(dir, error = %error, "asset_frames_dir_unreadable");
                Vec::new()
            }
        };
        paths.sort();

        let frames: Vec<Bitmap> = paths
            .iter()
            .filter_map(|path| match load_png(path) {
                Ok(bitmap) => Some(bitmap),
                Err(error) => {
                    debug!(error = %error, "asset_frame_skipped");
                    None
                }
            })
            .collect();
        self.frame_cache.insert(cache_key, frames.clone());
        frames
    }
}

fn load_png(path: &Path) -> Result<Bitmap, AssetError> {
    let reader = ImageReader::open(path).map_err(|error| AssetError::Open {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    let decoded = reader.decode().map_err(|error| AssetError::Decode {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = (image.width(), image.height());
    Bitmap::from_rgba(width, height, image.into_raw()).ok_or_else(|| AssetError::Decode {
        path: path.to_path_buf(),
        message: "pixel buffer size mismatch".to_string(),
    })
}

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;

/// 3x5 glyphs, one byte per row, bit 2 is the leftmost column.
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ' ' => [0; 5],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        _ => [0b110, 0b001, 0b010, 0b000, 0b010],
    }
}

/// Renders `text` with the built-in pixel font; `font.size` is the target
/// glyph height in pixels.
pub fn render_builtin_text(font: &FontSpec, text: &str) -> Bitmap {
    let unit = (font.size / GLYPH_H).max(1);
    let count = text.chars().count() as u32;
    if count == 0 {
        return Bitmap::solid(1, GLYPH_H * unit, Color::rgba(0, 0, 0, 0));
    }
    let width = (count * (GLYPH_W + 1) - 1) * unit;
    let height = GLYPH_H * unit;
    let mut rgba = vec![0u8; (width * height * 4) as usize];
    let ink = font.color.components();

    for (index, ch) in text.chars().enumerate() {
        let origin_x = index as u32 * (GLYPH_W + 1) * unit;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for dy in 0..unit {
                    for dx in 0..unit {
                        let px = origin_x + col * unit + dx;
                        let py = row as u32 * unit + dy;
                        let idx = ((py * width + px) * 4) as usize;
                        rgba[idx..idx + 4].copy_from_slice(&ink);
                    }
                }
            }
        }
    }

    Bitmap {
        width,
        height,
        rgba: rgba.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_text_scales_with_font_size() {
        let font = FontSpec {
            size: 10,
            color: Color::WHITE,
        };
        let bitmap = render_builtin_text(&font, "x 3");
        assert_eq!(bitmap.height(), 10);
        assert_eq!(bitmap.width(), (3 * 4 - 1) * 2);
        // top-left of '3' is lit, the gap column after 'x' is not
        assert_eq!(bitmap.pixel(16, 0), Some([255, 255, 255, 255]));
        assert_eq!(bitmap.pixel(6, 0).map(|p| p[3]), Some(0));
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Bitmap::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Bitmap::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn file_assets_report_missing_and_invalid_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut assets = FileAssets::new(dir.path());
        assert!(matches!(
            assets.bitmap("missing"),
            Err(AssetError::Open { .. })
        ));
        assert!(matches!(
            assets.bitmap("Bad.Key"),
            Err(AssetError::InvalidKey { .. })
        ));
    }

    #[test]
    fn file_assets_load_sorted_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let climber = dir.path().join("climber");
        fs::create_dir_all(&climber).expect("mkdir");
        for (name, w) in [("c_up1left_02.png", 2u32), ("c_up1left_01.png", 1), ("c_down_01.png", 3)] {
            image::RgbaImage::new(w, 1)
                .save(climber.join(name))
                .expect("write png");
        }

        let mut assets = FileAssets::new(dir.path());
        let frames = assets.frames("climber", "up1left");
        let widths: Vec<u32> = frames.iter().map(Bitmap::width).collect();
        assert_eq!(widths, vec![1, 2]);
        assert!(assets.frames("climber", "wait").is_empty());
    }

    #[test]
    fn null_assets_still_render_text() {
        let mut assets = NullAssets;
        assert!(assets.bitmap("bg").is_err());
        let font = FontSpec {
            size: 5,
            color: Color::BLACK,
        };
        assert_eq!(assets.render_text(&font, "OK").height(), 5);
    }
}
