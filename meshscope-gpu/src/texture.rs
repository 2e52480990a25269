//! Textures and in-memory images

use crate::context::RenderContext;
use crate::handle::{GpuResource, ResourceOwner, TextureId};
use meshscope_core::{ensure, ensure_eq, Result, Row3};
use std::path::{Path, PathBuf};

/// Fallback color for path and image textures
pub const PINK: Row3 = [1.0, 0.75, 0.8];

/// Color of the placeholder bound for texture kinds with no textures
pub const BLANK_GREY: Row3 = [0.7, 0.7, 0.7];

/// Material slot a texture is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Every kind, in binding order
    pub const ALL: [TextureKind; 2] = [TextureKind::Diffuse, TextureKind::Specular];

    /// Name used in `material.<name>` uniforms
    pub fn name(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
        }
    }
}

/// Row-major float image, rows are image rows.
///
/// Row 0 is sampled at `v = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// 1 (grey), 3 (RGB) or 4 (RGBA)
    pub channels: u8,
    /// `height * width * channels` values in `0..=1`
    pub data: Vec<f32>,
}

impl Image {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self> {
        ensure!(
            matches!(channels, 1 | 3 | 4),
            "images have 1, 3 or 4 channels, got {}",
            channels
        );
        ensure_eq!(data.len(), width as usize * height as usize * channels as usize);
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build from a `rows x columns` table where each row packs
    /// `columns / channels` pixels
    pub fn from_table(rows: usize, columns: usize, channels: u8, data: Vec<f32>) -> Result<Self> {
        ensure!(channels > 0 && columns % channels as usize == 0, "{} columns do not hold whole {}-channel pixels", columns, channels);
        Self::new((columns / channels as usize) as u32, rows as u32, channels, data)
    }

    /// Whether the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 1x1 RGB image
    pub fn solid(color: Row3) -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 3,
            data: color.to_vec(),
        }
    }

    /// Convert a decoded image, keeping grey, RGB or RGBA layout
    pub fn from_dynamic(image: &image::DynamicImage) -> Self {
        fn normalize(raw: &[u8]) -> Vec<f32> {
            raw.iter().map(|&v| v as f32 / 255.0).collect()
        }
        let (width, height) = (image.width(), image.height());
        let (channels, data) = match image.color().channel_count() {
            1 => (1, normalize(image.to_luma8().as_raw())),
            3 => (3, normalize(image.to_rgb8().as_raw())),
            _ => (4, normalize(image.to_rgba8().as_raw())),
        };
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Pixel `(x, y)` expanded to RGBA
    pub fn rgba(&self, x: u32, y: u32) -> [f32; 4] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        let px = &self.data[start..start + c];
        match c {
            1 => [px[0], px[0], px[0], 1.0],
            3 => [px[0], px[1], px[2], 1.0],
            _ => [px[0], px[1], px[2], px[3]],
        }
    }

    /// RGBA8 bytes in row order, the upload format of the wgpu backend
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                out.extend(self.rgba(x, y).map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8));
            }
        }
        out
    }
}

enum Source {
    Path { path: PathBuf, flip: bool },
    Image(Image),
    Color,
}

struct TextureHandle {
    owner: ResourceOwner,
    id: TextureId,
}

/// One GPU texture and the data it is loaded from.
///
/// The GPU side stays empty until [`load`](Self::load) runs with a current
/// context. Dropping a loaded texture queues its handle for release.
pub struct Texture {
    source: Source,
    pub fallback_color: Row3,
    decoded: Option<Image>,
    handle: Option<TextureHandle>,
}

impl Texture {
    /// Texture decoded from an image file on first load.
    ///
    /// With `flip`, the bottom image row is placed at `v = 0`.
    pub fn from_path<P: AsRef<Path>>(path: P, flip: bool) -> Self {
        Self {
            source: Source::Path {
                path: path.as_ref().to_path_buf(),
                flip,
            },
            fallback_color: PINK,
            decoded: None,
            handle: None,
        }
    }

    /// Flat single-color texture
    pub fn from_color(color: Row3) -> Self {
        Self {
            source: Source::Color,
            fallback_color: color,
            decoded: None,
            handle: None,
        }
    }

    pub fn from_image(image: Image) -> Self {
        Self {
            source: Source::Image(image),
            fallback_color: PINK,
            decoded: None,
            handle: None,
        }
    }

    pub fn with_fallback_color(mut self, color: Row3) -> Self {
        self.fallback_color = color;
        self
    }

    /// GPU handle, if loaded
    pub fn id(&self) -> Option<TextureId> {
        self.handle.as_ref().map(|h| h.id)
    }

    /// Whether the texture holds a valid handle in `ctx`
    pub fn is_loaded_in<C: RenderContext + ?Sized>(&self, ctx: &C) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.owner.context == ctx.context_id())
    }

    /// Image data the texture uploads, decoding the file on first use.
    ///
    /// `None` means the fallback color is used, including for empty images.
    pub fn image(&mut self) -> Option<&Image> {
        match &self.source {
            Source::Image(image) if image.is_empty() => None,
            Source::Image(image) => Some(image),
            Source::Path { path, flip } => {
                if self.decoded.is_none() {
                    match image::open(path) {
                        Ok(decoded) => {
                            let decoded = if *flip { decoded.flipv() } else { decoded };
                            self.decoded = Some(Image::from_dynamic(&decoded));
                        }
                        Err(err) => {
                            log::warn!(
                                "failed to load texture {}: {}, using fallback color",
                                path.display(),
                                err
                            );
                        }
                    }
                }
                self.decoded.as_ref()
            }
            Source::Color => None,
        }
    }

    /// Allocate a handle in `ctx` if needed and upload the image.
    ///
    /// Priority: in-memory image, then the decoded file, then the fallback
    /// color. Decode failures are not errors.
    pub fn load<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<()> {
        if !self.is_loaded_in(ctx) {
            if let Some(stale) = self.handle.take() {
                stale.owner.defer([GpuResource::Texture(stale.id)]);
            }
            let id = ctx.create_texture()?;
            self.handle = Some(TextureHandle {
                owner: ResourceOwner::of(ctx),
                id,
            });
        }
        let Some(id) = self.id() else {
            return Ok(());
        };

        let fallback = Image::solid(self.fallback_color);
        let image = self.image().unwrap_or(&fallback);
        ctx.upload_texture(id, image)
    }

    /// Release the GPU handle; a no-op when nothing is held
    pub fn free<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) {
        if let Some(handle) = self.handle.take() {
            handle.owner.release(ctx, [GpuResource::Texture(handle.id)]);
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Path { path, .. } => format!("path {}", path.display()),
            Source::Image(image) => format!("image {}x{}x{}", image.width, image.height, image.channels),
            Source::Color => "color".to_string(),
        };
        f.debug_struct("Texture")
            .field("source", &source)
            .field("fallback_color", &self.fallback_color)
            .field("id", &self.id())
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.owner.defer([GpuResource::Texture(handle.id)]);
        }
    }
}

/// Textures of a mesh, one ordered list per [`TextureKind`]
#[derive(Debug, Default)]
pub struct TextureSet {
    pub diffuse: Vec<Texture>,
    pub specular: Vec<Texture>,
}

impl TextureSet {
    pub fn get(&self, kind: TextureKind) -> &[Texture] {
        match kind {
            TextureKind::Diffuse => &self.diffuse,
            TextureKind::Specular => &self.specular,
        }
    }

    pub fn get_mut(&mut self, kind: TextureKind) -> &mut Vec<Texture> {
        match kind {
            TextureKind::Diffuse => &mut self.diffuse,
            TextureKind::Specular => &mut self.specular,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Texture> {
        self.diffuse.iter_mut().chain(self.specular.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.diffuse.len() + self.specular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessContext;

    #[test]
    fn test_image_checks_channels_and_size() {
        assert!(Image::new(2, 1, 2, vec![0.0; 4]).is_err());
        assert!(Image::new(2, 2, 3, vec![0.0; 11]).is_err());
        assert!(Image::new(2, 2, 3, vec![0.0; 12]).is_ok());
        assert!(Image::from_table(2, 7, 3, vec![0.0; 14]).is_err());
        let image = Image::from_table(2, 8, 4, vec![0.5; 16]).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
    }

    #[test]
    fn test_rgba8_conversion() {
        let grey = Image::new(1, 1, 1, vec![0.5]).unwrap();
        assert_eq!(grey.to_rgba8(), vec![128, 128, 128, 255]);
        let rgb = Image::solid([1.0, 0.0, 0.2]);
        assert_eq!(rgb.to_rgba8(), vec![255, 0, 51, 255]);
    }

    #[test]
    fn test_color_texture_uploads_its_color() {
        let mut ctx = HeadlessContext::new();
        let mut tex = Texture::from_color([0.1, 0.2, 0.3]);
        tex.load(&mut ctx).unwrap();

        let id = tex.id().unwrap();
        assert_eq!(ctx.texture_image(id), Some(&Image::solid([0.1, 0.2, 0.3])));
        assert!(tex.is_loaded_in(&ctx));
    }

    #[test]
    fn test_empty_image_falls_back_to_color() {
        let mut ctx = HeadlessContext::new();
        let empty = Image::from_table(0, 0, 3, vec![]).unwrap();
        assert!(empty.is_empty());
        let mut tex = Texture::from_image(empty).with_fallback_color([0.0, 1.0, 0.0]);
        tex.load(&mut ctx).unwrap();
        assert_eq!(ctx.texture_image(tex.id().unwrap()), Some(&Image::solid([0.0, 1.0, 0.0])));
    }

    #[test]
    fn test_missing_file_falls_back_to_pink() {
        let mut ctx = HeadlessContext::new();
        let mut tex = Texture::from_path("/nonexistent/meshscope/texture.png", true);
        tex.load(&mut ctx).unwrap();
        assert_eq!(ctx.texture_image(tex.id().unwrap()), Some(&Image::solid(PINK)));
    }

    #[test]
    fn test_file_texture_is_flipped_and_cached() {
        let path = std::env::temp_dir().join(format!("meshscope_tex_{}.png", std::process::id()));
        let mut img = image::RgbImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 0, 255]));
        img.save(&path).unwrap();

        let mut tex = Texture::from_path(&path, true);
        let decoded = tex.image().cloned().unwrap();
        assert_eq!((decoded.width, decoded.height, decoded.channels), (1, 2, 3));
        // Bottom row of the file comes first
        assert_eq!(decoded.rgba(0, 0), [0.0, 0.0, 1.0, 1.0]);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(tex.image(), Some(&decoded));
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut ctx = HeadlessContext::new();
        let mut tex = Texture::from_image(Image::solid([1.0; 3]));
        tex.load(&mut ctx).unwrap();
        assert_eq!(ctx.live_resource_count(), 1);

        tex.free(&mut ctx);
        tex.free(&mut ctx);
        assert_eq!(ctx.live_resource_count(), 0);
        assert_eq!(ctx.double_release_count(), 0);
        assert!(tex.id().is_none());
    }

    #[test]
    fn test_drop_queues_release() {
        let mut ctx = HeadlessContext::new();
        {
            let mut tex = Texture::from_color([1.0, 1.0, 1.0]);
            tex.load(&mut ctx).unwrap();
        }
        assert_eq!(ctx.live_resource_count(), 1);
        assert_eq!(ctx.collect_released(), 1);
        assert_eq!(ctx.live_resource_count(), 0);
    }

    #[test]
    fn test_reload_keeps_handle() {
        let mut ctx = HeadlessContext::new();
        let mut tex = Texture::from_color([0.0; 3]);
        tex.load(&mut ctx).unwrap();
        let first = tex.id();
        tex.load(&mut ctx).unwrap();
        assert_eq!(tex.id(), first);
        assert_eq!(ctx.live_resource_count(), 1);
    }
}
