// inspection-report: raster image sources

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use ::image::DynamicImage;
use tracing::debug;

use crate::error::{ReportError, ReportResult};

/// Decoded images keyed by the source string used in the report data.
#[derive(Debug, Default)]
pub struct ImageLibrary {
    images: HashMap<String, DynamicImage>,
}

impl ImageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every source. Relative paths are resolved against `base_dir`.
    pub fn load_all<'a>(
        sources: impl IntoIterator<Item = &'a str>,
        base_dir: &Path,
    ) -> ReportResult<Self> {
        let mut library = Self::new();
        for source in sources {
            if library.images.contains_key(source) {
                continue;
            }
            let image = load_image(source, base_dir)?;
            library.insert(source, image);
        }
        Ok(library)
    }

    pub fn insert(&mut self, source: &str, image: DynamicImage) {
        self.images.insert(source.to_string(), image);
    }

    pub fn get(&self, source: &str) -> ReportResult<&DynamicImage> {
        self.images
            .get(source)
            .ok_or_else(|| ReportError::NotFound(format!("image '{}'", source)))
    }

    /// Natural size in pixels
    pub fn dimensions(&self, source: &str) -> ReportResult<(u32, u32)> {
        let image = self.get(source)?;
        Ok((image.width(), image.height()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn resolve_path(source: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Read an image from a file path or an http(s) URL.
pub fn load_image(source: &str, base_dir: &Path) -> ReportResult<DynamicImage> {
    let image_bytes = if source.starts_with("http://") || source.starts_with("https://") {
        debug!(source, "fetching image");
        let response = ureq::get(source)
            .call()
            .map_err(|e| ReportError::ImageError(format!("Failed to fetch URL {}: {}", source, e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| ReportError::ImageError(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        let path = resolve_path(source, base_dir);
        debug!(path = %path.display(), "reading image");
        std::fs::read(&path).map_err(|e| ReportError::ImageError(format!("{}: {}", path.display(), e)))?
    };

    ::image::load_from_memory(&image_bytes)
        .map_err(|e| ReportError::ImageError(format!("Failed to decode {}: {}", source, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};

    #[test]
    fn missing_source_is_not_found() {
        let library = ImageLibrary::new();
        assert!(matches!(library.get("pie-summary.png"), Err(ReportError::NotFound(_))));
    }

    #[test]
    fn reports_natural_dimensions() {
        let mut library = ImageLibrary::new();
        library.insert("chart", DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([255, 0, 0]))));
        assert_eq!(library.dimensions("chart").unwrap(), (400, 300));
    }

    #[test]
    fn loads_relative_to_base_dir() {
        let dir = std::env::temp_dir().join(format!("inspection-report-img-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        RgbImage::from_pixel(8, 4, Rgb([0, 128, 0])).save(dir.join("foto.png")).unwrap();

        let library = ImageLibrary::load_all(["foto.png", "foto.png"], &dir).unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.dimensions("foto.png").unwrap(), (8, 4));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unreadable_file_is_an_image_error() {
        let err = load_image("does-not-exist.jpg", Path::new(".")).unwrap_err();
        assert!(matches!(err, ReportError::ImageError(_)));
    }
}
