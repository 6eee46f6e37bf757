//! Frame source for still images loaded from disk.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::image::Image;

use super::FrameSource;

/// A [`FrameSource`] that cycles through a set of still images.
///
/// This covers the snapshot use case, where the user uploads or captures single pictures instead
/// of streaming from a camera.
pub struct StillImages {
    images: Vec<Image>,
    next: usize,
}

impl StillImages {
    /// Loads all images at `paths`.
    ///
    /// Fails if any image cannot be loaded, or if `paths` is empty.
    pub fn open<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> anyhow::Result<Self> {
        let images = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                Image::load(path).with_context(|| format!("failed to load '{}'", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Self::from_images(images)
    }

    /// Loads every `.png`, `.jpg` and `.jpeg` file in `dir`, in file name order.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read directory '{}'", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<PathBuf>, _>>()?;
        paths.retain(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("png" | "jpg" | "jpeg")
            )
        });
        paths.sort();
        log::debug!("loading {} images from '{}'", paths.len(), dir.display());
        Self::open(paths)
    }

    pub fn from_images(images: Vec<Image>) -> anyhow::Result<Self> {
        if images.is_empty() {
            bail!("no images to show");
        }
        Ok(Self { images, next: 0 })
    }
}

impl FrameSource for StillImages {
    fn read(&mut self) -> anyhow::Result<Image> {
        let image = self.images[self.next].clone();
        self.next = (self.next + 1) % self.images.len();
        Ok(image)
    }
}
