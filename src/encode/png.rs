use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Writes each frame as `frame_NNNNN.png` into a directory.
pub struct PngFrameWriter {
    dir: PathBuf,
    next_index: usize,
}

impl PngFrameWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create frames dir: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            next_index: 0,
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", index))
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.frame_path(self.next_index);
        frame
            .save(&path)
            .with_context(|| format!("Failed to save frame {}", path.display()))?;
        self.next_index += 1;
        Ok(())
    }
}
