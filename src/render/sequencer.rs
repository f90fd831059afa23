use std::collections::VecDeque;

use image::RgbImage;
use rayon::prelude::*;

use crate::audio::extractor::FeatureExtractor;
use crate::audio::features::FeatureSnapshot;
use crate::error::VizError;
use crate::render::visualizer::Visualizer;

/// Snapshots extracted ahead of the renderer per batch.
const PREFETCH_FRAMES: usize = 32;

/// Number of whole frames in `duration` seconds at `fps`.
pub fn frame_count(duration: f64, fps: u32) -> usize {
    let frames = (duration * fps as f64).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

/// Walks the timeline frame by frame, feeding snapshots to one visualizer.
///
/// Yields frames strictly in ascending order. Feature extraction for the next
/// batch runs in parallel; rendering stays on the calling thread. The
/// sequence cannot be restarted since the visualizer state has advanced;
/// dropping it early leaves a valid prefix.
pub struct FrameSequencer<'a> {
    extractor: &'a FeatureExtractor<'a>,
    visualizer: Box<dyn Visualizer>,
    fps: u32,
    num_frames: usize,
    next_frame: usize,
    pending: VecDeque<FeatureSnapshot>,
}

impl<'a> FrameSequencer<'a> {
    pub fn new(
        extractor: &'a FeatureExtractor<'a>,
        visualizer: Box<dyn Visualizer>,
        duration: f64,
        fps: u32,
    ) -> Result<Self, VizError> {
        let num_frames = frame_count(duration, fps);
        if num_frames == 0 {
            return Err(VizError::EmptyFrameSequence { duration, fps });
        }

        Ok(Self {
            extractor,
            visualizer,
            fps,
            num_frames,
            next_frame: 0,
            pending: VecDeque::with_capacity(PREFETCH_FRAMES),
        })
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    fn prefetch(&mut self) {
        let start = self.next_frame + self.pending.len();
        let end = (start + PREFETCH_FRAMES).min(self.num_frames);
        let extractor = self.extractor;
        let fps = self.fps;

        // collect() on an indexed parallel iterator keeps frame order
        let batch: Vec<FeatureSnapshot> = (start..end)
            .into_par_iter()
            .map(|frame_idx| extractor.snapshot(frame_idx, fps))
            .collect();
        self.pending.extend(batch);
    }
}

impl Iterator for FrameSequencer<'_> {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        if self.next_frame >= self.num_frames {
            return None;
        }
        if self.pending.is_empty() {
            self.prefetch();
        }

        let snapshot = self.pending.pop_front()?;
        let frame = self.visualizer.render_frame(&snapshot);
        self.next_frame += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_frames - self.next_frame;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSequencer<'_> {}
