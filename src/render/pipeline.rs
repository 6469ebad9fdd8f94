use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::encode::manifest::FrameManifest;
use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::sequencer::{FrameSequencer, FrameState};
use crate::render::backend::FrameRasterizer;
use crate::render::cache::{CachedFrame, FrameCache, FrameCacheKey};

#[derive(Clone, Debug, Default)]
pub struct RenderThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    /// Frames that had to be rasterized during this call.
    pub frames_rendered: u64,
    /// Frames served from an image stored earlier.
    pub frames_reused: u64,
}

/// Resolve every frame of `sequencer` through `cache` and list them in output order.
///
/// In parallel mode the frame states are collected first and each distinct active set is
/// rasterized once on a rayon pool; the manifest order is the same as in sequential mode.
pub fn render_frames(
    sequencer: FrameSequencer<'_>,
    cache: &FrameCache,
    rasterizer: &dyn FrameRasterizer,
    threading: &RenderThreading,
) -> PianoResult<(FrameManifest, RenderStats)> {
    let started = Instant::now();
    let before = cache.stats();
    let total = sequencer.total_frames();

    let manifest = if threading.parallel {
        render_parallel(sequencer, cache, rasterizer, threading)?
    } else {
        render_sequential(sequencer, cache, rasterizer)?
    };

    let after = cache.stats();
    let frames_rendered = after.renders - before.renders;
    let stats = RenderStats {
        frames_total: total,
        frames_rendered,
        frames_reused: total.saturating_sub(frames_rendered),
    };
    tracing::info!(
        frames = stats.frames_total,
        rendered = stats.frames_rendered,
        reused = stats.frames_reused,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "frames resolved"
    );
    Ok((manifest, stats))
}

fn render_sequential(
    sequencer: FrameSequencer<'_>,
    cache: &FrameCache,
    rasterizer: &dyn FrameRasterizer,
) -> PianoResult<FrameManifest> {
    let total = sequencer.total_frames();
    let mut progress = Progress::new(total);
    let mut manifest = FrameManifest::with_capacity(usize::try_from(total).unwrap_or(0));
    for state in sequencer {
        let frame = cache.get_or_render(&state.active, rasterizer)?;
        manifest.push(frame.path);
        progress.tick();
    }
    Ok(manifest)
}

fn render_parallel(
    sequencer: FrameSequencer<'_>,
    cache: &FrameCache,
    rasterizer: &dyn FrameRasterizer,
    threading: &RenderThreading,
) -> PianoResult<FrameManifest> {
    let states: Vec<FrameState> = sequencer.collect();

    let mut first = HashMap::<FrameCacheKey, usize>::new();
    let mut unique_indices = Vec::<usize>::new();
    let mut frame_to_unique = Vec::<usize>::with_capacity(states.len());
    for (idx, state) in states.iter().enumerate() {
        let key = FrameCacheKey::from_active(&state.active);
        let slot = *first.entry(key).or_insert_with(|| {
            unique_indices.push(idx);
            unique_indices.len() - 1
        });
        frame_to_unique.push(slot);
    }
    tracing::info!(
        frames = states.len(),
        distinct = unique_indices.len(),
        "rendering distinct frames in parallel"
    );

    let pool = build_thread_pool(threading.threads)?;
    let resolved = pool.install(|| {
        unique_indices
            .par_iter()
            .map(|&idx| cache.get_or_render(&states[idx].active, rasterizer))
            .collect::<Vec<PianoResult<CachedFrame>>>()
    });
    let resolved = resolved.into_iter().collect::<PianoResult<Vec<_>>>()?;

    let mut manifest = FrameManifest::with_capacity(states.len());
    for slot in frame_to_unique {
        let frame = resolved.get(slot).ok_or_else(|| {
            PianoError::render("internal error: distinct frame missing from parallel results")
        })?;
        manifest.push(frame.path.clone());
    }
    Ok(manifest)
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> PianoResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PianoError::config(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PianoError::render(format!("failed to build rayon thread pool: {e}")))
}

/// Logs progress at every 10 % of the frames.
struct Progress {
    total: u64,
    done: u64,
    next_decile: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            total,
            done: 0,
            next_decile: 1,
        }
    }

    fn tick(&mut self) {
        self.done += 1;
        while self.next_decile <= 10 && self.done * 10 >= self.total * self.next_decile {
            tracing::info!(
                done = self.done,
                total = self.total,
                "rendered {}%",
                self.next_decile * 10
            );
            self.next_decile += 1;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
