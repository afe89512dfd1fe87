mod config;
mod demo;
mod input;

use anyhow::{Context, Result};
use config::ViewerConfig;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tessel_renderer::Renderer;

/// Counts frames and reports the rate once per second.
struct FrameTimer {
    elapsed: Duration,
    frames: u32,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    /// Record one frame. Returns frames per second when a second has passed.
    fn tick(&mut self, delta: Duration) -> Option<f32> {
        self.elapsed += delta;
        self.frames += 1;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let fps = self.frames as f32 / self.elapsed.as_secs_f32();
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(fps)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Tessel Viewer");

    let config = match std::env::args_os().nth(1) {
        Some(path) => ViewerConfig::load(Path::new(&path))?,
        None => ViewerConfig::default(),
    };

    run(&config)
}

fn run(config: &ViewerConfig) -> Result<()> {
    let start = Instant::now();
    let scene = demo::build_scene(&config.scene)?;
    log::info!("Scene built in {:.2?}", start.elapsed());

    let camera = Arc::new(RwLock::new(config.build_camera()));
    let mut renderer = Renderer::new(config.render.clone(), Arc::clone(&camera), Arc::new(scene))
        .context("Failed to initialize renderer")?;

    let mut timer = FrameTimer::new();
    let mut last_frame = Instant::now();

    for frame in 0..config.run.frames {
        // Applied between frames, while no tile holds the camera
        for scripted in config.run.input.iter().filter(|s| s.frame == frame) {
            let mut camera = camera.write().unwrap_or_else(PoisonError::into_inner);
            scripted.event.apply(&mut camera);
            log::debug!("Frame {}: {:?}", frame, scripted.event);
        }

        let accumulated = renderer
            .render()
            .with_context(|| format!("Failed to render frame {}", frame))?;

        let now = Instant::now();
        if let Some(fps) = timer.tick(now - last_frame) {
            log::info!("{:.1} fps ({} frames accumulated)", fps, accumulated);
        }
        last_frame = now;
    }

    log::info!(
        "Rendered {} frames in {:.2?}",
        config.run.frames,
        start.elapsed()
    );

    save_image(&renderer, &config.run.output)?;
    renderer.shutdown().context("Failed to stop render workers")?;
    Ok(())
}

fn save_image(renderer: &Renderer, path: &Path) -> Result<()> {
    let resolution = renderer.resolution();
    let image = image::RgbImage::from_raw(resolution.x, resolution.y, renderer.image().to_vec())
        .context("Image buffer does not match resolution")?;

    image
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    log::info!("Saved {}", path.display());
    Ok(())
}
