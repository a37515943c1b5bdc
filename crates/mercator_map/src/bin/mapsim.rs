//! # MAPSIM - Synthetic World Renderer
//!
//! Drives the full engine pipeline over a seeded synthetic world and writes
//! the composited viewport to a PPM image. Useful for eyeballing compositor
//! changes without a host application.
//!
//! Usage: `mapsim [seed] [output.ppm]`

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use mercator_core::{MapConfig, RegionCoord};
use mercator_map::{
    MapSession, MemoryStore, SharedWorld, ViewportWindow, WorldSource,
};
use mercator_world::{BlockWorld, SyntheticWorld};

/// Regions on each side of the origin; the rendered image covers the full
/// square, 256 pixels per region.
const VIEW_RADIUS: i32 = 1;

const DEFAULT_SEED: u64 = 42;

/// A source that always reports the same world.
struct FixedSource {
    world: Arc<dyn BlockWorld + Send + Sync>,
}

impl WorldSource for FixedSource {
    fn current(&self) -> Option<(String, Arc<dyn BlockWorld + Send + Sync>)> {
        Some(("synthetic".to_owned(), Arc::clone(&self.world)))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(raw) => raw.parse()?,
        None => DEFAULT_SEED,
    };
    let out_path = args.next().unwrap_or_else(|| "mapsim.ppm".to_owned());

    let mut world = SyntheticWorld::new(seed);
    for rz in -VIEW_RADIUS..=VIEW_RADIUS {
        for rx in -VIEW_RADIUS..=VIEW_RADIUS {
            world.ensure_region(RegionCoord::new(rx, rz));
        }
    }
    let world: Arc<dyn BlockWorld + Send + Sync> = Arc::new(SharedWorld::new(world));
    let source = Arc::new(FixedSource { world });

    let mut config = MapConfig::default();
    config.change_debounce_ticks = 0;
    config.periodic_refresh_ms = 0;
    let session = MapSession::new(source, Arc::new(MemoryStore::new()), config);
    session.on_tick(10_000);

    let mut options = session.render_options();
    options.chunk_grid = true;
    session.set_render_options(options);
    session.set_navigation_path(&[(-200, -200), (0, 0), (180, 120)]);

    let window = ViewportWindow::new(-VIEW_RADIUS, VIEW_RADIUS, -VIEW_RADIUS, VIEW_RADIUS);
    let view = session.resolve_viewport(window, 10_000);
    let stats = session.render_view(&view, 10_000);
    println!(
        "seed {seed}: resampled {} chunks, rendered {} chunks",
        stats.chunks_resampled, stats.chunks_rendered
    );

    let (width, height, pixels) = session.rasterize(&view);
    let mut out = BufWriter::new(File::create(&out_path)?);
    writeln!(out, "P6\n{width} {height}\n255")?;
    for pixel in pixels {
        let rgb = [
            ((pixel >> 16) & 0xFF) as u8,
            ((pixel >> 8) & 0xFF) as u8,
            (pixel & 0xFF) as u8,
        ];
        out.write_all(&rgb)?;
    }
    out.flush()?;
    println!("wrote {width}x{height} image to {out_path}");
    Ok(())
}
