//! Particle Field entry point
//!
//! On the web, attaches the effect to the page background once the DOM is
//! ready. Natively, runs a headless simulation and logs what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;

    use particle_field::FieldError;
    use particle_field::FieldSettings;
    use particle_field::platform::web::{BackgroundEffect, on_page_ready};

    thread_local! {
        // Owned for the page's lifetime; dropping it would stop the effect
        static EFFECT: RefCell<Option<BackgroundEffect>> = const { RefCell::new(None) };
    }

    fn boot() -> Result<(), FieldError> {
        let mut effect = BackgroundEffect::new(FieldSettings::default())?;
        effect.start()?;
        EFFECT.with(|slot| *slot.borrow_mut() = Some(effect));
        Ok(())
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Particle field starting...");

        let ready = on_page_ready(|| {
            if let Err(e) = boot() {
                log::error!("Particle field failed to start: {}", e);
            }
        });
        if let Err(e) = ready {
            log::error!("Could not wait for page ready: {}", e);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use particle_field::FieldSettings;
    use particle_field::platform::{HeadlessRunner, HeadlessSurface};
    use particle_field::sim::{ParticleField, Viewport};

    env_logger::init();
    log::info!("Particle field (native) starting...");
    log::info!("Native mode runs headless - build for wasm32 to see the effect in a page");

    let settings = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| FieldSettings::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                log::error!("Could not load settings from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => FieldSettings::default(),
    };

    let seed = settings.seed.unwrap_or(0x5eed);
    let viewport = Viewport::new(1920.0, 1080.0, 1.0);
    let mut field = match ParticleField::seeded(settings, viewport, HeadlessSurface::new(), seed)
    {
        Ok(field) => field,
        Err(e) => {
            log::error!("Invalid settings: {}", e);
            std::process::exit(1);
        }
    };
    log::info!(
        "Viewport {}x{}: {:.1} cm², batch size {}",
        viewport.width,
        viewport.height,
        field.area_cm2(),
        field.batch_size()
    );

    field.populate(0.0);
    let mut runner = HeadlessRunner::new(0.0, 1000.0 / 60.0);

    for second in 1..=30 {
        let summary = runner.run(&mut field, 1000.0);
        if second % 5 == 0 {
            log::info!(
                "t={:>2}s live={:>4} expired={:>4} batches={} pending={}",
                second,
                summary.final_live,
                summary.expired,
                summary.batches,
                field.spawner().remaining()
            );
        }
    }

    println!(
        "Simulated 30s: {} live particles, {} elements attached, {} released",
        field.len(),
        field.surface().attached(),
        field.surface().released()
    );
}
