//! End-to-end field scenarios on the headless surface and runner

use std::cell::RefCell;
use std::rc::Rc;

use particle_field::FieldSettings;
use particle_field::platform::{
    CancelToken, HeadlessRunner, HeadlessSurface, QueuedFrames, run_until_cancelled,
};
use particle_field::sim::{BatchStart, ParticleField, SpawnerState, Viewport};
use rand_pcg::Pcg32;

type TestField = ParticleField<Pcg32, HeadlessSurface>;

fn desktop_field(settings: FieldSettings, seed: u64) -> TestField {
    ParticleField::seeded(
        settings,
        Viewport::new(1000.0, 500.0, 1.0),
        HeadlessSurface::new(),
        seed,
    )
    .unwrap()
}

#[test]
fn test_first_batch_is_spread_over_sub_ticks() {
    let mut field = desktop_field(FieldSettings::default(), 7);
    field.populate(0.0);
    let mut runner = HeadlessRunner::new(0.0, 1000.0 / 60.0);

    // Just before the first batch tick nothing beyond the initial ten exists
    runner.run(&mut field, 4_999.0);
    assert_eq!(field.surface().attached(), 10);

    // One batch of 140 at 1 per 33ms sub-tick finishes by 5000 + 140 * 33
    let summary = runner.run(&mut field, 9_700.0 - 4_999.0);
    assert_eq!(summary.batches, 1);
    assert_eq!(field.surface().attached(), 150);
    assert!(!field.is_distributing());
}

#[test]
fn test_initial_particles_expire_within_eight_seconds() {
    let mut field = desktop_field(
        FieldSettings {
            // No batches inside the window we look at
            batch_interval_ms: 60_000,
            ..FieldSettings::default()
        },
        11,
    );
    field.populate(0.0);
    let mut runner = HeadlessRunner::new(0.0, 1000.0 / 60.0);

    let summary = runner.run(&mut field, 8_100.0);
    assert_eq!(summary.expired, 10);
    assert_eq!(summary.final_live, 0);
    assert_eq!(field.surface().live(), 0);
}

#[test]
fn test_overlapping_batches_merge_into_one_stream() {
    let settings = FieldSettings {
        // 140 particles at one per 50ms takes 7s, longer than the 5s period
        sub_tick_interval_ms: 50,
        ..FieldSettings::default()
    };
    let mut field = desktop_field(settings, 3);
    let mut runner = HeadlessRunner::new(0.0, 1000.0 / 60.0);

    runner.run(&mut field, 10_000.0);
    assert!(matches!(
        field.spawner().state(),
        SpawnerState::Distributing { per_sub_tick: 2, .. }
    ));

    // Drain the merged stream directly
    let mut t = runner.now();
    while field.is_distributing() {
        t += 50.0;
        field.spawn_sub_tick(t);
    }
    assert_eq!(field.surface().attached(), 280);
    assert_eq!(field.spawner().spawned_total(), 280);
}

#[test]
fn test_same_seed_same_run() {
    let run = |seed| {
        let mut field = desktop_field(FieldSettings::default(), seed);
        field.populate(0.0);
        HeadlessRunner::new(0.0, 1000.0 / 60.0).run(&mut field, 12_000.0);
        field.particles().cloned().collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}

#[test]
fn test_resize_shrinks_density_and_clamps() {
    let mut field = desktop_field(FieldSettings::default(), 5);
    field.populate(0.0);
    field.tick(16.0);

    field.resize(Viewport::new(200.0, 100.0, 2.0));
    assert!(field.particles().all(|p| p.pos.x <= 200.0 && p.pos.y <= 100.0));
    // 200x100 css px at 2x -> 100x50 device-independent px -> ~3.5 cm²
    assert_eq!(field.batch_size(), 1);
    assert_eq!(field.begin_batch(), BatchStart::Started);
}

#[test]
fn test_population_cap_bounds_growth() {
    let settings = FieldSettings {
        max_particles: Some(50),
        ..FieldSettings::default()
    };
    let mut field = desktop_field(settings, 9);
    field.populate(0.0);
    let summary = HeadlessRunner::new(0.0, 1000.0 / 60.0).run(&mut field, 20_000.0);
    assert!(summary.peak_live <= 50);
    assert!(field.skipped() > 0);
}

#[test]
fn test_frame_loop_drives_field_until_stopped() {
    let field = Rc::new(RefCell::new(desktop_field(FieldSettings::default(), 21)));
    field.borrow_mut().populate(0.0);
    field.borrow_mut().begin_batch();

    let frames = Rc::new(QueuedFrames::new());
    let token = CancelToken::new();
    let ticks = Rc::new(RefCell::new(0));

    let stepped = Rc::clone(&field);
    let counter = Rc::clone(&ticks);
    run_until_cancelled(Rc::clone(&frames), token.clone(), move |time| {
        stepped.borrow_mut().tick(time);
        *counter.borrow_mut() += 1;
    });

    for frame in 1..=30 {
        frames.fire(frame as f64 * 16.0);
    }
    assert_eq!(*ticks.borrow(), 30);

    // Stop: cancel the loop, then tear the field down
    token.cancel();
    field.borrow_mut().clear();
    assert!(frames.fire(496.0));
    assert!(!frames.fire(512.0));
    assert_eq!(*ticks.borrow(), 30);

    let field = field.borrow();
    assert!(field.is_empty());
    assert!(!field.is_distributing());
    assert_eq!(field.surface().live(), 0);
    assert_eq!(field.surface().released(), 10);
}
