use fluid_backdrop::sim::fields::{FieldArena, Viewport};
use fluid_backdrop::sim::pointer::{PointerId, PointerSet};
use fluid_backdrop::sim::solver;
use fluid_backdrop::{Backdrop, SimConfig};
use glam::Vec2;

const DT: f32 = 1.0 / 60.0;

fn quiet_config() -> SimConfig {
    SimConfig {
        sim_resolution: 64,
        dye_resolution: 64,
        curl_strength: 0.0,
        ..SimConfig::default()
    }
}

/// A sharp radial outflow centered on the grid: strongly divergent, so the
/// pressure projection has real work to do.
fn seed_radial_outflow(arena: &mut FieldArena) {
    let vel = arena.velocity.read_mut();
    let (w, h) = (vel.width(), vel.height());
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 / w as f32 - 0.5;
            let dy = y as f32 / h as f32 - 0.5;
            let falloff = (-(dx * dx + dy * dy) * 300.0).exp();
            vel.set(x, y, 0, dx * falloff * 4.0);
            vel.set(x, y, 1, dy * falloff * 4.0);
        }
    }
}

#[test]
fn velocity_energy_drains_without_input() {
    let config = SimConfig {
        velocity_dissipation: 0.9,
        ..quiet_config()
    };
    let mut arena = FieldArena::allocate(&config, Viewport::new(640, 640)).unwrap();
    seed_radial_outflow(&mut arena);
    let idle = PointerSet::seeded(config.max_pointer_speed, 7);

    let mut previous = solver::mean_speed(&arena);
    let initial = previous;
    for _ in 0..40 {
        solver::step(&mut arena, &idle, DT, &config);
        let current = solver::mean_speed(&arena);
        assert!(
            current <= previous * 1.001 + 1e-7,
            "mean speed rose from {previous} to {current}"
        );
        previous = current;
    }
    assert!(
        previous < initial * 0.5,
        "mean speed barely drained: {initial} -> {previous}"
    );
}

#[test]
fn more_pressure_iterations_leave_less_divergence() {
    let residual_after = |iterations: u32| {
        let config = SimConfig {
            pressure_iterations: iterations,
            velocity_dissipation: 1.0,
            ..quiet_config()
        };
        let mut arena = FieldArena::allocate(&config, Viewport::new(640, 640)).unwrap();
        seed_radial_outflow(&mut arena);
        let idle = PointerSet::seeded(config.max_pointer_speed, 7);
        solver::step(&mut arena, &idle, DT, &config);
        solver::divergence_linf(&arena)
    };

    let coarse = residual_after(5);
    let medium = residual_after(20);
    let fine = residual_after(80);

    assert!(
        fine <= medium * 1.0001 && medium <= coarse * 1.0001,
        "residuals not monotone: 5 it -> {coarse}, 20 it -> {medium}, 80 it -> {fine}"
    );
    assert!(fine < coarse, "80 iterations no better than 5: {fine} vs {coarse}");
}

#[test]
fn splats_inject_velocity_and_dye() {
    let config = quiet_config();
    let mut arena = FieldArena::allocate(&config, Viewport::new(640, 640)).unwrap();

    let mut pointers = PointerSet::seeded(config.max_pointer_speed, 3);
    pointers.down(PointerId::Mouse, Vec2::new(0.5, 0.5));
    pointers.moved(PointerId::Mouse, Vec2::new(0.55, 0.5));
    pointers.commit(DT);

    solver::step(&mut arena, &pointers, DT, &config);

    assert!(solver::mean_speed(&arena) > 0.0);
    assert!(solver::total_dye(&arena) > 0.0);
}

/// End-to-end dissipation: a 10-sample accelerating drag, release, then
/// 60 input-free ticks must leave total dye strictly below its peak.
#[test]
fn dye_intensity_falls_back_below_its_peak() {
    let config = SimConfig::default();
    let mut backdrop = Backdrop::with_seeded_pointers(config, 42).unwrap();
    backdrop.start(Viewport::new(800, 600)).unwrap();

    backdrop.pointer_down(PointerId::Mouse, Vec2::new(0.2, 0.5));

    let mut peak = 0.0f32;
    let mut x = 0.2;
    for i in 0..10 {
        x += 0.005 * (i + 1) as f32;
        backdrop.pointer_moved(PointerId::Mouse, Vec2::new(x, 0.5));
        backdrop.tick(DT).unwrap();
        peak = peak.max(solver::total_dye(backdrop.arena().unwrap()));
    }
    assert!(peak > 0.0, "injection never painted any dye");

    backdrop.pointer_up(PointerId::Mouse);
    for _ in 0..60 {
        backdrop.tick(DT).unwrap();
    }

    let settled = solver::total_dye(backdrop.arena().unwrap());
    assert!(
        settled < peak,
        "dye did not decay: peak {peak}, after 60 idle ticks {settled}"
    );
}
