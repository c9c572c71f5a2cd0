// One simulation tick over the field arena. Pass order matters, each pass
// reads the previous pass's output:
// splat -> advect (velocity, dye) -> vorticity confinement -> divergence
// -> Jacobi pressure solve -> projection.
//
// Velocity is stored in normalized viewport spans per second, so the same
// field advects both the coarse simulation grids and the finer dye grid.

use glam::Vec2;

use crate::sim::config::SimConfig;
use crate::sim::fields::{FieldArena, Grid};
use crate::sim::pointer::{PointerRecord, PointerSet};

/// Impulse scale for a released pointer's final, decaying splat.
const LINGER_IMPULSE: f32 = 0.35;

/// Splats are cut off past this many falloff radii.
const SPLAT_CUTOFF: f32 = 3.0;

pub fn step(arena: &mut FieldArena, pointers: &PointerSet, dt: f32, config: &SimConfig) {
    splat(arena, pointers.records(), config);
    advect_velocity(arena, dt, config);
    advect_dye(arena, dt, config);
    confine_vorticity(arena, dt, config.curl_strength);
    compute_divergence(arena);
    pressure_solve(arena, config);
    project(arena);
}

// ---------------------------------------------------------------- splat

fn splat(arena: &mut FieldArena, records: &[PointerRecord], config: &SimConfig) {
    for rec in records {
        let strength = if rec.active { 1.0 } else { LINGER_IMPULSE };

        let impulse = rec.velocity * config.splat_force * strength;
        splat_into(
            arena.velocity.read_mut(),
            rec.pos,
            &[impulse.x, impulse.y],
            config.splat_radius,
        );

        // Fast motion paints more strongly than a stationary press, but a
        // press still leaves a faint trace.
        let speed_t = (rec.velocity.length() / config.max_pointer_speed).clamp(0.0, 1.0);
        let paint = strength * (0.2 + 0.8 * speed_t);
        let dye = [
            rec.color[0] * paint,
            rec.color[1] * paint,
            rec.color[2] * paint,
        ];
        splat_into(arena.dye.read_mut(), rec.pos, &dye, config.splat_radius);
    }
}

/// Adds a Gaussian-falloff impulse centered at a normalized position.
/// Distances are measured in short-axis units so the splat stays round on
/// non-square viewports.
fn splat_into(grid: &mut Grid, center: Vec2, values: &[f32], radius: f32) {
    let w = grid.width();
    let h = grid.height();
    if w == 0 || h == 0 {
        return;
    }
    let wf = w as f32;
    let hf = h as f32;
    let aspect = wf / hf;

    // Normalized half-extents of the affected box.
    let (rx, ry) = if aspect >= 1.0 {
        (SPLAT_CUTOFF * radius / aspect, SPLAT_CUTOFF * radius)
    } else {
        (SPLAT_CUTOFF * radius, SPLAT_CUTOFF * radius * aspect)
    };

    let x0 = (((center.x - rx) * wf).floor() as i64).clamp(0, w as i64 - 1) as u32;
    let x1 = (((center.x + rx) * wf).ceil() as i64).clamp(0, w as i64 - 1) as u32;
    let y0 = (((center.y - ry) * hf).floor() as i64).clamp(0, h as i64 - 1) as u32;
    let y1 = (((center.y + ry) * hf).ceil() as i64).clamp(0, h as i64 - 1) as u32;

    let inv_r2 = 1.0 / (radius * radius);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let mut dx = (x as f32 + 0.5) / wf - center.x;
            let mut dy = (y as f32 + 0.5) / hf - center.y;
            if aspect >= 1.0 {
                dx *= aspect;
            } else {
                dy /= aspect;
            }
            let weight = (-(dx * dx + dy * dy) * inv_r2).exp();
            for (c, v) in values.iter().enumerate() {
                grid.add(x, y, c, v * weight);
            }
        }
    }
}

// ------------------------------------------------------------ advection

/// Semi-Lagrangian advection: sample the source at the position traced
/// backward along the velocity. Unconditionally stable for large dt.
/// After sampling, the quantity decays by its dissipation retention.
fn advect(read: &Grid, write: &mut Grid, velocity: &Grid, dt: f32, retention: f32) {
    let w = write.width();
    let h = write.height();
    let inv_w = 1.0 / w as f32;
    let inv_h = 1.0 / h as f32;

    for y in 0..h {
        for x in 0..w {
            let here = Vec2::new((x as f32 + 0.5) * inv_w, (y as f32 + 0.5) * inv_h);
            let vel = Vec2::new(
                velocity.sample_norm(here, 0),
                velocity.sample_norm(here, 1),
            );
            let src = here - vel * dt;
            for c in 0..write.components() {
                write.set(x, y, c, read.sample_norm(src, c) * retention);
            }
        }
    }
}

fn advect_velocity(arena: &mut FieldArena, dt: f32, config: &SimConfig) {
    let retention = SimConfig::retention(config.velocity_dissipation, dt);
    {
        let (read, write) = arena.velocity.read_write();
        advect(read, write, read, dt, retention);
    }
    arena.velocity.swap();
    enforce_no_slip(arena.velocity.read_mut());
}

fn advect_dye(arena: &mut FieldArena, dt: f32, config: &SimConfig) {
    let retention = SimConfig::retention(config.dye_dissipation, dt);
    let velocity = arena.velocity.read();
    let (read, write) = arena.dye.read_write();
    advect(read, write, velocity, dt, retention);
    arena.dye.swap();
}

// ------------------------------------------- curl & vorticity confinement

/// Semi-Lagrangian advection smears small vortices out; this pass pushes
/// velocity along the rotated gradient of |curl| to put them back.
fn confine_vorticity(arena: &mut FieldArena, dt: f32, strength: f32) {
    if strength <= 0.0 {
        return;
    }

    compute_curl(arena);

    let curl = &arena.curl;
    let (read, write) = arena.velocity.read_write();
    let w = read.width();
    let h = read.height();

    for y in 0..h {
        for x in 0..w {
            let xi = x as i64;
            let yi = y as i64;
            let l = curl.get_clamped(xi - 1, yi, 0).abs();
            let r = curl.get_clamped(xi + 1, yi, 0).abs();
            let t = curl.get_clamped(xi, yi - 1, 0).abs();
            let b = curl.get_clamped(xi, yi + 1, 0).abs();

            let grad = Vec2::new(r - l, b - t) * 0.5;
            let n = grad / (grad.length() + 1e-5);
            let c = curl.get(x, y, 0);
            let force = strength * c * Vec2::new(n.y, -n.x);

            write.set(x, y, 0, read.get(x, y, 0) + force.x * dt);
            write.set(x, y, 1, read.get(x, y, 1) + force.y * dt);
        }
    }
    arena.velocity.swap();
    // The confinement force must not punch through the closed box;
    // leaving it in the ring would feed spurious inflow to the
    // divergence pass.
    enforce_no_slip(arena.velocity.read_mut());
}

fn compute_curl(arena: &mut FieldArena) {
    let velocity = arena.velocity.read();
    let curl = &mut arena.curl;
    let w = curl.width();
    let h = curl.height();

    for y in 0..h {
        for x in 0..w {
            let xi = x as i64;
            let yi = y as i64;
            let dvdx = (velocity.get_clamped(xi + 1, yi, 1) - velocity.get_clamped(xi - 1, yi, 1)) * 0.5;
            let dudy = (velocity.get_clamped(xi, yi + 1, 0) - velocity.get_clamped(xi, yi - 1, 0)) * 0.5;
            curl.set(x, y, 0, dvdx - dudy);
        }
    }
}

// ------------------------------------------------ divergence & pressure

fn compute_divergence(arena: &mut FieldArena) {
    let velocity = arena.velocity.read();
    let div = &mut arena.divergence;
    let w = div.width();
    let h = div.height();

    for y in 0..h {
        for x in 0..w {
            let xi = x as i64;
            let yi = y as i64;
            let dudx = (velocity.get_clamped(xi + 1, yi, 0) - velocity.get_clamped(xi - 1, yi, 0)) * 0.5;
            let dvdy = (velocity.get_clamped(xi, yi + 1, 1) - velocity.get_clamped(xi, yi - 1, 1)) * 0.5;
            div.set(x, y, 0, dudx + dvdy);
        }
    }
}

/// Fixed-count Jacobi relaxation of the discrete Poisson equation
/// `laplacian(p) = divergence`. Warm-started from last tick's attenuated
/// pressure; reuse converges faster and avoids visible popping.
fn pressure_solve(arena: &mut FieldArena, config: &SimConfig) {
    {
        let p = arena.pressure.read_mut();
        let retention = config.pressure_retention;
        let w = p.width();
        let h = p.height();
        for y in 0..h {
            for x in 0..w {
                let v = p.get(x, y, 0) * retention;
                p.set(x, y, 0, v);
            }
        }
    }

    for _ in 0..config.pressure_iterations {
        let div = &arena.divergence;
        let (read, write) = arena.pressure.read_write();
        let w = read.width();
        let h = read.height();
        for y in 0..h {
            for x in 0..w {
                let xi = x as i64;
                let yi = y as i64;
                // Edge clamping doubles as the Neumann boundary condition.
                let l = read.get_clamped(xi - 1, yi, 0);
                let r = read.get_clamped(xi + 1, yi, 0);
                let t = read.get_clamped(xi, yi - 1, 0);
                let b = read.get_clamped(xi, yi + 1, 0);
                write.set(x, y, 0, (l + r + t + b - div.get(x, y, 0)) * 0.25);
            }
        }
        arena.pressure.swap();
    }
}

/// Subtracts the pressure gradient, leaving velocity approximately
/// divergence-free for the next tick's advection.
fn project(arena: &mut FieldArena) {
    {
        let pressure = arena.pressure.read();
        let (read, write) = arena.velocity.read_write();
        let w = read.width();
        let h = read.height();

        for y in 0..h {
            for x in 0..w {
                let xi = x as i64;
                let yi = y as i64;
                let dpdx = (pressure.get_clamped(xi + 1, yi, 0) - pressure.get_clamped(xi - 1, yi, 0)) * 0.5;
                let dpdy = (pressure.get_clamped(xi, yi + 1, 0) - pressure.get_clamped(xi, yi - 1, 0)) * 0.5;
                write.set(x, y, 0, read.get(x, y, 0) - dpdx);
                write.set(x, y, 1, read.get(x, y, 1) - dpdy);
            }
        }
    }
    arena.velocity.swap();
    enforce_no_slip(arena.velocity.read_mut());
}

/// Closed-box boundary: velocity is zeroed on the outermost cell ring.
fn enforce_no_slip(velocity: &mut Grid) {
    let w = velocity.width();
    let h = velocity.height();
    if w == 0 || h == 0 {
        return;
    }
    for x in 0..w {
        for c in 0..2 {
            velocity.set(x, 0, c, 0.0);
            velocity.set(x, h - 1, c, 0.0);
        }
    }
    for y in 0..h {
        for c in 0..2 {
            velocity.set(0, y, c, 0.0);
            velocity.set(w - 1, y, c, 0.0);
        }
    }
}

// ---------------------------------------------------------- diagnostics

/// Mean velocity magnitude over the whole grid.
pub fn mean_speed(arena: &FieldArena) -> f32 {
    let velocity = arena.velocity.read();
    let w = velocity.width();
    let h = velocity.height();
    let cells = (w * h) as f32;
    if cells == 0.0 {
        return 0.0;
    }
    let mut sum = 0.0;
    for y in 0..h {
        for x in 0..w {
            let u = velocity.get(x, y, 0);
            let v = velocity.get(x, y, 1);
            sum += (u * u + v * v).sqrt();
        }
    }
    sum / cells
}

/// Total dye intensity, summed over channels and cells.
pub fn total_dye(arena: &FieldArena) -> f32 {
    arena.dye.read().data().iter().sum()
}

/// L-infinity norm of the discrete divergence of the current velocity.
pub fn divergence_linf(arena: &FieldArena) -> f32 {
    let velocity = arena.velocity.read();
    let w = velocity.width();
    let h = velocity.height();
    let mut max = 0.0f32;
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let xi = x as i64;
            let yi = y as i64;
            let dudx = (velocity.get_clamped(xi + 1, yi, 0) - velocity.get_clamped(xi - 1, yi, 0)) * 0.5;
            let dvdy = (velocity.get_clamped(xi, yi + 1, 1) - velocity.get_clamped(xi, yi - 1, 1)) * 0.5;
            max = max.max((dudx + dvdy).abs());
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fields::Viewport;

    fn boundary_is_at_rest(velocity: &Grid) -> bool {
        let (w, h) = (velocity.width(), velocity.height());
        for x in 0..w {
            for c in 0..2 {
                if velocity.get(x, 0, c) != 0.0 || velocity.get(x, h - 1, c) != 0.0 {
                    return false;
                }
            }
        }
        for y in 0..h {
            for c in 0..2 {
                if velocity.get(0, y, c) != 0.0 || velocity.get(w - 1, y, c) != 0.0 {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn confinement_keeps_the_boundary_ring_at_rest() {
        let config = SimConfig {
            sim_resolution: 32,
            dye_resolution: 32,
            ..SimConfig::default()
        };
        let mut arena = FieldArena::allocate(&config, Viewport::new(320, 320)).unwrap();

        // A blob hugging the wall gives |curl| a steep gradient right in
        // the boundary cells.
        splat_into(
            arena.velocity.read_mut(),
            Vec2::new(0.15, 0.2),
            &[0.0, 1.5],
            0.1,
        );
        enforce_no_slip(arena.velocity.read_mut());
        assert!(boundary_is_at_rest(arena.velocity.read()));

        confine_vorticity(&mut arena, 1.0 / 60.0, 30.0);
        assert!(boundary_is_at_rest(arena.velocity.read()));
    }
}
