// One record per contact, whatever the device. Mouse and touch events are
// translated onto the same operations so the solver never branches on
// input type.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Stable identity for a contact: a sentinel for the primary mouse
/// pointer, the device-assigned id for each touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

#[derive(Clone, Debug)]
pub struct PointerRecord {
    pub id: PointerId,
    /// Current position, normalized to [0,1]^2 (origin top-left). Stored
    /// normalized so a viewport resize never needs a coordinate remap.
    pub pos: Vec2,
    /// Position at the last `commit`.
    pub prev_pos: Vec2,
    /// Net frame travel over frame time, clamped to the configured
    /// ceiling. Units: normalized spans per second.
    pub velocity: Vec2,
    /// Dye color this contact injects, linear RGB.
    pub color: [f32; 3],
    /// Button/touch down. An inactive record survives exactly one more
    /// tick so the splat pass can inject a final, decaying impulse.
    pub active: bool,
}

pub struct PointerSet {
    records: Vec<PointerRecord>,
    rng: SmallRng,
    max_speed: f32,
}

impl PointerSet {
    pub fn new(max_speed: f32) -> Self {
        Self {
            records: Vec::new(),
            rng: SmallRng::from_entropy(),
            max_speed,
        }
    }

    /// Deterministic colors, for tests.
    pub fn seeded(max_speed: f32, seed: u64) -> Self {
        Self {
            records: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            max_speed,
        }
    }

    pub fn records(&self) -> &[PointerRecord] {
        &self.records
    }

    pub fn get(&self, id: PointerId) -> Option<&PointerRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Down event: creates (or revives) the record and assigns it a fresh
    /// splat color.
    pub fn down(&mut self, id: PointerId, pos: Vec2) {
        let color = random_splat_color(&mut self.rng);
        if let Some(rec) = self.records.iter_mut().find(|r| r.id == id) {
            rec.pos = pos;
            rec.prev_pos = pos;
            rec.velocity = Vec2::ZERO;
            rec.color = color;
            rec.active = true;
            return;
        }
        self.records.push(PointerRecord {
            id,
            pos,
            prev_pos: pos,
            velocity: Vec2::ZERO,
            color,
            active: true,
        });
    }

    /// Move event: records a new position sample. Samples within one
    /// frame coalesce, velocity is derived from the net frame delta at
    /// `commit`. Moves for unknown ids (hover without a down) are
    /// ignored.
    pub fn moved(&mut self, id: PointerId, pos: Vec2) {
        if let Some(rec) = self.records.iter_mut().find(|r| r.id == id) {
            rec.pos = pos;
        }
    }

    /// Turns the position deltas accumulated since the previous commit
    /// into velocities. Called once per tick, so a burst of move events
    /// inside one frame counts as one frame of travel, not one timestep
    /// each. Spikes above the ceiling are clamped, a single long frame
    /// must not inject an unbounded impulse. A zero-length frame keeps
    /// the previous velocity and carries the delta forward.
    pub fn commit(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for rec in &mut self.records {
            rec.velocity = ((rec.pos - rec.prev_pos) / dt).clamp_length_max(self.max_speed);
            rec.prev_pos = rec.pos;
        }
    }

    /// Up or cancel event: the record turns inactive but is retained until
    /// the next `retire` so the solver sees it one final time.
    pub fn up(&mut self, id: PointerId) {
        if let Some(rec) = self.records.iter_mut().find(|r| r.id == id) {
            rec.active = false;
        }
    }

    /// Drops records whose final impulse has been consumed. Called by the
    /// scheduler after each tick's splat pass.
    pub fn retire(&mut self) {
        self.records.retain(|r| r.active);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Random-hue, dimmed color in the style of the classic WebGL fluid toys:
/// full-saturation HSV scaled down so repeated splats saturate slowly.
fn random_splat_color(rng: &mut SmallRng) -> [f32; 3] {
    let [r, g, b] = hsv_to_rgb(rng.gen_range(0.0..1.0), 1.0, 1.0);
    [r * 0.15, g * 0.15, b * 0.15]
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match (i as i32).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
