// Buffer ownership for every simulation quantity: allocation, resize and
// ping-pong bookkeeping live here so no pass juggles raw Vecs.

use glam::{UVec2, Vec2};

use crate::error::ResourceError;
use crate::sim::config::SimConfig;

/// Physical pixel size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Grid dimensions for a given short-axis resolution: the short axis
    /// gets `base` cells, the long axis is scaled by the aspect ratio so
    /// cells stay square and splats stay round.
    pub fn grid_extent(&self, base: u32) -> UVec2 {
        let aspect = self.aspect();
        if aspect >= 1.0 {
            UVec2::new((base as f32 * aspect).round() as u32, base)
        } else {
            UVec2::new(base, (base as f32 / aspect).round() as u32)
        }
    }
}

/// A dense `width * height * components` float grid with clamped bilinear
/// sampling.
#[derive(Clone, Debug)]
pub struct Grid {
    size: UVec2,
    components: usize,
    data: Vec<f32>,
}

impl Grid {
    pub fn new(size: UVec2, components: usize) -> Self {
        Self {
            size,
            components,
            data: vec![0.0; (size.x * size.y) as usize * components],
        }
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.y
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.size.x + x) as usize * self.components
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32, c: usize) -> f32 {
        self.data[self.offset(x, y) + c]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, c: usize, value: f32) {
        let i = self.offset(x, y) + c;
        self.data[i] = value;
    }

    #[inline]
    pub fn add(&mut self, x: u32, y: u32, c: usize, value: f32) {
        let i = self.offset(x, y) + c;
        self.data[i] += value;
    }

    /// Edge-clamped fetch; out-of-range coordinates read the nearest cell.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64, c: usize) -> f32 {
        let x = x.clamp(0, self.size.x as i64 - 1) as u32;
        let y = y.clamp(0, self.size.y as i64 - 1) as u32;
        self.get(x, y, c)
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Bilinear sample at cell coordinates (cell centers at integers).
    /// Corners are clamped to the grid, no panics on out-of-range input.
    pub fn sample(&self, pos: Vec2, c: usize) -> f32 {
        let x0 = pos.x.floor() as i64;
        let y0 = pos.y.floor() as i64;
        let fx = pos.x - pos.x.floor();
        let fy = pos.y - pos.y.floor();

        let tl = self.get_clamped(x0, y0, c);
        let tr = self.get_clamped(x0 + 1, y0, c);
        let bl = self.get_clamped(x0, y0 + 1, c);
        let br = self.get_clamped(x0 + 1, y0 + 1, c);

        lerp(lerp(tl, tr, fx), lerp(bl, br, fx), fy)
    }

    /// Bilinear sample at normalized [0,1]^2 coordinates.
    #[inline]
    pub fn sample_norm(&self, pos: Vec2, c: usize) -> f32 {
        let cell = Vec2::new(
            pos.x * self.size.x as f32 - 0.5,
            pos.y * self.size.y as f32 - 0.5,
        );
        self.sample(cell, c)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Read/write pair for one quantity. After a pass writes, `swap` exchanges
/// the roles so the next pass reads the just-written data.
#[derive(Clone, Debug)]
pub struct DoubleGrid {
    read: Grid,
    write: Grid,
}

impl DoubleGrid {
    pub fn new(size: UVec2, components: usize) -> Self {
        Self {
            read: Grid::new(size, components),
            write: Grid::new(size, components),
        }
    }

    #[inline]
    pub fn read(&self) -> &Grid {
        &self.read
    }

    #[inline]
    pub fn read_mut(&mut self) -> &mut Grid {
        &mut self.read
    }

    /// Both halves at once, for passes that read the old state while
    /// producing the new one.
    #[inline]
    pub fn read_write(&mut self) -> (&Grid, &mut Grid) {
        (&self.read, &mut self.write)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }
}

/// All buffers the pipeline touches. Allocated on entering Running, freed
/// by dropping on dispose; nothing reads or writes outside that window.
pub struct FieldArena {
    pub velocity: DoubleGrid,
    pub dye: DoubleGrid,
    pub pressure: DoubleGrid,
    pub divergence: Grid,
    pub curl: Grid,
    sim_size: UVec2,
    dye_size: UVec2,
}

impl FieldArena {
    pub fn allocate(config: &SimConfig, viewport: Viewport) -> Result<Self, ResourceError> {
        if viewport.is_empty() {
            return Err(ResourceError::ZeroViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }

        let sim_size = viewport.grid_extent(config.sim_resolution);
        let dye_size = viewport.grid_extent(config.dye_resolution);

        Ok(Self {
            velocity: DoubleGrid::new(sim_size, 2),
            dye: DoubleGrid::new(dye_size, 3),
            pressure: DoubleGrid::new(sim_size, 1),
            divergence: Grid::new(sim_size, 1),
            curl: Grid::new(sim_size, 1),
            sim_size,
            dye_size,
        })
    }

    #[inline]
    pub fn sim_size(&self) -> UVec2 {
        self.sim_size
    }

    #[inline]
    pub fn dye_size(&self) -> UVec2 {
        self.dye_size
    }

    /// Lossy reallocation at the dimensions derived from the new viewport.
    /// Field contents restart from zero; the caller guarantees no pass is
    /// mid-flight.
    pub fn resize(&mut self, config: &SimConfig, viewport: Viewport) -> Result<(), ResourceError> {
        let fresh = Self::allocate(config, viewport)?;
        *self = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_extent_scales_long_axis() {
        let landscape = Viewport::new(800, 600);
        assert_eq!(landscape.grid_extent(128), UVec2::new(171, 128));

        let portrait = Viewport::new(600, 800);
        assert_eq!(portrait.grid_extent(128), UVec2::new(128, 171));
    }

    #[test]
    fn sample_clamps_at_edges() {
        let mut grid = Grid::new(UVec2::new(4, 4), 1);
        grid.set(0, 0, 0, 2.0);
        assert_eq!(grid.sample(Vec2::new(-5.0, -5.0), 0), 2.0);
        assert_eq!(grid.sample(Vec2::new(0.0, 0.0), 0), 2.0);
    }

    #[test]
    fn swap_exchanges_roles() {
        let mut pair = DoubleGrid::new(UVec2::new(2, 2), 1);
        pair.read_write().1.set(0, 0, 0, 1.0);
        assert_eq!(pair.read().get(0, 0, 0), 0.0);
        pair.swap();
        assert_eq!(pair.read().get(0, 0, 0), 1.0);
    }

    #[test]
    fn zero_viewport_is_a_resource_error() {
        let err = FieldArena::allocate(&SimConfig::default(), Viewport::new(0, 600));
        assert!(matches!(
            err,
            Err(ResourceError::ZeroViewport { width: 0, height: 600 })
        ));
    }
}
