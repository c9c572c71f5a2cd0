// Top-level driver: owns the lifecycle state machine, clamps frame time,
// and wires Bevy input/window events into the simulation core.

use bevy::input::mouse::MouseButtonInput;
use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::input::ButtonState;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowOccluded, WindowResized};
use glam::Vec2 as GVec2;

use crate::error::{BackdropError, InputAdapterError, ResourceError};
use crate::render::display;
use crate::sim::config::SimConfig;
use crate::sim::fields::{FieldArena, Viewport};
use crate::sim::pointer::{PointerId, PointerSet};
use crate::sim::solver;

/// Lifecycle of the owning simulation. `Disposed` is terminal; invalid
/// transitions are ignored rather than panicking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Running,
    Paused,
    Disposed,
}

/// Per-tick timing observed by every pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    /// Wall-clock seconds accumulated while Running.
    pub elapsed: f64,
    /// Last tick's clamped delta-time.
    pub dt: f32,
}

/// The whole simulation: buffers, pointer records, clock and phase. All
/// methods are safe to call in any phase; the ones that do not apply are
/// no-ops or return an error, never a panic.
#[derive(Resource)]
pub struct Backdrop {
    config: SimConfig,
    phase: Phase,
    arena: Option<FieldArena>,
    pointers: PointerSet,
    clock: FrameClock,
    viewport: Viewport,
    // Applied strictly between ticks, never mid-pass.
    pending_viewport: Option<Viewport>,
}

impl Backdrop {
    pub fn new(config: SimConfig) -> Result<Self, BackdropError> {
        config.validate()?;
        let pointers = PointerSet::new(config.max_pointer_speed);
        Ok(Self {
            config,
            phase: Phase::Uninitialized,
            arena: None,
            pointers,
            clock: FrameClock::default(),
            viewport: Viewport::new(0, 0),
            pending_viewport: None,
        })
    }

    /// Deterministic pointer colors, for tests.
    pub fn with_seeded_pointers(config: SimConfig, seed: u64) -> Result<Self, BackdropError> {
        let mut backdrop = Self::new(config)?;
        backdrop.pointers = PointerSet::seeded(backdrop.config.max_pointer_speed, seed);
        Ok(backdrop)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn arena(&self) -> Option<&FieldArena> {
        self.arena.as_ref()
    }

    pub fn pointers(&self) -> &PointerSet {
        &self.pointers
    }

    pub fn pointers_mut(&mut self) -> &mut PointerSet {
        &mut self.pointers
    }

    /// Pointer listeners are live only while Running. In any other phase
    /// the event is dropped: `retire` only runs inside the tick, so an
    /// ungated stream of contacts would grow the record list without
    /// bound while Paused or Disposed.
    pub fn pointer_down(&mut self, id: PointerId, pos: GVec2) {
        if self.phase == Phase::Running {
            self.pointers.down(id, pos);
        }
    }

    pub fn pointer_moved(&mut self, id: PointerId, pos: GVec2) {
        if self.phase == Phase::Running {
            self.pointers.moved(id, pos);
        }
    }

    pub fn pointer_up(&mut self, id: PointerId) {
        if self.phase == Phase::Running {
            self.pointers.up(id);
        }
    }

    /// Allocates every field buffer and enters Running.
    pub fn start(&mut self, viewport: Viewport) -> Result<(), BackdropError> {
        match self.phase {
            Phase::Uninitialized => {
                self.arena = Some(FieldArena::allocate(&self.config, viewport)?);
                self.viewport = viewport;
                self.phase = Phase::Running;
                info!(
                    "fluid backdrop running: sim {:?}, dye {:?}",
                    self.arena.as_ref().map(|a| a.sim_size()),
                    self.arena.as_ref().map(|a| a.dye_size()),
                );
                Ok(())
            }
            phase => Err(BackdropError::BadPhase { phase }),
        }
    }

    /// Stops scheduling but retains buffers.
    pub fn pause(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused;
            debug!("fluid backdrop paused");
        }
    }

    /// Resumes without reallocation.
    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.phase = Phase::Running;
            debug!("fluid backdrop resumed");
        }
    }

    /// Queues a buffer resize to happen at the next tick boundary.
    /// In-flight pointer records survive: their coordinates are stored
    /// normalized and need no remap.
    pub fn request_resize(&mut self, viewport: Viewport) {
        if self.phase != Phase::Disposed {
            self.pending_viewport = Some(viewport);
        }
    }

    /// One simulation tick: applies any pending resize, clamps dt to the
    /// configured cap (a backgrounded tab becomes one bounded step, not a
    /// catch-up burst), runs the pipeline and retires lingering pointers.
    pub fn tick(&mut self, raw_dt: f32) -> Result<(), BackdropError> {
        if self.phase != Phase::Running {
            return Ok(());
        }

        if let Some(viewport) = self.pending_viewport.take() {
            if !viewport.is_empty() && viewport != self.viewport {
                if let Some(arena) = self.arena.as_mut() {
                    arena.resize(&self.config, viewport)?;
                    self.viewport = viewport;
                    debug!("fluid backdrop resized to {}x{} px", viewport.width, viewport.height);
                }
            }
        }

        let arena = self.arena.as_mut().ok_or(ResourceError::Disposed)?;
        let dt = raw_dt.clamp(0.0, self.config.max_dt);
        self.clock.dt = dt;
        self.clock.elapsed += dt as f64;

        self.pointers.commit(dt);
        solver::step(arena, &self.pointers, dt, &self.config);
        self.pointers.retire();
        Ok(())
    }

    /// Idempotent teardown: frees buffers, drops pointer records, enters
    /// the terminal phase. Safe from any state, including a start that
    /// failed partway; calling it twice is a no-op.
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.arena = None;
        self.pointers.clear();
        self.pending_viewport = None;
        self.phase = Phase::Disposed;
        info!("fluid backdrop disposed");
    }
}

// ------------------------------------------------------------- plugin

/// Handle to the display image the renderer writes into.
#[derive(Resource)]
pub struct BackdropDisplay {
    pub image: Handle<Image>,
}

/// Marker for the full-window sprite showing the dye field.
#[derive(Component)]
pub struct BackdropSprite;

/// Teardown handle: send once (or more, it is idempotent) to halt
/// scheduling and free buffers, records and the display entity.
#[derive(Event, Default)]
pub struct DisposeBackdrop;

/// Depth of the backdrop sprite, behind the page content.
const BACKDROP_Z: f32 = -100.0;

pub struct FluidBackdropPlugin;

impl Plugin for FluidBackdropPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimConfig>()
            .add_event::<DisposeBackdrop>()
            .add_systems(Startup, start_backdrop)
            .add_systems(
                Update,
                (
                    window_events,
                    pointer_events,
                    advance_simulation,
                    sync_display,
                    handle_dispose,
                )
                    .chain(),
            );
    }
}

fn window_viewport(window: &Window) -> Viewport {
    Viewport::new(window.physical_width(), window.physical_height())
}

/// Normalizes a logical window position to [0,1]^2, origin top-left.
fn normalize(window: &Window, position: Vec2) -> Option<GVec2> {
    let w = window.width();
    let h = window.height();
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(GVec2::new(position.x / w, position.y / h))
}

/// Allocates the simulation against the primary window. Any failure is
/// logged and the page simply has no background effect.
fn start_backdrop(
    mut commands: Commands,
    config: Res<SimConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Ok(window) = windows.single() else {
        warn!(
            "fluid backdrop disabled: {}",
            BackdropError::from(InputAdapterError::NoSurface)
        );
        return;
    };

    let mut backdrop = match Backdrop::new(config.clone()) {
        Ok(backdrop) => backdrop,
        Err(err) => {
            warn!("fluid backdrop disabled: {err}");
            return;
        }
    };
    if let Err(err) = backdrop.start(window_viewport(window)) {
        warn!("fluid backdrop disabled: {err}");
        return;
    }

    let Some(arena) = backdrop.arena() else {
        return;
    };
    let image = display::create_display_image(&mut images, arena.dye_size());

    commands.spawn((
        Sprite {
            image: image.clone(),
            custom_size: Some(Vec2::new(window.width(), window.height())),
            ..Default::default()
        },
        Transform::from_xyz(0.0, 0.0, BACKDROP_Z),
        BackdropSprite,
    ));
    commands.insert_resource(BackdropDisplay { image });
    commands.insert_resource(backdrop);
}

/// Translates mouse and touch events 1:1 into pointer records. Every
/// simultaneous touch contact gets its own independent record.
fn pointer_events(
    backdrop: Option<ResMut<Backdrop>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut mouse_buttons: EventReader<MouseButtonInput>,
    mut cursor_moves: EventReader<CursorMoved>,
    mut touches: EventReader<TouchInput>,
) {
    let Some(mut backdrop) = backdrop else {
        return;
    };
    let Ok(window) = windows.single() else {
        return;
    };

    for ev in mouse_buttons.read() {
        if ev.button != MouseButton::Left {
            continue;
        }
        match ev.state {
            ButtonState::Pressed => {
                let Some(pos) = window.cursor_position().and_then(|p| normalize(window, p))
                else {
                    continue;
                };
                backdrop.pointer_down(PointerId::Mouse, pos);
            }
            ButtonState::Released => backdrop.pointer_up(PointerId::Mouse),
        }
    }

    for ev in cursor_moves.read() {
        if let Some(pos) = normalize(window, ev.position) {
            backdrop.pointer_moved(PointerId::Mouse, pos);
        }
    }

    for ev in touches.read() {
        let id = PointerId::Touch(ev.id);
        match ev.phase {
            TouchPhase::Started => {
                if let Some(pos) = normalize(window, ev.position) {
                    backdrop.pointer_down(id, pos);
                }
            }
            TouchPhase::Moved => {
                if let Some(pos) = normalize(window, ev.position) {
                    backdrop.pointer_moved(id, pos);
                }
            }
            TouchPhase::Ended | TouchPhase::Canceled => backdrop.pointer_up(id),
        }
    }
}

/// Resize and visibility, serialized against the tick: resizes are queued
/// for the next tick boundary, occlusion pauses scheduling.
fn window_events(
    backdrop: Option<ResMut<Backdrop>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut resized: EventReader<WindowResized>,
    mut occluded: EventReader<WindowOccluded>,
) {
    let Some(mut backdrop) = backdrop else {
        return;
    };

    if resized.read().next().is_some() {
        if let Ok(window) = windows.single() {
            backdrop.request_resize(window_viewport(window));
        }
    }

    for ev in occluded.read() {
        if ev.occluded {
            backdrop.pause();
        } else {
            backdrop.resume();
        }
    }
}

fn advance_simulation(backdrop: Option<ResMut<Backdrop>>, time: Res<Time>) {
    let Some(mut backdrop) = backdrop else {
        return;
    };
    if let Err(err) = backdrop.tick(time.delta_secs()) {
        warn!("fluid backdrop tick skipped: {err}");
    }
}

/// Writes the dye field into the display image and keeps the sprite
/// stretched over the window. A mid-resize size mismatch recreates the
/// image under the same handle; the draw then lands on the next tick.
fn sync_display(
    backdrop: Option<Res<Backdrop>>,
    display: Option<Res<BackdropDisplay>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
    mut sprites: Query<&mut Sprite, With<BackdropSprite>>,
) {
    let (Some(backdrop), Some(display)) = (backdrop, display) else {
        return;
    };
    if backdrop.phase() != Phase::Running {
        return;
    }
    let Some(arena) = backdrop.arena() else {
        return;
    };

    let dye_size = arena.dye_size();
    if let Some(image) = images.get_mut(&display.image) {
        let size = image.size();
        if size.x != dye_size.x || size.y != dye_size.y {
            *image = display::blank_image(dye_size);
        }
        display::write_dye(arena.dye.read(), image);
    }

    if let Ok(window) = windows.single() {
        for mut sprite in sprites.iter_mut() {
            sprite.custom_size = Some(Vec2::new(window.width(), window.height()));
        }
    }
}

fn handle_dispose(
    mut commands: Commands,
    mut events: EventReader<DisposeBackdrop>,
    backdrop: Option<ResMut<Backdrop>>,
    sprites: Query<Entity, With<BackdropSprite>>,
) {
    if events.read().next().is_none() {
        return;
    }
    let Some(mut backdrop) = backdrop else {
        return;
    };
    backdrop.dispose();
    for entity in sprites.iter() {
        commands.entity(entity).despawn();
    }
    // The resource goes with the entity: nothing may keep feeding a
    // disposed simulation.
    commands.remove_resource::<Backdrop>();
    commands.remove_resource::<BackdropDisplay>();
}
