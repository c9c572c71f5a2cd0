use fluid_backdrop::sim::pointer::{PointerId, PointerSet};
use glam::Vec2;

const DT: f32 = 1.0 / 60.0;

#[test]
fn simultaneous_touches_stay_independent() {
    let mut pointers = PointerSet::seeded(5.0, 1);
    pointers.down(PointerId::Touch(11), Vec2::new(0.2, 0.2));
    pointers.down(PointerId::Touch(22), Vec2::new(0.8, 0.8));
    pointers.down(PointerId::Touch(33), Vec2::new(0.5, 0.5));
    assert_eq!(pointers.len(), 3);

    let before = pointers.get(PointerId::Touch(22)).unwrap().clone();
    pointers.moved(PointerId::Touch(11), Vec2::new(0.3, 0.25));
    pointers.commit(DT);

    let after = pointers.get(PointerId::Touch(22)).unwrap();
    assert_eq!(after.pos, before.pos);
    assert_eq!(after.velocity, before.velocity);
    assert!(pointers.get(PointerId::Touch(11)).unwrap().velocity.length() > 0.0);
}

#[test]
fn velocity_spikes_are_clamped() {
    let mut pointers = PointerSet::seeded(5.0, 1);
    pointers.down(PointerId::Mouse, Vec2::new(0.0, 0.0));
    // A full-screen jump in one millisecond.
    pointers.moved(PointerId::Mouse, Vec2::new(1.0, 1.0));
    pointers.commit(0.001);

    let speed = pointers.get(PointerId::Mouse).unwrap().velocity.length();
    assert!(speed <= 5.0 + 1e-4, "spike not clamped: {speed}");
}

/// A burst of move events inside one frame is one frame of travel, not
/// one timestep each; the derived speed must match a single move covering
/// the same distance.
#[test]
fn move_samples_within_a_frame_coalesce_into_one_delta() {
    let mut split = PointerSet::seeded(5.0, 1);
    split.down(PointerId::Mouse, Vec2::new(0.10, 0.5));
    for i in 1..=4 {
        split.moved(PointerId::Mouse, Vec2::new(0.10 + 0.0125 * i as f32, 0.5));
    }
    split.commit(DT);

    let mut single = PointerSet::seeded(5.0, 1);
    single.down(PointerId::Mouse, Vec2::new(0.10, 0.5));
    single.moved(PointerId::Mouse, Vec2::new(0.15, 0.5));
    single.commit(DT);

    let a = split.get(PointerId::Mouse).unwrap().velocity;
    let b = single.get(PointerId::Mouse).unwrap().velocity;
    assert!((a - b).length() < 1e-6, "split {a:?} vs single {b:?}");
    assert!(
        (a.x - 0.05 / DT).abs() < 1e-4,
        "net frame delta undercounted: {}",
        a.x
    );
}

#[test]
fn released_pointer_lingers_for_one_retire() {
    let mut pointers = PointerSet::seeded(5.0, 1);
    pointers.down(PointerId::Touch(1), Vec2::new(0.5, 0.5));
    pointers.moved(PointerId::Touch(1), Vec2::new(0.6, 0.5));
    pointers.commit(DT);
    pointers.up(PointerId::Touch(1));

    // Retained inactive so the solver can inject the final impulse.
    let rec = pointers.get(PointerId::Touch(1)).unwrap();
    assert!(!rec.active);
    assert!(rec.velocity.length() > 0.0);

    pointers.retire();
    assert!(pointers.get(PointerId::Touch(1)).is_none());
    assert!(pointers.is_empty());
}

#[test]
fn moves_without_a_down_are_ignored() {
    let mut pointers = PointerSet::seeded(5.0, 1);
    pointers.moved(PointerId::Mouse, Vec2::new(0.4, 0.4));
    pointers.commit(DT);
    assert!(pointers.is_empty());
}

#[test]
fn zero_length_frame_keeps_velocity_and_carries_the_delta() {
    let mut pointers = PointerSet::seeded(5.0, 1);
    pointers.down(PointerId::Mouse, Vec2::new(0.1, 0.1));
    pointers.moved(PointerId::Mouse, Vec2::new(0.2, 0.1));
    pointers.commit(DT);
    let speed = pointers.get(PointerId::Mouse).unwrap().velocity.length();

    pointers.moved(PointerId::Mouse, Vec2::new(0.3, 0.1));
    pointers.commit(0.0);
    let after = pointers.get(PointerId::Mouse).unwrap();
    assert_eq!(after.velocity.length(), speed);
    assert_eq!(after.pos, Vec2::new(0.3, 0.1));

    // The travel from the zero-length frame lands in the next real one.
    pointers.commit(DT);
    assert!(pointers.get(PointerId::Mouse).unwrap().velocity.length() > 0.0);
}

#[test]
fn down_assigns_each_contact_its_own_color() {
    let mut pointers = PointerSet::seeded(5.0, 9);
    pointers.down(PointerId::Touch(1), Vec2::new(0.1, 0.1));
    pointers.down(PointerId::Touch(2), Vec2::new(0.9, 0.9));
    let a = pointers.get(PointerId::Touch(1)).unwrap().color;
    let b = pointers.get(PointerId::Touch(2)).unwrap().color;
    assert_ne!(a, b);
}
