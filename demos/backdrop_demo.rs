use bevy::prelude::*;
use fluid_backdrop::{FluidBackdropPlugin, SimConfig};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(SimConfig::default())
        .add_plugins(FluidBackdropPlugin)
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d::default());
}
