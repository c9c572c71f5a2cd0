//! Interactive fluid backdrop: a stable-fluids solver (semi-Lagrangian
//! advection + Jacobi pressure projection) driven by pointer input and
//! painted behind the rest of the page as a full-window dye texture.

pub mod error;

pub mod sim {
    pub mod config;
    pub mod fields;
    pub mod pointer;
    pub mod solver;
}

pub mod render {
    pub mod display;
}

pub mod backdrop;

pub use backdrop::{Backdrop, DisposeBackdrop, FluidBackdropPlugin, Phase};
pub use error::{BackdropError, ConfigError, InputAdapterError, ResourceError};
pub use sim::config::SimConfig;
pub use sim::fields::Viewport;
