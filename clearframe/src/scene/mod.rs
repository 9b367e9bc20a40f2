//! Scene hooks driven by the application loop

mod scene;

pub use scene::{Scene, EmptyScene};
