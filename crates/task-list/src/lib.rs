pub mod controller;
pub mod timer;

pub use controller::*;
pub use timer::*;
