pub mod countdown;
pub mod errors;
pub mod task;

pub use countdown::*;
pub use errors::*;
pub use task::*;
