mod event;
mod models;

pub use event::*;
pub use models::*;
