//! Core types shared by the runner, converters, and clients.

pub mod items;
pub mod settings;
pub mod stream;
pub mod usage;

pub use items::*;
pub use settings::*;
pub use stream::*;
pub use usage::*;
