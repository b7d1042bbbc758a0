//! Data models for chart computation

pub mod aspects;
pub mod chart;
pub mod events;
pub mod lunar;
pub mod patterns;
pub mod request;
pub mod zodiac;

pub use aspects::*;
pub use chart::*;
pub use events::*;
pub use lunar::*;
pub use patterns::*;
pub use request::*;
pub use zodiac::*;
