pub mod providers;
pub mod sources;
pub mod yahoo;

pub use providers::*;
pub use sources::*;
pub use yahoo::*;
