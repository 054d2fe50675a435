pub mod items;
pub mod system;

pub use items::*;
pub use system::*;
