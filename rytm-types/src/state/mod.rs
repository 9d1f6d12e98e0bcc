pub mod channel;
pub mod clock;
pub mod device;
pub mod pattern;

pub use channel::*;
pub use clock::*;
pub use device::*;
pub use pattern::*;
