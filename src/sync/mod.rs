pub mod clock;
pub mod vsync;

pub use clock::MasterClock;
pub use vsync::VSync;
