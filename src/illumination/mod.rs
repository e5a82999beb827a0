pub mod torch;

pub use torch::{Illumination, TorchStatus};
