pub mod classifier;
pub mod messaging;
pub mod template;
pub mod voice;

pub use classifier::*;
pub use messaging::*;
pub use template::*;
pub use voice::*;
