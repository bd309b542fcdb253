pub mod call;
pub mod message;
pub mod patient;
pub mod setting;

pub use call::*;
pub use message::*;
pub use patient::*;
pub use setting::*;
