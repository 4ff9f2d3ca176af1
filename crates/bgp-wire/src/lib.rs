pub mod packet;
pub use packet::*;

pub mod open;
pub use open::*;

pub mod notification;
pub use notification::*;

pub mod error;
pub use error::*;
