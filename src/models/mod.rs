pub mod diagnostics;
pub mod error;
pub mod health;
pub mod images;
pub mod messages;

pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use images::*;
pub use messages::*;
