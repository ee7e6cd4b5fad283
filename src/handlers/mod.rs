pub mod diagnostics;
pub mod health;
pub mod images;

pub use diagnostics::*;
pub use health::*;
pub use images::*;
