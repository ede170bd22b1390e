pub mod permissions;
pub mod session;

pub use permissions::*;
pub use session::*;
