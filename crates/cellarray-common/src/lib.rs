pub mod context;
pub mod error;
pub mod value;

pub use context::*;
pub use error::*;
pub use value::*;
