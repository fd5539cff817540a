pub mod error;
pub mod signal;
pub mod types;
pub mod value;

pub use error::{ErrorDescriptor, ErrorKind};
pub use signal::*;
pub use types::*;
pub use value::*;
