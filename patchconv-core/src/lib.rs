pub mod binary;
pub mod diff;
pub mod encode;
pub mod error;
pub mod header;
pub mod patch;
pub mod sections;

pub use binary::*;
pub use diff::*;
pub use encode::{Conversion, Warning, WarningKind};
pub use error::{PatchError, Result};
pub use patch::*;
pub use sections::*;
