//! Programs, stage sources and shader variables
//!
//! A [`ProgramResource`] owns its [`StageSource`]s. Compiling and linking is
//! driven by the render backend; this module only tracks what needs to be
//! rebuilt and which variable slots are known.

mod program;
mod source;
mod variable;

pub use program::*;
pub use source::*;
pub use variable::*;
