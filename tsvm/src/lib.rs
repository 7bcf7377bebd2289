//! Stack machine for `.tsi` programs produced by `tsc`.

pub mod error;
pub mod isa;
pub mod machine;
pub mod program;

pub use error::{LoadError, VmError};
pub use isa::Instruction;
pub use machine::Machine;
pub use program::Program;
