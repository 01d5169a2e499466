pub mod ast;
pub mod error;
pub mod pipeline;
pub mod unminify;
pub mod unpacker;

#[cfg(test)]
mod test_utils;

pub use error::{Diagnostic, Error, ParseError, PassError, Severity, UnpackError};
pub use pipeline::{options::Options, FileResult, SourceFile};
pub use unpacker::{unpack, Module, ModuleId, UnpackResult};
