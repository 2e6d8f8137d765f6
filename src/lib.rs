//! Layout trees for egui dashboards: a tree and a grid view over one
//! document, and a generator that writes egui code plus merge-safe callback
//! stubs.

pub mod config;
pub mod emit;
pub mod error;
pub mod generate;
pub mod grid;
pub mod merge;
pub mod project;
pub mod resolve;
pub mod tree;
pub mod widget;

pub use error::{EditError, Error, GridError, Result};
pub use generate::{DirTarget, GenerateOptions, MemoryTarget, OutputTarget, generate};
pub use grid::GridState;
pub use project::LayoutDocument;
pub use tree::LayoutTree;
