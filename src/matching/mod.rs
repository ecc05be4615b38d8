//! Template matching against the stored library.
//!
//! [`TemplateLibrary`] stores validated templates and hands out immutable,
//! range-indexed snapshots; [`TemplateMatcher`] runs the two-phase search
//! over a snapshot.

pub mod library;
pub mod matcher;

pub use library::{LibrarySnapshot, TemplateLibrary};
pub use matcher::TemplateMatcher;
