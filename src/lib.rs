//! # snipsync
//!
//! Keeps an expanded snippet in sync with the text buffer it lives in, whilst the user types
//! into it, deletes from it and jumps between its tabstops.
//!
//! The snippet is a [`SnippetTree`](tree::SnippetTree) of spans anchored in a
//! [`TextBuffer`](buffer::TextBuffer).  After every atomic change to the buffer, the host editor
//! describes that change as an [`EditCmd`](edit::EditCmd) and [`dispatch`]es it to the tree, then
//! runs [`settle::converge`] to bring dependent nodes (like mirrors) up to date.
//!
//! [`dispatch`]: tree::SnippetTree::dispatch

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(rustdoc::private_intra_doc_links)]

pub mod arena;
pub mod buffer;
pub mod core;
pub mod edit;
pub mod node;
pub mod settle;
pub mod tree;

pub use crate::arena::NodeId;
pub use crate::buffer::{LineBuffer, TextBuffer};
pub use crate::core::{Delta, Position, Size};
pub use crate::edit::{EditCmd, EditError, EditKind};
pub use crate::node::{SpanInit, Token};
pub use crate::tree::{Error, InvariantError, SnippetTree};
