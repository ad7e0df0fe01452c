//! # gitvault
//!
//! A pure Rust library for reading and writing Git object stores.
//!
//! This crate works directly against the on-disk repository format without
//! libgit2 or the git command-line tool:
//!
//! - Decode and encode the four object kinds (blob, tree, commit, tag)
//! - Read and write loose objects under `objects/xx/`
//! - Read version-2 pack files, including offset-delta resolution
//! - Read and write branch and remote references, with `packed-refs`
//!   fallback
//! - Build and query an in-memory commit graph
//!
//! ## Quick Start
//!
//! ```no_run
//! use gitvault::{CommitGraph, FileRepository, Repository, Result};
//!
//! fn main() -> Result<()> {
//!     // Open a Git directory (one containing `config` and `objects/`)
//!     let repo = FileRepository::open("path/to/repo/.git")?;
//!
//!     // Resolve a branch to its commit
//!     let head = repo.read_reference("heads/master")?;
//!     let commit = repo.read_commit(head.target().unwrap())?;
//!     println!("tree: {}", commit.tree());
//!
//!     // Walk the whole history into a graph
//!     let mut graph = CommitGraph::new();
//!     graph.add_history(&repo, &[*head.target().unwrap()])?;
//!     println!("{} roots", graph.roots().len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and Result alias
//! - [`repository`] - The [`Repository`] trait plus file and memory backends
//! - [`objects`] - Object types, the canonical codec, the loose store
//! - [`pack`] - Pack index and pack file reading
//! - [`refs`] - References and the `packed-refs` parser
//! - [`graph`] - The in-memory commit graph
//!
//! The library is single-threaded by design: nothing here is `Sync`-aware,
//! and callers serialize access to a repository or graph themselves.

pub mod error;
pub mod graph;
pub mod objects;
pub mod pack;
pub mod refs;
pub mod repository;

// Internal modules (not part of the public API)
pub(crate) mod infra;

// Re-export primary types for convenient access
pub use error::{Error, Result};
pub use graph::CommitGraph;
pub use repository::{FileRepository, MemoryRepository, Repository};

// Re-export object types
pub use objects::{
    Blob, Commit, FileMode, GitObject, ObjectType, Oid, Signature, Tag, Tree, TreeEntry,
};

// Re-export reference types
pub use refs::Reference;

// Re-export the pack reader
pub use pack::PackReader;
