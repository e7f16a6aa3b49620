//! sidlbuild core library.
//!
//! Assembles build graphs that compile SIDL interface definitions into
//! server implementations and client bindings for several languages, and
//! executes them incrementally against a file-state snapshot.
//!
//! The pieces fit together as follows: a [`workspace::Workspace`] describes
//! projects and their dependencies, a [`template::SidlTemplate`] turns one
//! project into a [`graph::BuildGraph`] of [`action::Vertex`] values, and an
//! [`execute::Executor`] walks the validated [`execute::Plan`].

pub mod action;
pub mod cli;
pub mod compiler;
pub mod execute;
pub mod graph;
pub mod language;
pub mod project;
pub mod runner;
pub mod store;
pub mod template;
pub mod workspace;
