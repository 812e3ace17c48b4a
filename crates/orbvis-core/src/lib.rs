//! Orbital-projected band structure and DOS preparation.
//!
//! The [`kpath`] engine turns a raw k-point list into a labelled, continuous
//! band path while keeping every band and projection row attached to its
//! k-point. [`dos`] reduces projected DOS to per-group curves, and
//! [`modules`] wires both to configuration files and plot artifacts.

pub mod config;
pub mod domain;
pub mod dos;
pub mod kpath;
pub mod modules;
pub mod numerics;
pub mod tensor;
