//! # Workflows Module
//!
//! High-level entry points that run a complete coarse-eigenbasis computation
//! over a loaded problem.
//!
//! ## Overview
//!
//! A workflow sizes the output buffer from the configuration, initializes a
//! block-mode engine over the problem's block Hessian, runs one
//! `find_eigenvectors` call and packages the eigenvectors together with the
//! retained counts, recorded failures and timings.
//!
//! ## Architecture
//!
//! - **Coarse Modes Workflow** ([`coarse_modes`]) - One-shot diagonalization of a problem file

pub mod coarse_modes;
