//! # Engine Module
//!
//! This module implements the stateful coarse-eigenbasis engine: the repeated
//! block diagonalization, inner-Hessian projection and reduced solve performed
//! every time an integrator asks for a fresh set of low-frequency modes.
//!
//! ## Overview
//!
//! A [`diagonalizer::BlockHessianDiagonalizer`] borrows the caller's block
//! Hessian and, optionally, a force provider. Each call diagonalizes every
//! block tile, keeps the softest modes per block, projects the coupled Hessian
//! onto that basis, solves the small dense problem and expands the result back
//! into full Cartesian space. Scratch storage, timers and failure records live
//! in the engine and are reused across calls.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Truncation, cutoff, geometric and numerical switches, diagnostics
//! - **Engine** ([`diagonalizer`]) - Lifecycle, the per-call pipeline, dense diagonalization
//! - **Block Eigenspace** ([`block_eigenspace`]) - Per-block diagonalization and truncation
//! - **Inner Hessian** ([`inner_hessian`], [`numerical`]) - Analytic and finite-difference projection
//! - **Reduced Solve** ([`reduced`]) - Dense solve of the inner matrix and expansion
//! - **Bookkeeping** ([`workspace`], [`timers`], [`report`]) - Scratch arrays, stopwatches, recorded failures
//! - **Diagnostics** ([`diagnostics`]) - Triple-format dumps of intermediate matrices
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod block_eigenspace;
pub mod config;
pub mod diagnostics;
pub mod diagonalizer;
pub mod error;
pub mod inner_hessian;
pub mod numerical;
pub mod progress;
pub mod reduced;
pub mod report;
pub mod timers;
pub mod workspace;
