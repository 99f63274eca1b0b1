//! Plain-text input and output: the TOML problem description consumed by the
//! command-line tool and the `row col value` triple format used for
//! eigenvector output and diagnostic dumps.

pub mod problem;
pub mod triples;
