//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `taxon`: taxon identity handles and shared taxon namespaces.
//! - `sequence`: character states and per-taxon character sequences.
//! - `matrix`: the taxon-indexed character matrix and its key resolution.
//! - `io`: FASTA / NEXUS matrix reading, FASTA and TSV writing, Newick taxa.
//! - `distances`: pairwise mismatch counts and p-distances.
//! - `error`: the crate error type.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod distances;
pub mod error;
pub mod io;
pub mod matrix;
pub mod sequence;
pub mod taxon;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::{CharMatrixError, Result};
pub use io::{read_matrix, write_fasta, write_matrix_tsv, MatrixFormat};
pub use matrix::{CharacterMatrix, TaxonKey};
pub use sequence::{CharacterSequence, CharacterState};
pub use taxon::{Taxon, TaxonNamespace};
