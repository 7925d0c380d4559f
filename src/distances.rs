//! Pairwise sequence distances over a character matrix.
//!
//! Two measures are provided:
//!
//! 1. **Mismatch count**: number of comparable sites where the states differ.
//!
//! 2. **p-distance**: mismatches divided by the number of comparable sites.
//!    Range: [0, 1].
//!
//! A site is *comparable* when neither state is a gap (`-`) or missing (`?`).

use crate::error::{CharMatrixError, Result};
use crate::matrix::CharacterMatrix;
use crate::sequence::{CharacterSequence, CharacterState};
use log::debug;
use rayon::prelude::*;

#[cfg(test)]
use itertools::Itertools;

/// Counts of one pairwise comparison.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SiteComparison {
    pub mismatches: usize,
    pub comparable: usize,
}

impl SiteComparison {
    /// Proportion of differing comparable sites; `None` if there are none.
    pub fn p_distance(&self) -> Option<f64> {
        (self.comparable > 0).then(|| self.mismatches as f64 / self.comparable as f64)
    }
}

/// Compare two aligned state slices site by site.
pub fn compare_states(a: &[CharacterState], b: &[CharacterState]) -> SiteComparison {
    a.iter()
        .zip(b)
        .filter(|(x, y)| !x.is_undetermined() && !y.is_undetermined())
        .fold(SiteComparison::default(), |mut acc, (x, y)| {
            acc.comparable += 1;
            if x != y {
                acc.mismatches += 1;
            }
            acc
        })
}

/// Compare two sequences of the matrix by key.
///
/// # Errors
/// Lookup errors for either key, or `LengthMismatch` if the sequences are not
/// the same length.
pub fn compare_sequences(matrix: &CharacterMatrix, a: &str, b: &str) -> Result<SiteComparison> {
    let seq_a = matrix.get(a)?;
    let seq_b = matrix.get(b)?;
    check_lengths(a, seq_a, b, seq_b)?;
    Ok(compare_states(seq_a.as_slice(), seq_b.as_slice()))
}

fn check_lengths(a: &str, seq_a: &CharacterSequence, b: &str, seq_b: &CharacterSequence) -> Result<()> {
    if seq_a.len() != seq_b.len() {
        return Err(CharMatrixError::LengthMismatch {
            left: a.to_owned(),
            right: b.to_owned(),
            left_len: seq_a.len(),
            right_len: seq_b.len(),
        });
    }
    Ok(())
}

/// Snapshot the matrix into owned rows so the comparison can run on rayon's
/// pool; taxa and namespaces are not `Send`.
fn snapshot_rows(matrix: &CharacterMatrix) -> Result<(Vec<String>, Vec<Vec<CharacterState>>)> {
    let mut names = Vec::with_capacity(matrix.len());
    let mut rows = Vec::with_capacity(matrix.len());
    let mut first: Option<(&str, &CharacterSequence)> = None;
    for (taxon, seq) in matrix {
        match first {
            Some((label, first_seq)) => check_lengths(label, first_seq, taxon.label(), seq)?,
            None => first = Some((taxon.label(), seq)),
        }
        names.push(taxon.label().to_owned());
        rows.push(seq.as_slice().to_vec());
    }
    Ok((names, rows))
}

/// Compute comparisons for all pairs `i < j` in parallel.
///
/// Returns row names in matrix order and `(i, j, comparison)` triples.
pub fn compute_pairwise_comparisons_parallel(
    matrix: &CharacterMatrix,
) -> Result<(Vec<String>, Vec<(usize, usize, SiteComparison)>)> {
    let (names, rows) = snapshot_rows(matrix)?;
    let n = rows.len();
    debug!("Comparing {} sequence pairs", n * n.saturating_sub(1) / 2);

    let pairs: Vec<_> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, compare_states(&rows[i], &rows[j])))
        .collect();

    Ok((names, pairs))
}

/// Symmetric p-distance matrix with zero diagonal.
///
/// Pairs without any comparable site get `f64::NAN`.
pub fn pairwise_p_distance_matrix(matrix: &CharacterMatrix) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let (names, pairs) = compute_pairwise_comparisons_parallel(matrix)?;
    let n = names.len();
    let mut mat = vec![vec![0.0f64; n]; n];
    for (i, j, cmp) in pairs {
        let d = cmp.p_distance().unwrap_or(f64::NAN);
        mat[i][j] = d;
        mat[j][i] = d;
    }
    Ok((names, mat))
}

/// Symmetric mismatch-count matrix with zero diagonal.
pub fn pairwise_mismatch_matrix(matrix: &CharacterMatrix) -> Result<(Vec<String>, Vec<Vec<usize>>)> {
    let (names, pairs) = compute_pairwise_comparisons_parallel(matrix)?;
    let n = names.len();
    let mut mat = vec![vec![0usize; n]; n];
    for (i, j, cmp) in pairs {
        mat[i][j] = cmp.mismatches;
        mat[j][i] = cmp.mismatches;
    }
    Ok((names, mat))
}
