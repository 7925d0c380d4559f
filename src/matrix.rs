//! Taxon-indexed character matrix.
//!
//! # Overview
//! A [`CharacterMatrix`] maps taxa of one [`TaxonNamespace`] to at most one
//! [`CharacterSequence`] each. Every keyed operation accepts a [`TaxonKey`]:
//! a taxon object, a position in the namespace, or a taxon label. All three
//! forms go through the same resolution step, so they fail the same way and
//! address the same entry.
//!
//! # Example
//! ```
//! # use charmatrix::{CharacterMatrix, TaxonNamespace};
//! let tns = TaxonNamespace::from_labels(["T0", "T1", "T2"]);
//! let mut matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
//!
//! matrix.set(&tns.get(0).unwrap(), "abcd").unwrap();
//! matrix.set(1usize, vec![1i64, 2, 3, 4]).unwrap();
//! matrix.set("T2", ["a", "b", "c", "d"]).unwrap();
//!
//! assert_eq!(matrix.len(), 3);
//! assert_eq!(matrix.get("T1").unwrap().len(), 4);
//! assert!(matrix.contains(2usize).unwrap());
//! ```
//!
//! # Ordering
//! Entries iterate in order of first assignment, not namespace order.
//! Replacing a sequence keeps its position; removing and re-assigning a taxon
//! moves it to the end.

use crate::error::{CharMatrixError, Result};
use crate::sequence::CharacterSequence;
use crate::taxon::{Taxon, TaxonNamespace};
use indexmap::IndexMap;

/// The three ways of naming a taxon in a matrix operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaxonKey {
    Taxon(Taxon),
    /// Position in the bound namespace's ordering.
    Index(usize),
    Label(String),
}

impl TaxonKey {
    /// Converts a signed position; negative positions are out of range.
    pub fn from_signed_index(index: i64, namespace_len: usize) -> Result<Self> {
        usize::try_from(index)
            .map(TaxonKey::Index)
            .map_err(|_| CharMatrixError::IndexOutOfRange { index, len: namespace_len })
    }
}

impl From<Taxon> for TaxonKey {
    fn from(taxon: Taxon) -> Self {
        TaxonKey::Taxon(taxon)
    }
}

impl From<&Taxon> for TaxonKey {
    fn from(taxon: &Taxon) -> Self {
        TaxonKey::Taxon(taxon.clone())
    }
}

impl From<usize> for TaxonKey {
    fn from(index: usize) -> Self {
        TaxonKey::Index(index)
    }
}

impl From<&str> for TaxonKey {
    fn from(label: &str) -> Self {
        TaxonKey::Label(label.to_owned())
    }
}

impl From<String> for TaxonKey {
    fn from(label: String) -> Self {
        TaxonKey::Label(label)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CharacterMatrix {
    taxon_namespace: TaxonNamespace,
    taxon_seq_map: IndexMap<Taxon, CharacterSequence>,
}

impl CharacterMatrix {
    /// Creates an empty matrix bound to a fresh, empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty matrix sharing `taxon_namespace`.
    pub fn with_taxon_namespace(taxon_namespace: TaxonNamespace) -> Self {
        CharacterMatrix {
            taxon_namespace,
            taxon_seq_map: IndexMap::new(),
        }
    }

    /// The bound namespace. Register taxa through it before assigning
    /// sequences for them.
    pub fn taxon_namespace(&self) -> &TaxonNamespace {
        &self.taxon_namespace
    }

    fn resolve(&self, key: TaxonKey) -> Result<Taxon> {
        match key {
            TaxonKey::Taxon(taxon) => Ok(taxon),
            TaxonKey::Index(index) => self.taxon_namespace.get(index).ok_or_else(|| {
                CharMatrixError::IndexOutOfRange {
                    index: i64::try_from(index).unwrap_or(i64::MAX),
                    len: self.taxon_namespace.len(),
                }
            }),
            TaxonKey::Label(label) => self
                .taxon_namespace
                .get_by_label(&label)
                .ok_or(CharMatrixError::LabelNotFound(label)),
        }
    }

    /// Stores `sequence` for the taxon named by `key`, replacing any previous
    /// sequence.
    ///
    /// # Errors
    /// - `IndexOutOfRange` / `LabelNotFound` if the key does not resolve.
    /// - `NotInNamespace` if the taxon is not registered in the bound
    ///   namespace. The matrix is left untouched; the taxon is not registered.
    pub fn set(&mut self, key: impl Into<TaxonKey>, sequence: impl Into<CharacterSequence>) -> Result<()> {
        let taxon = self.resolve(key.into())?;
        if !self.taxon_namespace.contains(&taxon) {
            return Err(CharMatrixError::NotInNamespace(taxon.label().to_owned()));
        }
        self.taxon_seq_map.insert(taxon, sequence.into());
        Ok(())
    }

    /// # Errors
    /// Resolution errors, or `MissingEntry` if the taxon has no sequence.
    pub fn get(&self, key: impl Into<TaxonKey>) -> Result<&CharacterSequence> {
        let taxon = self.resolve(key.into())?;
        self.taxon_seq_map
            .get(&taxon)
            .ok_or_else(|| CharMatrixError::MissingEntry(taxon.label().to_owned()))
    }

    /// Mutable access to the stored sequence; edits are made in place.
    pub fn get_mut(&mut self, key: impl Into<TaxonKey>) -> Result<&mut CharacterSequence> {
        let taxon = self.resolve(key.into())?;
        self.taxon_seq_map
            .get_mut(&taxon)
            .ok_or_else(|| CharMatrixError::MissingEntry(taxon.label().to_owned()))
    }

    pub fn contains(&self, key: impl Into<TaxonKey>) -> Result<bool> {
        let taxon = self.resolve(key.into())?;
        Ok(self.taxon_seq_map.contains_key(&taxon))
    }

    /// Removes and returns the sequence for `key`. Remaining entries keep
    /// their relative order.
    ///
    /// # Errors
    /// Resolution errors, or `MissingEntry` if there is nothing to remove.
    pub fn remove(&mut self, key: impl Into<TaxonKey>) -> Result<CharacterSequence> {
        let taxon = self.resolve(key.into())?;
        self.taxon_seq_map
            .shift_remove(&taxon)
            .ok_or_else(|| CharMatrixError::MissingEntry(taxon.label().to_owned()))
    }

    /// Drops every sequence. The namespace is not touched.
    pub fn clear(&mut self) {
        self.taxon_seq_map.clear();
    }

    pub fn len(&self) -> usize {
        self.taxon_seq_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxon_seq_map.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Taxon, CharacterSequence> {
        self.taxon_seq_map.iter()
    }

    pub fn taxa(&self) -> indexmap::map::Keys<'_, Taxon, CharacterSequence> {
        self.taxon_seq_map.keys()
    }

    pub fn sequences(&self) -> indexmap::map::Values<'_, Taxon, CharacterSequence> {
        self.taxon_seq_map.values()
    }

    pub fn labels(&self) -> Vec<String> {
        self.taxa().map(|t| t.label().to_owned()).collect()
    }

    /// Copies every entry of `other` into this matrix.
    ///
    /// All of `other`'s taxa must be members of this matrix's namespace; if
    /// any is not, nothing is copied.
    pub fn extend_from(&mut self, other: &CharacterMatrix) -> Result<()> {
        if let Some(stranger) = other.taxa().find(|t| !self.taxon_namespace.contains(t)) {
            return Err(CharMatrixError::NotInNamespace(stranger.label().to_owned()));
        }
        for (taxon, seq) in other.iter() {
            self.taxon_seq_map.insert(taxon.clone(), seq.clone());
        }
        Ok(())
    }

    pub fn max_sequence_len(&self) -> usize {
        self.sequences().map(CharacterSequence::len).max().unwrap_or(0)
    }

    /// True when every stored sequence has the same length.
    pub fn is_aligned(&self) -> bool {
        let mut lens = self.sequences().map(CharacterSequence::len);
        match lens.next() {
            Some(first) => lens.all(|l| l == first),
            None => true,
        }
    }
}

impl<'a> IntoIterator for &'a CharacterMatrix {
    type Item = (&'a Taxon, &'a CharacterSequence);
    type IntoIter = indexmap::map::Iter<'a, Taxon, CharacterSequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.taxon_seq_map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::CharacterState;

    fn get_taxon_namespace(ntax: usize) -> TaxonNamespace {
        TaxonNamespace::from_labels((0..ntax).map(|i| format!("T{i}")))
    }

    fn seqs() -> Vec<CharacterSequence> {
        vec![
            "abcd".into(),
            vec![1i64, 2, 3, 4].into(),
            ["a", "b", "c", "d"].into(),
        ]
    }

    fn assert_filled(char_matrix: &CharacterMatrix, tns: &TaxonNamespace) {
        assert_eq!(char_matrix.len(), tns.len());
        for (idx, taxon) in tns.taxa().iter().enumerate() {
            assert!(char_matrix.contains(taxon).unwrap());
            assert_eq!(char_matrix.get(taxon).unwrap(), &seqs()[idx]);
        }
    }

    #[test]
    fn test_setitem_by_taxon() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        assert_eq!(char_matrix.len(), 0);
        for (taxon, seq) in tns.taxa().iter().zip(seqs()) {
            assert!(!char_matrix.contains(taxon).unwrap());
            char_matrix.set(taxon, seq).unwrap();
        }
        assert_filled(&char_matrix, &tns);
    }

    #[test]
    fn test_setitem_by_taxon_idx() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        for (idx, seq) in seqs().into_iter().enumerate() {
            assert!(!char_matrix.contains(idx).unwrap());
            char_matrix.set(idx, seq).unwrap();
        }
        assert_filled(&char_matrix, &tns);
    }

    #[test]
    fn test_setitem_by_taxon_label() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        for (taxon, seq) in tns.taxa().iter().zip(seqs()) {
            assert!(!char_matrix.contains(taxon.label()).unwrap());
            char_matrix.set(taxon.label(), seq).unwrap();
        }
        assert_filled(&char_matrix, &tns);
    }

    #[test]
    fn test_key_forms_address_same_entry() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        char_matrix.set("T1", vec![1i64, 2, 3, 4]).unwrap();

        let t1 = tns.get(1).unwrap();
        let by_taxon = char_matrix.get(&t1).unwrap();
        assert_eq!(by_taxon, char_matrix.get(1usize).unwrap());
        assert_eq!(by_taxon, char_matrix.get("T1").unwrap());
        assert_eq!(by_taxon.as_slice(), &[1, 2, 3, 4].map(CharacterState::Code));
    }

    #[test]
    fn test_literal_example() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        let t0 = tns.get(0).unwrap();
        char_matrix.set(&t0, "abcd").unwrap();
        char_matrix.set(&tns.get(1).unwrap(), vec![1i64, 2, 3, 4]).unwrap();
        char_matrix.set(&tns.get(2).unwrap(), ["a", "b", "c", "d"]).unwrap();

        assert_eq!(char_matrix.len(), 3);
        let t1_seq = char_matrix.get("T1").unwrap();
        assert_eq!(t1_seq.len(), 4);
        assert_eq!(t1_seq, &CharacterSequence::from(vec![1i64, 2, 3, 4]));
        assert!(char_matrix.contains(2usize).unwrap());

        char_matrix.remove(&t0).unwrap();
        assert_eq!(char_matrix.len(), 2);
        assert!(!char_matrix.contains(&t0).unwrap());
    }

    #[test]
    fn test_setitem_by_taxon_not_in_namespace() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::new();
        let t = tns.get(0).unwrap();
        let seq = ["a", "b"];

        let err = char_matrix.set(&t, seq).unwrap_err();
        assert!(matches!(err, CharMatrixError::NotInNamespace(ref l) if l == "T0"));
        assert_eq!(char_matrix.len(), 0);
        assert!(char_matrix.taxon_namespace().is_empty());

        char_matrix.taxon_namespace().add_taxon(&t).unwrap();
        char_matrix.set(&t, seq).unwrap();
        assert_eq!(char_matrix.len(), 1);
        assert!(char_matrix.contains(&t).unwrap());
        assert_eq!(char_matrix.get(&t).unwrap(), &CharacterSequence::from(seq));
    }

    #[test]
    fn test_setitem_lookalike_taxon_rejected() {
        let tns = get_taxon_namespace(1);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns);
        let lookalike = Taxon::new("T0");
        assert!(matches!(
            char_matrix.set(&lookalike, "A"),
            Err(CharMatrixError::NotInNamespace(_))
        ));
        assert!(char_matrix.is_empty());
    }

    #[test]
    fn test_setitem_by_idx_not_in_namespace() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::new();
        let err = char_matrix.set(tns.len(), "").unwrap_err();
        assert!(matches!(err, CharMatrixError::IndexOutOfRange { index: 3, len: 0 }));
    }

    #[test]
    fn test_setitem_by_label_not_in_namespace() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::new();
        let label = tns.get(0).unwrap().label().to_owned();
        let err = char_matrix.set(label, "").unwrap_err();
        assert!(matches!(err, CharMatrixError::LabelNotFound(ref l) if l == "T0"));
        assert!(char_matrix.is_empty());
    }

    #[test]
    fn test_negative_index() {
        assert!(matches!(
            TaxonKey::from_signed_index(-1, 3),
            Err(CharMatrixError::IndexOutOfRange { index: -1, len: 3 })
        ));
        assert_eq!(TaxonKey::from_signed_index(2, 3).unwrap(), TaxonKey::Index(2));
    }

    #[test]
    fn test_multi_setitem() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        let t = tns.get(0).unwrap();
        for seq in seqs() {
            char_matrix.set(&t, seq).unwrap();
        }
        for taxon in tns.taxa() {
            assert_eq!(char_matrix.contains(&taxon).unwrap(), taxon == t);
        }
        assert_eq!(char_matrix.len(), 1);
        let stored = char_matrix.get(0usize).unwrap();
        assert_eq!(stored, &seqs()[2]);
        assert!(stored.iter().zip(seqs()[1].iter()).all(|(c1, c2)| c1 != c2));
    }

    #[test]
    fn test_get_missing_entry() {
        let tns = get_taxon_namespace(2);
        let char_matrix = CharacterMatrix::with_taxon_namespace(tns);
        assert!(matches!(char_matrix.get("T1"), Err(CharMatrixError::MissingEntry(ref l)) if l == "T1"));
        assert!(matches!(char_matrix.get("T9"), Err(CharMatrixError::LabelNotFound(_))));
        assert!(matches!(char_matrix.contains(5usize), Err(CharMatrixError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_get_mut_is_not_a_copy() {
        let tns = get_taxon_namespace(1);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns);
        char_matrix.set(0usize, "AC").unwrap();
        char_matrix.get_mut("T0").unwrap().push('G');
        assert_eq!(char_matrix.get(0usize).unwrap().to_string(), "ACG");
    }

    #[test]
    fn test_delitem() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        for (taxon, seq) in tns.taxa().iter().zip(seqs()) {
            char_matrix.set(taxon, seq).unwrap();
        }
        for (idx, taxon) in tns.taxa().iter().enumerate() {
            assert!(char_matrix.contains(taxon).unwrap());
            char_matrix.remove(taxon).unwrap();
            assert!(!char_matrix.contains(taxon).unwrap());
            assert_eq!(char_matrix.len(), tns.len() - idx - 1);
        }
        assert!(char_matrix.is_empty());
        assert!(matches!(char_matrix.remove("T0"), Err(CharMatrixError::MissingEntry(_))));
    }

    #[test]
    fn test_clear() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns.clone());
        for (taxon, seq) in tns.taxa().iter().zip(seqs()) {
            char_matrix.set(taxon, seq).unwrap();
        }
        assert_eq!(char_matrix.len(), 3);
        char_matrix.clear();
        assert_eq!(char_matrix.len(), 0);
        assert_eq!(tns.len(), 3);
        for taxon in tns.taxa() {
            assert!(!char_matrix.contains(&taxon).unwrap());
        }
    }

    #[test]
    fn test_iteration_order() {
        let tns = get_taxon_namespace(3);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns);
        char_matrix.set("T2", "A").unwrap();
        char_matrix.set("T0", "C").unwrap();
        char_matrix.set("T1", "G").unwrap();
        assert_eq!(char_matrix.labels(), vec!["T2", "T0", "T1"]);

        // Replacement keeps position.
        char_matrix.set("T0", "T").unwrap();
        assert_eq!(char_matrix.labels(), vec!["T2", "T0", "T1"]);

        // Re-insertion after removal goes to the end.
        char_matrix.remove("T2").unwrap();
        char_matrix.set("T2", "A").unwrap();
        assert_eq!(char_matrix.labels(), vec!["T0", "T1", "T2"]);

        let rendered: Vec<String> = (&char_matrix)
            .into_iter()
            .map(|(t, s)| format!("{t}={s}"))
            .collect();
        assert_eq!(rendered, vec!["T0=T", "T1=G", "T2=A"]);
    }

    #[test]
    fn test_shared_namespace_registration() {
        let mut char_matrix = CharacterMatrix::new();
        let outside = char_matrix.taxon_namespace().clone();
        let t = outside.require_taxon("late");
        char_matrix.set(&t, "AAA").unwrap();
        assert!(char_matrix.contains("late").unwrap());
    }

    #[test]
    fn test_extend_from() {
        let tns = get_taxon_namespace(2);
        let mut source = CharacterMatrix::with_taxon_namespace(tns.clone());
        source.set("T0", "AC").unwrap();
        source.set("T1", "AG").unwrap();

        let mut dest = CharacterMatrix::with_taxon_namespace(tns);
        dest.extend_from(&source).unwrap();
        assert_eq!(dest.labels(), vec!["T0", "T1"]);

        let mut stranger = CharacterMatrix::new();
        stranger.taxon_namespace().require_taxon("X");
        stranger.set("X", "TT").unwrap();
        assert!(matches!(dest.extend_from(&stranger), Err(CharMatrixError::NotInNamespace(_))));
        assert_eq!(dest.len(), 2);
    }

    #[test]
    fn test_alignment_helpers() {
        let tns = get_taxon_namespace(2);
        let mut char_matrix = CharacterMatrix::with_taxon_namespace(tns);
        assert!(char_matrix.is_aligned());
        char_matrix.set("T0", "ACGT").unwrap();
        char_matrix.set("T1", "ACG").unwrap();
        assert!(!char_matrix.is_aligned());
        assert_eq!(char_matrix.max_sequence_len(), 4);
    }
}
