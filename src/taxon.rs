//! Taxa and the shared namespaces that register them.
//!
//! # Identity
//! A [`Taxon`] is a cheap handle to a labelled allocation. Equality and hashing
//! use the allocation, not the label: two taxa created separately with the
//! same label are different taxa. This is what lets a matrix reject a taxon
//! that merely *looks like* one of its own.
//!
//! # Sharing
//! A [`TaxonNamespace`] is also a handle. Cloning it shares the registry, so a
//! matrix, a tree and a loader can all hold the same namespace and see each
//! other's registrations.

use crate::error::{CharMatrixError, Result};
use indexmap::IndexMap;
use phylotree::tree::Tree as PhyloTree;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone)]
pub struct Taxon(Rc<TaxonInner>);

struct TaxonInner {
    label: String,
}

impl Taxon {
    /// Creates a taxon that belongs to no namespace yet.
    pub fn new(label: impl Into<String>) -> Self {
        Taxon(Rc::new(TaxonInner { label: label.into() }))
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }
}

impl PartialEq for Taxon {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Taxon {}

impl Hash for Taxon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Taxon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Taxon").field(&self.0.label).finish()
    }
}

impl fmt::Display for Taxon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.label)
    }
}

/// Ordered registry of taxa with unique labels.
///
/// Positions are stable under insertion; [`TaxonNamespace::remove_taxon`]
/// shifts later taxa down by one.
#[derive(Clone, Default)]
pub struct TaxonNamespace {
    taxa: Rc<RefCell<IndexMap<String, Taxon>>>,
}

impl TaxonNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a namespace with one taxon per distinct label, in input order.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ns = Self::new();
        for label in labels {
            ns.require_taxon(label);
        }
        ns
    }

    /// Builds a namespace from the leaf names of a tree, in leaf order.
    ///
    /// # Errors
    /// Returns `CharMatrixError::Tree` if a leaf cannot be read or has no name,
    /// and `DuplicateLabel` if two leaves share a name.
    pub fn from_tree(tree: &PhyloTree) -> Result<Self> {
        let ns = Self::new();
        for leaf_id in tree.get_leaves() {
            let node = tree
                .get(&leaf_id)
                .map_err(|e| CharMatrixError::Tree(e.to_string()))?;
            let label = node
                .name
                .clone()
                .ok_or_else(|| CharMatrixError::Tree(format!("leaf {leaf_id} has no name")))?;
            ns.add_taxon(&Taxon::new(label))?;
        }
        Ok(ns)
    }

    /// Returns the taxon labelled `label`, registering a new one if needed.
    pub fn require_taxon(&self, label: impl Into<String>) -> Taxon {
        let label = label.into();
        let mut taxa = self.taxa.borrow_mut();
        if let Some(existing) = taxa.get(&label) {
            return existing.clone();
        }
        let taxon = Taxon::new(label.as_str());
        taxa.insert(label, taxon.clone());
        taxon
    }

    /// Registers an existing taxon object.
    ///
    /// Returns `false` if this exact taxon is already registered.
    ///
    /// # Errors
    /// `DuplicateLabel` if a different taxon already uses the same label.
    pub fn add_taxon(&self, taxon: &Taxon) -> Result<bool> {
        let mut taxa = self.taxa.borrow_mut();
        match taxa.get(taxon.label()) {
            Some(existing) if existing == taxon => Ok(false),
            Some(_) => Err(CharMatrixError::DuplicateLabel(taxon.label().to_owned())),
            None => {
                taxa.insert(taxon.label().to_owned(), taxon.clone());
                Ok(true)
            }
        }
    }

    /// Unregisters a taxon. Returns whether it was present.
    pub fn remove_taxon(&self, taxon: &Taxon) -> bool {
        if !self.contains(taxon) {
            return false;
        }
        self.taxa.borrow_mut().shift_remove(taxon.label()).is_some()
    }

    pub fn get(&self, index: usize) -> Option<Taxon> {
        self.taxa.borrow().get_index(index).map(|(_, t)| t.clone())
    }

    pub fn get_by_label(&self, label: &str) -> Option<Taxon> {
        self.taxa.borrow().get(label).cloned()
    }

    /// Membership by identity: a look-alike taxon with the same label is not
    /// a member.
    pub fn contains(&self, taxon: &Taxon) -> bool {
        self.taxa
            .borrow()
            .get(taxon.label())
            .is_some_and(|t| t == taxon)
    }

    pub fn index_of(&self, taxon: &Taxon) -> Option<usize> {
        let taxa = self.taxa.borrow();
        let (idx, _, t) = taxa.get_full(taxon.label())?;
        (t == taxon).then_some(idx)
    }

    pub fn len(&self) -> usize {
        self.taxa.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.borrow().is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.taxa.borrow().keys().cloned().collect()
    }

    /// Snapshot of the registered taxa in namespace order.
    pub fn taxa(&self) -> Vec<Taxon> {
        self.taxa.borrow().values().cloned().collect()
    }

    /// Whether both handles refer to the same registry.
    pub fn ptr_eq(&self, other: &TaxonNamespace) -> bool {
        Rc::ptr_eq(&self.taxa, &other.taxa)
    }
}

impl fmt::Debug for TaxonNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.taxa.borrow().keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_taxon_is_idempotent() {
        let ns = TaxonNamespace::new();
        let a = ns.require_taxon("A");
        let again = ns.require_taxon("A");
        assert_eq!(a, again);
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_identity_not_label() {
        let ns = TaxonNamespace::from_labels(["A", "B"]);
        let lookalike = Taxon::new("A");
        assert_eq!(lookalike.label(), "A");
        assert!(!ns.contains(&lookalike));
        assert_eq!(ns.index_of(&lookalike), None);
        assert!(ns.contains(&ns.get_by_label("A").unwrap()));
    }

    #[test]
    fn test_add_taxon() {
        let ns = TaxonNamespace::new();
        let t = Taxon::new("T0");
        assert!(ns.add_taxon(&t).unwrap());
        assert!(!ns.add_taxon(&t).unwrap());
        assert!(ns.contains(&t));

        let clash = Taxon::new("T0");
        assert!(matches!(ns.add_taxon(&clash), Err(CharMatrixError::DuplicateLabel(l)) if l == "T0"));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_positions_and_order() {
        let ns = TaxonNamespace::from_labels(["T0", "T1", "T2"]);
        assert_eq!(ns.labels(), vec!["T0", "T1", "T2"]);
        assert_eq!(ns.get(1).unwrap().label(), "T1");
        assert!(ns.get(3).is_none());

        let t1 = ns.get(1).unwrap();
        assert!(ns.remove_taxon(&t1));
        assert!(!ns.remove_taxon(&t1));
        assert_eq!(ns.labels(), vec!["T0", "T2"]);
        assert_eq!(ns.index_of(&ns.get_by_label("T2").unwrap()), Some(1));
    }

    #[test]
    fn test_clones_share_registry() {
        let ns = TaxonNamespace::new();
        let shared = ns.clone();
        shared.require_taxon("X");
        assert_eq!(ns.len(), 1);
        assert!(ns.ptr_eq(&shared));
        assert!(!ns.ptr_eq(&TaxonNamespace::new()));
    }

    #[test]
    fn test_from_tree() {
        let tree = PhyloTree::from_newick("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
        let ns = TaxonNamespace::from_tree(&tree).unwrap();
        let mut labels = ns.labels();
        labels.sort();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_from_tree_duplicate_leaf() {
        let tree = PhyloTree::from_newick("((A:0.1,B:0.2):0.3,A:0.4);").unwrap();
        assert!(matches!(
            TaxonNamespace::from_tree(&tree),
            Err(CharMatrixError::DuplicateLabel(l)) if l == "A"
        ));
    }
}
