use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::Write;
use std::path::Path;

use crate::binarize::{reconstruct, BinTok};
use crate::symbol::Symbol;
use crate::tree::Tree;
use crate::Err;

type Derivation<T> = Tree<Symbol<BinTok<T>>>;

/// The outcome of parsing one sentence against a Goodman-reduced grammar:
/// the valid derivations, and the surface parses they collapse into.
///
/// A raw chart derivation may use unique symbols internally; that's how the
/// reduction tells apart different weightings of the same structure. It is
/// *valid* iff its root and every leaf are shared regular symbols. Invalid
/// derivations are reduction artifacts and are discarded here.
///
/// A surface parse's probability is the sum over all valid derivations that
/// reconstruct to it, so the most probable parse and the most probable
/// single derivation differ in general; both are exposed.
pub struct DopParse<T>
where
  T: Clone + Eq + Hash,
{
  derivations: Vec<(Derivation<T>, f64)>,
  parses: Vec<(Tree<T>, f64)>,
}

/// Valid iff the root is a shared regular symbol and every leaf is shared;
/// unique symbols may appear only at internal nodes. A synthetic temp root
/// is likewise an artifact (it would not survive reconstruction).
pub fn is_goodman_derivation<T>(derivation: &Derivation<T>) -> bool
where
  T: Clone + Eq + Hash,
{
  fn leaves_shared<T>(node: &Tree<Symbol<BinTok<T>>>) -> bool {
    if node.is_leaf() {
      node.label.is_shared()
    } else {
      node.children.iter().all(leaves_shared)
    }
  }

  matches!(&derivation.label, Symbol::Shared(BinTok::Regular(_))) && leaves_shared(derivation)
}

impl<T> DopParse<T>
where
  T: Clone + Eq + Hash,
{
  /// Filters the completed chart's derivations and collapses them into
  /// surface parses. `raw` is expected in the chart's ranked order, which is
  /// preserved for the surviving derivations.
  pub(crate) fn from_derivations(
    raw: Vec<(Derivation<T>, f64)>,
    root_symbols: &HashSet<Symbol<BinTok<T>>>,
  ) -> Result<Self, Err> {
    let mut derivations = Vec::new();
    let mut summed: HashMap<Tree<T>, f64> = HashMap::new();

    for (derivation, probability) in raw {
      if !is_goodman_derivation(&derivation) {
        continue;
      }
      let surface = reconstruct(&derivation.map(&|sym| sym.inner().clone()))?;
      *summed.entry(surface).or_insert(0.0) += probability;
      derivations.push((derivation, probability));
    }

    let mut parses: Vec<(Tree<T>, f64)> = summed.into_iter().collect();
    let rank = |tree: &Tree<T>, p: f64| {
      if root_symbols.contains(&Symbol::Shared(BinTok::Regular(tree.label.clone()))) {
        p + 1.0
      } else {
        p
      }
    };
    parses.sort_by(|a, b| {
      rank(&b.0, b.1)
        .partial_cmp(&rank(&a.0, a.1))
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(Self { derivations, parses })
  }

  /// True iff at least one valid derivation covered the sentence
  pub fn is_member(&self) -> bool {
    !self.derivations.is_empty()
  }

  /// Surface parses with their summed probabilities, best-ranked first
  pub fn parses(&self) -> &[(Tree<T>, f64)] {
    &self.parses
  }

  /// Valid derivations in the chart's ranked order
  pub fn derivations(&self) -> &[(Derivation<T>, f64)] {
    &self.derivations
  }

  /// The most probable parse: the surface tree with the highest summed
  /// derivation probability
  pub fn best_parse(&self) -> Option<(&Tree<T>, f64)> {
    self.parses.first().map(|(t, p)| (t, *p))
  }

  /// The most probable derivation: the single highest-probability valid
  /// derivation, no summing
  pub fn best_derivation(&self) -> Option<(&Derivation<T>, f64)> {
    self
      .derivations
      .iter()
      .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
      .map(|(t, p)| (t, *p))
  }
}

impl<T> DopParse<T>
where
  T: Clone + Eq + Hash + fmt::Display,
{
  /// Dumps all reconstructed parses with probabilities to
  /// `{base}-parses.csv` under `dir`
  pub fn write(&self, dir: &Path, base: &str) -> Result<(), Err> {
    let mut out = File::create(dir.join(format!("{}-parses.csv", base)))?;
    writeln!(out, "parse,probability")?;
    for (tree, probability) in self.parses.iter() {
      writeln!(out, "{},{}", tree, probability)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::SymbolRegistry;

  fn shared(name: &str) -> Symbol<BinTok<String>> {
    Symbol::Shared(BinTok::Regular(name.to_string()))
  }

  #[test]
  fn test_validity_filter() {
    let mut reg = SymbolRegistry::new();

    let valid = Tree::with_children(
      shared("S"),
      vec![
        Tree::with_children(
          reg.unique(BinTok::Regular("NP".to_string())),
          vec![Tree::new(shared("the"))],
        ),
        Tree::new(shared("walks")),
      ],
    );
    assert!(is_goodman_derivation(&valid));

    // unique root
    let unique_root = Tree::with_children(
      reg.unique(BinTok::Regular("S".to_string())),
      vec![Tree::new(shared("walks"))],
    );
    assert!(!is_goodman_derivation(&unique_root));

    // unique leaf
    let unique_leaf = Tree::with_children(
      shared("S"),
      vec![Tree::new(reg.unique(BinTok::Regular("walks".to_string())))],
    );
    assert!(!is_goodman_derivation(&unique_leaf));

    // synthetic temp root
    let temp_root: Derivation<String> = Tree::with_children(
      Symbol::Shared(BinTok::Temp(0)),
      vec![Tree::new(shared("walks"))],
    );
    assert!(!is_goodman_derivation(&temp_root));
  }

  #[test]
  fn test_collapsing_sums_derivations() {
    let mut reg = SymbolRegistry::new();
    // two derivations differing only in an internal identity: one surface
    // parse with the summed probability
    let a = Tree::with_children(
      shared("S"),
      vec![
        Tree::with_children(shared("N"), vec![Tree::new(shared("mary"))]),
        Tree::with_children(shared("V"), vec![Tree::new(shared("sleeps"))]),
      ],
    );
    let b = Tree::with_children(
      shared("S"),
      vec![
        Tree::with_children(
          reg.unique(BinTok::Regular("N".to_string())),
          vec![Tree::new(shared("mary"))],
        ),
        Tree::with_children(shared("V"), vec![Tree::new(shared("sleeps"))]),
      ],
    );

    let result =
      DopParse::from_derivations(vec![(a, 0.25), (b, 0.5)], &HashSet::new()).unwrap();
    assert_eq!(result.derivations().len(), 2);
    assert_eq!(result.parses().len(), 1);

    let (tree, p) = result.best_parse().unwrap();
    assert_eq!(tree.to_string(), "(S (N mary) (V sleeps))");
    assert!((p - 0.75).abs() < 1e-12);

    // the best single derivation is the 0.5 one
    let (_, dp) = result.best_derivation().unwrap();
    assert!((dp - 0.5).abs() < 1e-12);
  }

  #[test]
  fn test_temp_nodes_splice_out_of_parses() {
    // an internal temp (from binarizing a 3-wide node) disappears from the
    // surface tree
    let derivation: Derivation<String> = Tree::with_children(
      shared("X"),
      vec![
        Tree::new(shared("a")),
        Tree::with_children(
          Symbol::Shared(BinTok::Temp(7)),
          vec![Tree::new(shared("b")), Tree::new(shared("c"))],
        ),
      ],
    );
    let result = DopParse::from_derivations(vec![(derivation, 1.0)], &HashSet::new()).unwrap();
    let (tree, _) = result.best_parse().unwrap();
    assert_eq!(tree.to_string(), "(X a b c)");
  }
}
