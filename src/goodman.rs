use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::path::Path;

use tracing::debug;

use crate::binarize::{BinTok, Binarizer};
use crate::chart::parse_chart;
use crate::grammar::{CnfGrammar, Rule};
use crate::parse::DopParse;
use crate::symbol::{Symbol, SymbolRegistry};
use crate::tree::Tree;
use crate::Err;

/// Data-oriented parser trained by Goodman's polynomial reduction.
///
/// Conceptually the model's grammar is "every subtree of every training
/// tree"; the reduction represents that bag as a finite weighted CNF grammar
/// by giving every tree node a second, occurrence-unique identity. Training
/// is append-only: the grammar and its frequency totals only ever grow.
pub struct GoodmanDop<T>
where
  T: Clone + Eq + Hash,
{
  pub(crate) grammar: CnfGrammar<BinTok<T>>,
  pub(crate) registry: SymbolRegistry,
  pub(crate) binarizer: Binarizer,
  /// shared symbols of training-tree roots, used as a ranking bonus when
  /// sorting completed parses
  pub(crate) root_symbols: HashSet<Symbol<BinTok<T>>>,
  /// beam width for chart pruning; None parses exhaustively
  pub beam: Option<usize>,
}

impl<T> Default for GoodmanDop<T>
where
  T: Clone + Eq + Hash,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T> GoodmanDop<T>
where
  T: Clone + Eq + Hash,
{
  pub fn new() -> Self {
    Self {
      grammar: CnfGrammar::new(),
      registry: SymbolRegistry::new(),
      binarizer: Binarizer::new(),
      root_symbols: HashSet::new(),
      beam: None,
    }
  }

  pub fn grammar(&self) -> &CnfGrammar<BinTok<T>> {
    &self.grammar
  }

  pub fn root_symbols(&self) -> &HashSet<Symbol<BinTok<T>>> {
    &self.root_symbols
  }

  /// Reduces one training tree into the grammar. The tree is binarized with
  /// unary collapsing, since the reduction only handles binary nodes and
  /// preterminals.
  pub fn add_tree(&mut self, tree: &Tree<T>) -> Result<(), Err> {
    let bin = self.binarizer.binarize(tree, true);
    let root_unique = self.registry.unique(bin.label.clone());
    self.root_symbols.insert(Symbol::Shared(bin.label.clone()));

    let before = self.grammar.len();
    self.reduce_node(&bin, root_unique)?;
    debug!(
      new_rules = self.grammar.len() - before,
      total_rules = self.grammar.len(),
      "reduced training tree"
    );
    Ok(())
  }

  pub fn add_corpus<'a, I>(&mut self, corpus: I) -> Result<(), Err>
  where
    I: IntoIterator<Item = &'a Tree<T>>,
    T: 'a,
  {
    for tree in corpus {
      self.add_tree(tree)?;
    }
    Ok(())
  }

  /// Walks one binarized node, emitting its Goodman rules and returning its
  /// subtree count: 1 for leaves and preterminals, `(sc(Y)+1) * (sc(Z)+1)`
  /// for a binary node `X -> Y Z` (the +1 per child models truncating that
  /// branch instead of descending).
  ///
  /// `unique_from` is this node's occurrence-unique identity, minted by the
  /// caller; children are always addressed by their own fresh identities.
  fn reduce_node(
    &mut self,
    node: &Tree<BinTok<T>>,
    unique_from: Symbol<BinTok<T>>,
  ) -> Result<f64, Err> {
    match node.children.as_slice() {
      [] => Ok(1.0),
      [word] if word.is_leaf() => {
        emit_lexical(
          &mut self.grammar,
          Symbol::Shared(node.label.clone()),
          unique_from,
          Symbol::Shared(word.label.clone()),
          1.0,
        );
        Ok(1.0)
      }
      [_] => Err("unary internal node survived binarization; can't reduce".into()),
      [left, right] => {
        let left_unique = self.registry.unique(left.label.clone());
        let right_unique = self.registry.unique(right.label.clone());
        let sc_left = self.reduce_node(left, left_unique.clone())?;
        let sc_right = self.reduce_node(right, right_unique.clone())?;
        let sc = (sc_left + 1.0) * (sc_right + 1.0);

        emit_binary(
          &mut self.grammar,
          Symbol::Shared(node.label.clone()),
          unique_from,
          (Symbol::Shared(left.label.clone()), left_unique, sc_left),
          (Symbol::Shared(right.label.clone()), right_unique, sc_right),
          sc,
          sc,
          1.0,
        );
        Ok(sc)
      }
      _ => Err("tree is not binarized: node with more than 2 children".into()),
    }
  }

  /// Parses a sentence against the trained grammar and filters the raw
  /// derivations down to the DOP model's parses.
  pub fn parse(&self, sentence: &[T]) -> Result<DopParse<T>, Err> {
    let words: Vec<BinTok<T>> = sentence.iter().map(|w| BinTok::Regular(w.clone())).collect();
    let chart = parse_chart(&self.grammar, &words, self.beam);
    DopParse::from_derivations(chart.all(&self.root_symbols), &self.root_symbols)
  }
}

impl<T> GoodmanDop<T>
where
  T: Clone + Eq + Hash + fmt::Display,
{
  /// Dumps the frequency and rule tables; see [`CnfGrammar::write`]
  pub fn write(&self, dir: &Path, base: &str) -> Result<(), Err> {
    self.grammar.write(dir, base)
  }
}

/// The 8-way rule emission for one binary node `X -> Y Z`, one rule per
/// boolean triple `(unique_from, unique_to1, unique_to2)`, iterated as a
/// 3-bit counter: to1 flips every step, to2 every 2, from every 4.
///
/// Making a child unique multiplies the weight by that child's subtree count
/// (all the ways the corresponding occurrence continues downward); a unique
/// `from` is normalized by `unique_denominator` at storage time, while the
/// shared `from` accumulates raw weight and is normalized at lookup through
/// the frequency table.
///
/// `node_count` is added to the shared LHS frequency total exactly once per
/// node, not once per combination. `multiplier` scales the shared-side
/// contributions for callers that emit one node standing for many tree
/// occurrences (the UDOP chart skeleton); supervised training passes 1.
pub(crate) fn emit_binary<A>(
  grammar: &mut CnfGrammar<A>,
  shared_from: Symbol<A>,
  unique_from: Symbol<A>,
  left: (Symbol<A>, Symbol<A>, f64),
  right: (Symbol<A>, Symbol<A>, f64),
  unique_denominator: f64,
  node_count: f64,
  multiplier: f64,
) where
  A: Clone + Eq + Hash,
{
  let (left_shared, left_unique, sc_left) = left;
  let (right_shared, right_unique, sc_right) = right;

  for combo in 0..8u8 {
    let unique_to1 = combo & 1 != 0;
    let unique_to2 = combo & 2 != 0;
    let unique_lhs = combo & 4 != 0;

    let mut weight = 1.0;
    if unique_to1 {
      weight *= sc_left;
    }
    if unique_to2 {
      weight *= sc_right;
    }

    let to1 = if unique_to1 { left_unique.clone() } else { left_shared.clone() };
    let to2 = if unique_to2 { right_unique.clone() } else { right_shared.clone() };

    if unique_lhs {
      // unique symbols are fresh per node, so this only ever accumulates
      // when one cell symbol stands for several partitions (the UDOP
      // skeleton walk); supervised nodes emit each unique rule once
      grammar.add_rule_weighted(
        Rule::binary(unique_from.clone(), to1, to2),
        weight / unique_denominator,
      );
    } else {
      grammar.add_rule_weighted(
        Rule::binary(shared_from.clone(), to1, to2),
        weight * multiplier,
      );
    }
  }

  grammar.add_frequency(&shared_from, node_count * multiplier);
}

/// Lexical emission for a preterminal `X -> word`: only the 1-bit
/// shared/unique-from combination applies. Both forms are registered so that
/// parse filtering can tell real lexical insertion from synthetic
/// scaffolding.
pub(crate) fn emit_lexical<A>(
  grammar: &mut CnfGrammar<A>,
  shared_from: Symbol<A>,
  unique_from: Symbol<A>,
  word: Symbol<A>,
  multiplier: f64,
) where
  A: Clone + Eq + Hash,
{
  grammar.add_rule_weighted(Rule::unary(shared_from.clone(), word.clone()), multiplier);
  grammar.add_frequency(&shared_from, multiplier);
  grammar.set_rule_weighted(Rule::unary(unique_from, word), 1.0);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn shared(name: &str) -> Symbol<BinTok<String>> {
    Symbol::Shared(BinTok::Regular(name.to_string()))
  }

  fn train(trees: &[&str]) -> GoodmanDop<String> {
    let mut dop = GoodmanDop::new();
    for t in trees {
      dop.add_tree(&t.parse().unwrap()).unwrap();
    }
    dop
  }

  #[test]
  fn test_rule_count_invariant() {
    // one preterminal: exactly 2 rules (shared-from and unique-from)
    let dop = train(&["(N man)"]);
    assert_eq!(dop.grammar().len(), 2);

    // one binary node over two preterminals: 8 + 2 + 2
    let dop = train(&["(S (A a) (B b))"]);
    assert_eq!(dop.grammar().len(), 12);

    // two binary nodes, three preterminals: 2 * 8 + 3 * 2
    let dop = train(&["(S (NP (D the) (N man)) (VP walks))"]);
    assert_eq!(dop.grammar().len(), 22);
  }

  #[test]
  fn test_subtree_counts_in_frequency_table() {
    let dop = train(&["(S (NP (D the) (N man)) (VP walks))"]);
    let g = dop.grammar();

    // preterminals count 1, binary nodes multiply: NP = (1+1)(1+1),
    // S = (4+1)(1+1)
    assert_eq!(g.frequency_total(&shared("D")), 1.0);
    assert_eq!(g.frequency_total(&shared("N")), 1.0);
    assert_eq!(g.frequency_total(&shared("VP")), 1.0);
    assert_eq!(g.frequency_total(&shared("NP")), 4.0);
    assert_eq!(g.frequency_total(&shared("S")), 10.0);
  }

  #[test]
  fn test_frequency_accumulates_across_trees() {
    let dop = train(&["(N man)", "(N dog)", "(N man)"]);
    let g = dop.grammar();
    assert_eq!(g.frequency_total(&shared("N")), 3.0);

    let man = Rule::unary(shared("N"), shared("man"));
    assert!((g.probability(&man) - 2.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn test_goodman_normalization() {
    // trained on exactly one tree, the valid derivations of the training
    // sentence carry the whole probability mass
    let dop = train(&["(S (NP (D the) (N man)) (VP walks))"]);
    let words: Vec<String> = ["the", "man", "walks"].iter().map(|s| s.to_string()).collect();
    let result = dop.parse(&words).unwrap();

    let total: f64 = result.derivations().iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-9, "derivation mass was {}", total);

    // every valid derivation reconstructs to the single training parse
    assert_eq!(result.parses().len(), 1);
    let (tree, p) = &result.parses()[0];
    assert_eq!(tree.to_string(), "(S (NP (D the) (N man)) (VP walks))");
    assert!((p - 1.0).abs() < 1e-9);
  }

  #[test]
  fn test_unary_collapse_on_training() {
    // the V layer under VP collapses, so the model emits VP -> walks
    let dop = train(&["(S (NP (D the) (N man)) (VP (V walks)))"]);
    let vp_walks = Rule::unary(shared("VP"), shared("walks"));
    assert!(dop.grammar().probability(&vp_walks) > 0.0);
  }

  #[test]
  fn test_generalizes_across_trees() {
    let dop = train(&[
      "(S (NP (D the) (N man)) (VP walks))",
      "(S (NP (D the) (N dog)) (VP sleeps))",
    ]);
    // novel combination of seen fragments
    let words: Vec<String> = ["the", "dog", "walks"].iter().map(|s| s.to_string()).collect();
    let result = dop.parse(&words).unwrap();
    assert!(result.is_member());
    let (tree, _) = result.best_parse().unwrap();
    assert_eq!(tree.to_string(), "(S (NP (D the) (N dog)) (VP walks))");
  }

  #[test]
  fn test_impossible_parse_is_empty() {
    let dop = train(&["(S (NP (D the) (N man)) (VP walks))"]);
    let words: Vec<String> = ["walks", "the"].iter().map(|s| s.to_string()).collect();
    let result = dop.parse(&words).unwrap();
    assert!(!result.is_member());
    assert!(result.best_parse().is_none());
    assert!(result.best_derivation().is_none());
  }
}
