use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::grammar::CnfGrammar;
use crate::symbol::Symbol;
use crate::tree::Tree;

/// Reference to a node in the chart arena: `span` is the covered length
/// (1-based), `start` the leftmost input position, `idx` the position in the
/// cell's node list. Backlinks always reference strictly smaller spans, so
/// the chart is a DAG and reconstruction terminates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NodeRef {
  span: usize,
  start: usize,
  idx: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartNode<A> {
  pub symbol: Symbol<A>,
  pub probability: f64,
  backlink1: Option<NodeRef>,
  backlink2: Option<NodeRef>,
  /// set only by pruning; disabled nodes are skipped, never deleted
  disabled: bool,
}

impl<A> ChartNode<A> {
  fn leaf(symbol: Symbol<A>, probability: f64) -> Self {
    Self {
      symbol,
      probability,
      backlink1: None,
      backlink2: None,
      disabled: false,
    }
  }
}

/// Triangular CYK chart over a sentence of length `n`. Cell `(start, span)`
/// holds every recognized constituent covering `input[start..start+span]`.
#[derive(Debug)]
pub struct Chart<A> {
  n: usize,
  /// rows[span - 1][start] is the cell's node arena
  rows: Vec<Vec<Vec<ChartNode<A>>>>,
}

/// Builds the chart for `input` bottom-up against the trained grammar,
/// seeding leaves from the grammar's lexicon (unary rules whose right-hand
/// side is the input word).
///
/// `beam`, if given, prunes each fully-filled span length down to its `k`
/// highest-probability nodes across all starts. Pruning only narrows the
/// search; an emptied-out beam shows up as an ordinary empty parse.
pub fn parse_chart<A>(g: &CnfGrammar<A>, input: &[A], beam: Option<usize>) -> Chart<A>
where
  A: Clone + Eq + Hash,
{
  let mut chart = Chart::new(input.len());

  for (i, word) in input.iter().enumerate() {
    let word_symbol = Symbol::Shared(word.clone());
    // the word itself, then one node per matching lexical rule, each
    // backlinked to the word so reconstructed trees keep their leaves
    let word_ref = NodeRef {
      span: 1,
      start: i,
      idx: 0,
    };
    let mut cell = vec![ChartNode::leaf(word_symbol.clone(), 1.0)];
    for rule in g.unary_rules_for(&word_symbol) {
      cell.push(ChartNode {
        symbol: rule.from.clone(),
        probability: g.probability(rule),
        backlink1: Some(word_ref),
        backlink2: None,
        disabled: false,
      });
    }
    chart.rows[0][i] = cell;
  }

  chart.fill(g, beam);
  chart
}

/// Pre-tagged variant: each input position already carries its symbol, which
/// is seeded with probability 1 instead of being looked up in the lexicon.
pub fn parse_chart_tagged<A>(g: &CnfGrammar<A>, tags: &[Symbol<A>], beam: Option<usize>) -> Chart<A>
where
  A: Clone + Eq + Hash,
{
  let mut chart = Chart::new(tags.len());
  for (i, tag) in tags.iter().enumerate() {
    chart.rows[0][i] = vec![ChartNode::leaf(tag.clone(), 1.0)];
  }
  chart.fill(g, beam);
  chart
}

impl<A> Chart<A>
where
  A: Clone + Eq + Hash,
{
  fn new(n: usize) -> Self {
    let rows = (0..n).map(|r| vec![Vec::new(); n - r]).collect();
    Self { n, rows }
  }

  fn node(&self, r: NodeRef) -> &ChartNode<A> {
    &self.rows[r.span - 1][r.start][r.idx]
  }

  /// Bottom-up fill: combine every pair of adjacent smaller constituents
  /// through every matching binary rule. All cells of span `l` complete
  /// before any cell of span `l + 1` begins.
  fn fill(&mut self, g: &CnfGrammar<A>, beam: Option<usize>) {
    for span in 2..=self.n {
      for start in 0..=(self.n - span) {
        let mut created = Vec::new();
        for split in 1..span {
          let left_cell = &self.rows[split - 1][start];
          let right_cell = &self.rows[span - split - 1][start + split];
          for (li, left) in left_cell.iter().enumerate() {
            if left.disabled {
              continue;
            }
            for (ri, right) in right_cell.iter().enumerate() {
              if right.disabled {
                continue;
              }
              for rule in g.binary_rules_for(&left.symbol, &right.symbol) {
                let probability = g.probability(rule) * left.probability * right.probability;
                created.push(ChartNode {
                  symbol: rule.from.clone(),
                  probability,
                  backlink1: Some(NodeRef {
                    span: split,
                    start,
                    idx: li,
                  }),
                  backlink2: Some(NodeRef {
                    span: span - split,
                    start: start + split,
                    idx: ri,
                  }),
                  disabled: false,
                });
              }
            }
          }
        }
        trace!(span, start, nodes = created.len(), "filled chart cell");
        self.rows[span - 1][start] = created;
      }

      if let Some(k) = beam {
        self.prune_span(span, k);
      }
    }
    debug!(
      n = self.n,
      top_nodes = if self.n > 0 { self.rows[self.n - 1][0].len() } else { 0 },
      "chart filled"
    );
  }

  /// Viterbi-style beam: keep the `k` highest-probability nodes created at
  /// this span length across all starts, disable the rest. Irrevocable per
  /// length; disabled nodes stay in the arena so existing NodeRefs stay
  /// valid.
  fn prune_span(&mut self, span: usize, k: usize) {
    let mut refs: Vec<(usize, usize, f64)> = Vec::new();
    for (start, cell) in self.rows[span - 1].iter().enumerate() {
      for (idx, node) in cell.iter().enumerate() {
        refs.push((start, idx, node.probability));
      }
    }
    if refs.len() <= k {
      return;
    }
    refs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    for &(start, idx, _) in refs[k..].iter() {
      self.rows[span - 1][start][idx].disabled = true;
    }
  }

  /// True iff the full-span cell recognized anything at all
  pub fn is_member(&self) -> bool {
    self.n > 0 && !self.rows[self.n - 1][0].is_empty()
  }

  fn top_cell(&self) -> &[ChartNode<A>] {
    if self.n == 0 {
      &[]
    } else {
      &self.rows[self.n - 1][0]
    }
  }

  /// The highest-probability full-span derivation, optionally restricted to
  /// a given root symbol. `None` is the ordinary no-parse result.
  pub fn best(&self, root: Option<&Symbol<A>>) -> Option<(Tree<Symbol<A>>, f64)> {
    let mut best: Option<NodeRef> = None;
    for (idx, node) in self.top_cell().iter().enumerate() {
      if node.disabled {
        continue;
      }
      if let Some(root) = root {
        if &node.symbol != root {
          continue;
        }
      }
      // strict comparison: on ties the first-created node wins, keeping
      // repeated parses deterministic
      if best.is_none_or(|b| node.probability > self.node(b).probability) {
        best = Some(NodeRef {
          span: self.n,
          start: 0,
          idx,
        });
      }
    }
    best.map(|r| (self.subtree(r), self.node(r).probability))
  }

  /// Every full-span derivation, reconstructed and sorted by probability.
  /// A derivation whose root is in `root_symbols` gets a `+1.0` ranking
  /// bonus, preferring sentence-level parses over partial-symbol ones of
  /// similar likelihood; reported probabilities are unadjusted.
  pub fn all(&self, root_symbols: &HashSet<Symbol<A>>) -> Vec<(Tree<Symbol<A>>, f64)> {
    let mut out: Vec<(Tree<Symbol<A>>, f64)> = Vec::new();
    for (idx, node) in self.top_cell().iter().enumerate() {
      if node.disabled {
        continue;
      }
      let r = NodeRef {
        span: self.n,
        start: 0,
        idx,
      };
      out.push((self.subtree(r), node.probability));
    }
    let rank = |tree: &Tree<Symbol<A>>, p: f64| {
      if root_symbols.contains(&tree.label) {
        p + 1.0
      } else {
        p
      }
    };
    out.sort_by(|a, b| {
      rank(&b.0, b.1)
        .partial_cmp(&rank(&a.0, a.1))
        .unwrap_or(Ordering::Equal)
    });
    out
  }

  /// Follows backlinks down to the leaves. Lexical leaves have no backlinks,
  /// unary-lexical nodes one, binary combinations two.
  fn subtree(&self, r: NodeRef) -> Tree<Symbol<A>> {
    let node = self.node(r);
    let mut tree = Tree::new(node.symbol.clone());
    if let Some(b1) = node.backlink1 {
      tree.children.push(self.subtree(b1));
    }
    if let Some(b2) = node.backlink2 {
      tree.children.push(self.subtree(b2));
    }
    tree
  }
}

impl<A> fmt::Display for Chart<A>
where
  A: Clone + Eq + Hash + fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for span in (1..=self.n).rev() {
      for start in 0..=(self.n - span) {
        let cell = &self.rows[span - 1][start];
        if cell.is_empty() {
          continue;
        }
        writeln!(f, "{}..{}:", start, start + span)?;
        for node in cell.iter() {
          writeln!(
            f,
            "  {} [p={}{}]",
            node.symbol,
            node.probability,
            if node.disabled { ", pruned" } else { "" }
          )?;
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::Rule;

  /// Hand-built PCFG where every rule's probability is exactly its weight:
  /// each `add` also records the weight as frequency mass, so the shared-LHS
  /// normalization divides by the per-symbol weight sum (1.0 throughout
  /// except ADJ).
  fn toy_grammar() -> CnfGrammar<&'static str> {
    let mut g = CnfGrammar::new();
    let mut add = |rule: Rule<&'static str>, w: f64| {
      let from = rule.from.clone();
      g.add_rule_weighted(rule, w);
      g.add_frequency(&from, w);
    };
    let s = |name| Symbol::Shared(name);

    add(Rule::binary(s("S"), s("NP"), s("V")), 0.9);
    add(Rule::binary(s("S"), s("D"), s("NP")), 0.1);
    add(Rule::binary(s("NP"), s("D"), s("N")), 0.9);
    add(Rule::binary(s("NP"), s("ADJ"), s("N")), 0.1);
    add(Rule::unary(s("D"), s("the")), 1.0);
    add(Rule::unary(s("N"), s("man")), 0.9);
    add(Rule::unary(s("N"), s("walks")), 0.1);
    add(Rule::unary(s("V"), s("walks")), 1.0);
    add(Rule::unary(s("ADJ"), s("man")), 0.1);
    g
  }

  const SENTENCE: [&str; 3] = ["the", "man", "walks"];

  #[test]
  fn test_membership_and_best() {
    let g = toy_grammar();
    let chart = parse_chart(&g, &SENTENCE, None);

    assert!(chart.is_member());

    let (tree, p) = chart.best(Some(&Symbol::Shared("S"))).unwrap();
    assert_eq!(tree.to_string(), "(S (NP (D the) (N man)) (V walks))");
    assert!((p - 0.729).abs() < 1e-12);
  }

  #[test]
  fn test_all_has_lower_alternative() {
    let g = toy_grammar();
    let chart = parse_chart(&g, &SENTENCE, None);
    let all = chart.all(&HashSet::new());

    assert_eq!(all.len(), 2);
    assert!((all[0].1 - 0.729).abs() < 1e-12);
    assert!(all[1].1 < all[0].1);
    assert_eq!(all[1].0.to_string(), "(S (D the) (NP (ADJ man) (N walks)))");
  }

  #[test]
  fn test_no_parse_is_a_value() {
    let g = toy_grammar();
    let chart = parse_chart(&g, &["man", "the"], None);
    assert!(!chart.is_member());
    assert!(chart.best(None).is_none());
    assert!(chart.all(&HashSet::new()).is_empty());

    let empty = parse_chart(&g, &[], None);
    assert!(!empty.is_member());
  }

  #[test]
  fn test_determinism() {
    let g = toy_grammar();
    let a = parse_chart(&g, &SENTENCE, None);
    let b = parse_chart(&g, &SENTENCE, None);
    assert_eq!(a.best(None), b.best(None));
    assert_eq!(a.all(&HashSet::new()), b.all(&HashSet::new()));
  }

  #[test]
  fn test_pruning_monotonicity() {
    let g = toy_grammar();
    let full = parse_chart(&g, &SENTENCE, None);
    let full_best = full.best(None).unwrap().1;

    for k in 1..4 {
      let pruned = parse_chart(&g, &SENTENCE, Some(k));
      if let Some((_, p)) = pruned.best(None) {
        assert!(p <= full_best + 1e-12);
      }
      // pruning never makes an unparseable sentence parseable
      assert!(!parse_chart(&g, &["man", "the"], Some(k)).is_member());
    }

    // this grammar's chart is narrow enough that a beam of 1 keeps the best parse
    let tight = parse_chart(&g, &SENTENCE, Some(1));
    assert!((tight.best(None).unwrap().1 - full_best).abs() < 1e-12);
  }

  #[test]
  fn test_root_symbol_ranking_bonus() {
    let mut g = toy_grammar();
    // rig a non-S parse of the full span that beats S on raw probability
    g.add_rule_weighted(
      Rule::binary(Symbol::Shared("Frag"), Symbol::Shared("NP"), Symbol::Shared("V")),
      1.0,
    );
    g.add_frequency(&Symbol::Shared("Frag"), 1.0);

    let chart = parse_chart(&g, &SENTENCE, None);

    let plain = chart.all(&HashSet::new());
    assert_eq!(plain[0].0.label, Symbol::Shared("Frag"));

    let mut roots = HashSet::new();
    roots.insert(Symbol::Shared("S"));
    let ranked = chart.all(&roots);
    assert_eq!(ranked[0].0.label, Symbol::Shared("S"));
    // reported probability stays unadjusted
    assert!((ranked[0].1 - 0.729).abs() < 1e-12);
  }

  #[test]
  fn test_pretagged_mode() {
    let g = toy_grammar();
    let tags = vec![Symbol::Shared("NP"), Symbol::Shared("V")];
    let chart = parse_chart_tagged(&g, &tags, None);
    assert!(chart.is_member());
    let (tree, p) = chart.best(Some(&Symbol::Shared("S"))).unwrap();
    assert!((p - 0.9).abs() < 1e-12);
    assert_eq!(tree.to_string(), "(S NP V)");
  }
}
