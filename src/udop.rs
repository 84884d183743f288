use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use tracing::debug;

use crate::binarize::BinTok;
use crate::corpus::{collect_sentences, SentenceSource};
use crate::goodman::{emit_binary, emit_lexical, GoodmanDop};
use crate::parse::DopParse;
use crate::symbol::Symbol;
use crate::tree::Tree;
use crate::Err;

/// catalan(k) = number of binary bracketings of k+1 leaves
fn catalan(k: usize) -> f64 {
  let mut c = 1.0f64;
  for i in 0..k {
    c = c * 2.0 * (2 * i + 1) as f64 / (i + 2) as f64;
  }
  c
}

/// Unsupervised DOP by explicit enumeration: every binary bracketing of the
/// sentence (all `catalan(len - 1)` of them, each word under a preterminal
/// labeled with the constant category) is materialized as a training tree
/// and fed through the ordinary Goodman reduction.
///
/// Exponential per sentence, but simple and exact; the reference point for
/// [`FastUdop`].
pub struct SimpleUdop<T>
where
  T: Clone + Eq + Hash,
{
  pub dop: GoodmanDop<T>,
  category: T,
}

impl<T> SimpleUdop<T>
where
  T: Clone + Eq + Hash,
{
  pub fn new(category: T) -> Self {
    Self {
      dop: GoodmanDop::new(),
      category,
    }
  }

  pub fn add_sentence(&mut self, words: &[T]) -> Result<(), Err> {
    for tree in bracketings(&self.category, words) {
      self.dop.add_tree(&tree)?;
    }
    Ok(())
  }

  /// Drains a corpus source, training on each sentence
  pub fn add_source(&mut self, source: &mut impl SentenceSource<T>) -> Result<(), Err> {
    for sentence in collect_sentences(source) {
      self.add_sentence(&sentence)?;
    }
    Ok(())
  }

  pub fn parse(&self, sentence: &[T]) -> Result<DopParse<T>, Err> {
    self.dop.parse(sentence)
  }
}

/// All binary bracketings over `words`, built bottom-up by span with
/// memoized per-span buffers (cell `(s, l)` holds `catalan(l - 1)` trees)
fn bracketings<T>(category: &T, words: &[T]) -> Vec<Tree<T>>
where
  T: Clone,
{
  let n = words.len();
  if n == 0 {
    return Vec::new();
  }

  // memo[l - 1][s]: every tree over words[s..s + l]
  let mut memo: Vec<Vec<Vec<Tree<T>>>> = Vec::with_capacity(n);
  memo.push(
    words
      .iter()
      .map(|w| Tree::with_children(category.clone(), vec![Tree::new(w.clone())]))
      .map(|t| vec![t])
      .collect(),
  );

  for l in 2..=n {
    let mut row = Vec::with_capacity(n - l + 1);
    for s in 0..=(n - l) {
      let mut cell = Vec::new();
      for p in 1..l {
        for left in memo[p - 1][s].iter() {
          for right in memo[l - p - 1][s + p].iter() {
            cell.push(Tree::with_children(
              category.clone(),
              vec![left.clone(), right.clone()],
            ));
          }
        }
      }
      row.push(cell);
    }
    memo.push(row);
  }

  memo.pop().unwrap().swap_remove(0)
}

/// Reusable per-length chart skeleton: structurally a CYK chart, but holding
/// only combinatorics, decoupled from any grammar or sentence.
///
/// A cell of span length `l` stands for every subtree any bracketing roots
/// at that span. The skeleton records, per length (the numbers are the same
/// at every start position):
///
/// - `shapes[l]`: how many distinct subtree shapes the span has
///   (`catalan(l - 1)`)
/// - `counts[l]`: the aggregate subtree count over all those shapes,
///   the supervised `Π(sc + 1)` product summed over the partitions
///   reachable from the cell:
///   `counts[l] = Σ_p (counts[p] + shapes[p]) * (counts[l-p] + shapes[l-p])`
/// - `outside[l]`: how many whole-sentence bracketings contain any given
///   span of length `l` as a constituent (`catalan(n - l)`), the
///   multiplicity one emission at that length stands for
#[derive(Debug)]
struct Skeleton {
  counts: Vec<f64>,
  shapes: Vec<f64>,
  outside: Vec<f64>,
}

impl Skeleton {
  fn build(n: usize) -> Self {
    let shapes: Vec<f64> = (0..=n).map(|l| if l == 0 { 0.0 } else { catalan(l - 1) }).collect();

    let mut counts = vec![0.0; n + 1];
    if n >= 1 {
      counts[1] = 1.0;
    }
    for l in 2..=n {
      counts[l] = (1..l)
        .map(|p| (counts[p] + shapes[p]) * (counts[l - p] + shapes[l - p]))
        .sum();
    }

    let outside = (0..=n).map(|l| catalan(n - l)).collect();
    Self {
      counts,
      shapes,
      outside,
    }
  }

  /// Average subtree count per shape; the per-occurrence count the 8-way
  /// emission weights a merged cell symbol by
  fn mean_count(&self, l: usize) -> f64 {
    self.counts[l] / self.shapes[l]
  }
}

/// Keeps one skeleton per distinct sentence length, FIFO-evicted once more
/// than `cache_size` lengths are resident
struct SkeletonCache {
  cache_size: usize,
  by_len: HashMap<usize, Skeleton>,
  order: VecDeque<usize>,
}

impl SkeletonCache {
  fn new(cache_size: usize) -> Self {
    Self {
      cache_size,
      by_len: HashMap::new(),
      order: VecDeque::new(),
    }
  }

  fn get(&mut self, n: usize) -> &Skeleton {
    if !self.by_len.contains_key(&n) {
      if self.order.len() >= self.cache_size {
        if let Some(evicted) = self.order.pop_front() {
          self.by_len.remove(&evicted);
          debug!(length = evicted, "evicted chart skeleton");
        }
      }
      debug!(length = n, "building chart skeleton");
      self.by_len.insert(n, Skeleton::build(n));
      self.order.push_back(n);
    }
    &self.by_len[&n]
  }

  fn resident(&self) -> Vec<usize> {
    self.order.iter().copied().collect()
  }
}

/// Unsupervised DOP without materializing trees: one skeleton walk per
/// sentence emits, per cell and partition, one 8-way combination standing
/// for every bracketing that roots a subtree at that span. Each cell gets a
/// single occurrence-unique symbol merging all of its shapes, so weights
/// carry the span's outside multiplicity times the children's shape counts.
/// O(n³) per sentence, and the aggregate shared-rule weights, frequency
/// totals, and parse probabilities equal [`SimpleUdop`]'s exactly.
pub struct FastUdop<T>
where
  T: Clone + Eq + Hash,
{
  pub dop: GoodmanDop<T>,
  category: T,
  cache: SkeletonCache,
}

impl<T> FastUdop<T>
where
  T: Clone + Eq + Hash,
{
  pub fn new(category: T, cache_size: usize) -> Self {
    Self {
      dop: GoodmanDop::new(),
      category,
      cache: SkeletonCache::new(cache_size),
    }
  }

  pub fn add_sentence(&mut self, words: &[T]) -> Result<(), Err> {
    let n = words.len();
    if n == 0 {
      return Ok(());
    }

    let category = BinTok::Regular(self.category.clone());
    let shared_cat = Symbol::Shared(category.clone());
    self.dop.root_symbols.insert(shared_cat.clone());

    let skeleton = self.cache.get(n);

    // one occurrence-unique identity per cell, fresh for this sentence
    let uniques: Vec<Vec<Symbol<BinTok<T>>>> = (1..=n)
      .map(|l| {
        (0..=(n - l))
          .map(|_| self.dop.registry.unique(category.clone()))
          .collect()
      })
      .collect();

    for (s, word) in words.iter().enumerate() {
      emit_lexical(
        &mut self.dop.grammar,
        shared_cat.clone(),
        uniques[0][s].clone(),
        Symbol::Shared(BinTok::Regular(word.clone())),
        skeleton.outside[1],
      );
    }

    for l in 2..=n {
      for s in 0..=(n - l) {
        for p in 1..l {
          let sc_left = skeleton.mean_count(p);
          let sc_right = skeleton.mean_count(l - p);
          // one emission covers every (left shape, right shape) pairing of
          // this partition, hence the shape-product factor
          let pairings = skeleton.shapes[p] * skeleton.shapes[l - p];
          emit_binary(
            &mut self.dop.grammar,
            shared_cat.clone(),
            uniques[l - 1][s].clone(),
            (shared_cat.clone(), uniques[p - 1][s].clone(), sc_left),
            (shared_cat.clone(), uniques[l - p - 1][s + p].clone(), sc_right),
            // the unique cell symbol distributes over every partition and
            // shape, so its rules normalize by the whole cell's count
            skeleton.counts[l] / pairings,
            (sc_left + 1.0) * (sc_right + 1.0),
            skeleton.outside[l] * pairings,
          );
        }
      }
    }

    Ok(())
  }

  /// Drains a corpus source, training on each sentence
  pub fn add_source(&mut self, source: &mut impl SentenceSource<T>) -> Result<(), Err> {
    for sentence in collect_sentences(source) {
      self.add_sentence(&sentence)?;
    }
    Ok(())
  }

  pub fn parse(&self, sentence: &[T]) -> Result<DopParse<T>, Err> {
    self.dop.parse(sentence)
  }

  /// Lengths currently resident in the skeleton cache, oldest first
  pub fn resident_skeletons(&self) -> Vec<usize> {
    self.cache.resident()
  }
}
