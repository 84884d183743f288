use std::fmt;

use crate::tree::Tree;
use crate::Err;

/// Label of a binarized tree node: either a regular symbol carried over from
/// the input tree, or a synthetic temporary introduced for the third and
/// later children of a wide node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BinTok<T> {
  Regular(T),
  Temp(u64),
}

impl<T> BinTok<T> {
  pub fn is_temp(&self) -> bool {
    matches!(self, Self::Temp(_))
  }

  pub fn regular(&self) -> Option<&T> {
    match self {
      Self::Regular(t) => Some(t),
      Self::Temp(_) => None,
    }
  }
}

impl<T> fmt::Display for BinTok<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Regular(t) => write!(f, "{}", t),
      Self::Temp(id) => write!(f, "@{}", id),
    }
  }
}

/// Converts arbitrary-arity trees into strictly binary (or unary-at-leaves)
/// trees, right-branching through synthetic [`BinTok::Temp`] nodes.
///
/// The temp counter is an explicit field rather than a process-wide static,
/// so results are reproducible independent of unrelated binarizations.
#[derive(Debug, Default)]
pub struct Binarizer {
  next_temp: u64,
}

impl Binarizer {
  pub fn new() -> Self {
    Self::default()
  }

  fn fresh_temp<T>(&mut self) -> BinTok<T> {
    let id = self.next_temp;
    self.next_temp += 1;
    BinTok::Temp(id)
  }

  pub fn binarize<T>(&mut self, tree: &Tree<T>, collapse_unary: bool) -> Tree<BinTok<T>>
  where
    T: Clone,
  {
    self.binarize_node(BinTok::Regular(tree.label.clone()), &tree.children, collapse_unary)
  }

  /// Builds the binarized node for `label` over the child list `children`:
  /// - 0 children: a leaf
  /// - 1 leaf child: kept as-is
  /// - 1 internal child: spliced out if `collapse_unary` (lossy, the unary
  ///   layer's label disappears), otherwise kept as a unary layer
  /// - 2 children: kept as-is
  /// - more: first child kept, the rest pushed down into a fresh temp node
  fn binarize_node<T>(
    &mut self,
    label: BinTok<T>,
    children: &[Tree<T>],
    collapse_unary: bool,
  ) -> Tree<BinTok<T>>
  where
    T: Clone,
  {
    let mut children = children;
    if collapse_unary {
      while children.len() == 1 && !children[0].is_leaf() {
        children = &children[0].children;
      }
    }

    let mut out = Tree::new(label);
    match children {
      [] => {}
      [only] if only.is_leaf() => {
        out.children.push(Tree::new(BinTok::Regular(only.label.clone())));
      }
      [only] => {
        out.children.push(self.binarize_node(
          BinTok::Regular(only.label.clone()),
          &only.children,
          collapse_unary,
        ));
      }
      [left, right] => {
        out.children.push(self.binarize_node(
          BinTok::Regular(left.label.clone()),
          &left.children,
          collapse_unary,
        ));
        out.children.push(self.binarize_node(
          BinTok::Regular(right.label.clone()),
          &right.children,
          collapse_unary,
        ));
      }
      [first, rest @ ..] => {
        out.children.push(self.binarize_node(
          BinTok::Regular(first.label.clone()),
          &first.children,
          collapse_unary,
        ));
        let temp = self.fresh_temp();
        out.children.push(self.binarize_node(temp, rest, collapse_unary));
      }
    }
    out
  }
}

/// Inverse of [`Binarizer::binarize`]: a temp node's children are spliced
/// into its parent's child list in place, preserving left-to-right order.
///
/// Errors if the root is a temp node or if an internal node has more than 2
/// children; both are contract violations, not recoverable conditions.
pub fn reconstruct<T>(tree: &Tree<BinTok<T>>) -> Result<Tree<T>, Err>
where
  T: Clone,
{
  match &tree.label {
    BinTok::Temp(_) => Err("can't reconstruct a tree rooted at a temporary symbol".into()),
    BinTok::Regular(label) => {
      if tree.children.len() > 2 {
        return Err("malformed binarized tree: node with more than 2 children".into());
      }
      let mut children = Vec::new();
      splice_children(&tree.children, &mut children)?;
      Ok(Tree::with_children(label.clone(), children))
    }
  }
}

fn splice_children<T>(nodes: &[Tree<BinTok<T>>], out: &mut Vec<Tree<T>>) -> Result<(), Err>
where
  T: Clone,
{
  for node in nodes {
    if node.children.len() > 2 {
      return Err("malformed binarized tree: node with more than 2 children".into());
    }
    match &node.label {
      BinTok::Temp(_) => splice_children(&node.children, out)?,
      BinTok::Regular(label) => {
        let mut children = Vec::new();
        splice_children(&node.children, &mut children)?;
        out.push(Tree::with_children(label.clone(), children));
      }
    }
  }
  Ok(())
}

#[cfg(test)]
fn tree(s: &str) -> Tree<String> {
  s.parse().unwrap()
}

#[test]
fn test_binarize_roundtrip() {
  // arity <= 2 everywhere: binarization introduces no temps and inverts exactly
  let t = tree("(S (NP (D the) (N man)) (V walks))");
  let mut b = Binarizer::new();
  let bin = b.binarize(&t, false);
  assert!(bin.leaves().iter().all(|l| !l.is_temp()));
  assert_eq!(reconstruct(&bin).unwrap(), t);
}

#[test]
fn test_binarize_wide_node() {
  let t = tree("(X a b c d)");
  let mut b = Binarizer::new();
  let bin = b.binarize(&t, false);

  // right-branching: (X a (@0 b (@1 c d)))
  assert_eq!(bin.children.len(), 2);
  assert_eq!(bin.children[1].label, BinTok::Temp(0));
  assert_eq!(bin.children[1].children[1].label, BinTok::Temp(1));

  // temps splice back out transparently
  assert_eq!(reconstruct(&bin).unwrap(), t);
}

#[test]
fn test_collapse_unary() {
  let t = tree("(S (NP (D the) (N man)) (VP (V walks)))");
  let mut b = Binarizer::new();
  let bin = b.binarize(&t, true);
  // the V layer under VP is spliced out
  assert_eq!(reconstruct(&bin).unwrap(), tree("(S (NP (D the) (N man)) (VP walks))"));
}

#[test]
fn test_reconstruct_temp_root() {
  let bad: Tree<BinTok<String>> = Tree::new(BinTok::Temp(0));
  assert!(reconstruct(&bad).is_err());
}

#[test]
fn test_reconstruct_malformed() {
  let bad: Tree<BinTok<String>> = Tree::with_children(
    BinTok::Regular("X".to_string()),
    vec![
      Tree::new(BinTok::Regular("a".to_string())),
      Tree::new(BinTok::Regular("b".to_string())),
      Tree::new(BinTok::Regular("c".to_string())),
    ],
  );
  assert!(reconstruct(&bad).is_err());
}

#[test]
fn test_temp_counter_is_stable() {
  // two binarizers started fresh assign the same temp ids
  let t = tree("(X a b c)");
  let b1 = Binarizer::new().binarize(&t, false);
  let b2 = Binarizer::new().binarize(&t, false);
  assert_eq!(b1, b2);
}
