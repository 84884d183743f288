use std::fmt;

/// Generic ordered n-ary labeled tree. A node owns its children exclusively;
/// the structure is always acyclic, rooted, and ordered.
///
/// Used both as training input (treebank trees) and as reconstructed parse
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tree<T> {
  pub label: T,
  pub children: Vec<Tree<T>>,
}

impl<T> Tree<T> {
  pub fn new(label: T) -> Self {
    Self {
      label,
      children: Vec::new(),
    }
  }

  pub fn with_children(label: T, children: Vec<Tree<T>>) -> Self {
    Self { label, children }
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  /// Number of nodes in the tree, the root included
  pub fn size(&self) -> usize {
    1 + self.children.iter().map(|c| c.size()).sum::<usize>()
  }

  /// The labels of the leaves, left to right. For a treebank tree this is
  /// the surface sentence.
  pub fn leaves(&self) -> Vec<&T> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
    if self.is_leaf() {
      out.push(&self.label);
    } else {
      for child in self.children.iter() {
        child.collect_leaves(out);
      }
    }
  }

  pub fn map<V>(&self, f: &impl Fn(&T) -> V) -> Tree<V> {
    Tree {
      label: f(&self.label),
      children: self.children.iter().map(|c| c.map(f)).collect(),
    }
  }
}

impl<T> fmt::Display for Tree<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_leaf() {
      write!(f, "{}", self.label)
    } else {
      write!(f, "({}", self.label)?;
      for child in self.children.iter() {
        write!(f, " {}", child)?;
      }
      write!(f, ")")
    }
  }
}

#[test]
fn test_leaves() {
  let t = Tree::with_children(
    "S",
    vec![
      Tree::with_children(
        "NP",
        vec![
          Tree::with_children("D", vec![Tree::new("the")]),
          Tree::with_children("N", vec![Tree::new("man")]),
        ],
      ),
      Tree::with_children("V", vec![Tree::new("walks")]),
    ],
  );

  assert_eq!(t.leaves(), vec![&"the", &"man", &"walks"]);
  assert_eq!(t.size(), 8);
  assert_eq!(t.to_string(), "(S (NP (D the) (N man)) (V walks))");
}

#[test]
fn test_map() {
  let t = Tree::with_children("a", vec![Tree::new("b"), Tree::new("c")]);
  let mapped = t.map(&|s| s.to_uppercase());
  assert_eq!(mapped.label, "A");
  assert_eq!(mapped.leaves(), vec![&"B".to_string(), &"C".to_string()]);
}
