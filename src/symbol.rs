use std::fmt;
use std::hash::{Hash, Hasher};

/// A grammar symbol, either shared across the whole grammar (equal by value)
/// or unique to one occurrence in one training tree (equal by id only).
///
/// Two `Unique` symbols are never equal even if they wrap the same value;
/// a `Shared` symbol is interchangeable everywhere it appears.
#[derive(Debug, Clone)]
pub enum Symbol<A> {
  Shared(A),
  Unique(A, u64),
}

impl<A> Symbol<A> {
  pub fn is_shared(&self) -> bool {
    matches!(self, Self::Shared(_))
  }

  pub fn is_unique(&self) -> bool {
    matches!(self, Self::Unique(_, _))
  }

  /// The wrapped value, ignoring identity
  pub fn inner(&self) -> &A {
    match self {
      Self::Shared(a) => a,
      Self::Unique(a, _) => a,
    }
  }
}

impl<A> PartialEq for Symbol<A>
where
  A: PartialEq,
{
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Shared(a), Self::Shared(b)) => a == b,
      (Self::Unique(_, a), Self::Unique(_, b)) => a == b,
      _ => false,
    }
  }
}

impl<A> Eq for Symbol<A> where A: Eq {}

impl<A> Hash for Symbol<A>
where
  A: Hash,
{
  fn hash<H: Hasher>(&self, state: &mut H) {
    match self {
      Self::Shared(a) => {
        0u8.hash(state);
        a.hash(state);
      }
      Self::Unique(_, id) => {
        1u8.hash(state);
        id.hash(state);
      }
    }
  }
}

impl<A> fmt::Display for Symbol<A>
where
  A: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Shared(a) => write!(f, "{}", a),
      Self::Unique(a, id) => write!(f, "{}~{}", a, id),
    }
  }
}

/// Mints fresh ids for unique symbols. Scoped to one trained grammar, not
/// process-wide, so unrelated grammars number independently.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
  next_id: u64,
}

impl SymbolRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn shared<A>(&self, value: A) -> Symbol<A> {
    Symbol::Shared(value)
  }

  pub fn unique<A>(&mut self, value: A) -> Symbol<A> {
    let id = self.next_id;
    self.next_id += 1;
    Symbol::Unique(value, id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn shared_equality_is_by_value() {
    assert_eq!(Symbol::Shared("NP"), Symbol::Shared("NP"));
    assert_ne!(Symbol::Shared("NP"), Symbol::Shared("VP"));
  }

  #[test]
  fn unique_equality_is_by_id_only() {
    let mut reg = SymbolRegistry::new();
    let a = reg.unique("NP");
    let b = reg.unique("NP");
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    // same wrapped value, different identity: never equal to the shared form
    assert_ne!(a, Symbol::Shared("NP"));
  }

  #[test]
  fn hashing_matches_equality() {
    let mut reg = SymbolRegistry::new();
    let u1 = reg.unique("X");
    let u2 = reg.unique("X");

    let mut set = HashSet::new();
    set.insert(Symbol::Shared("X"));
    set.insert(u1.clone());
    set.insert(u2);
    set.insert(u1);
    assert_eq!(set.len(), 3);
  }
}
