use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::Write;
use std::path::Path;

use crate::symbol::Symbol;
use crate::Err;

/// A weighted CNF production `from -> to1 [to2]`. Arity 1 and 2 are the only
/// representable shapes: `to1` is mandatory and there is no `to3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule<A> {
  pub from: Symbol<A>,
  pub to1: Symbol<A>,
  pub to2: Option<Symbol<A>>,
}

impl<A> Rule<A> {
  pub fn unary(from: Symbol<A>, to: Symbol<A>) -> Self {
    Self {
      from,
      to1: to,
      to2: None,
    }
  }

  pub fn binary(from: Symbol<A>, to1: Symbol<A>, to2: Symbol<A>) -> Self {
    Self {
      from,
      to1,
      to2: Some(to2),
    }
  }

  pub fn is_unary(&self) -> bool {
    self.to2.is_none()
  }
}

impl<A> fmt::Display for Rule<A>
where
  A: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.from, self.to1)?;
    if let Some(to2) = &self.to2 {
      write!(f, " {}", to2)?;
    }
    Ok(())
  }
}

/// Weighted rule store for a binarized grammar.
///
/// Weights are frequency accumulators, not fixed probabilities: callers
/// either increment them (`add_rule_weighted`) or replace them
/// (`set_rule_weighted`). A rule with a `Shared` left-hand symbol is
/// normalized at lookup time against that symbol's running frequency total;
/// a `Unique` left-hand symbol stores its weight already normalized.
#[derive(Debug, Default)]
pub struct CnfGrammar<A>
where
  A: Clone + Eq + Hash,
{
  weights: HashMap<Rule<A>, f64>,
  /// unary rules indexed by their single right-hand symbol, for seeding
  /// chart leaves from input words
  by_rhs: HashMap<Symbol<A>, Vec<Rule<A>>>,
  /// binary rules indexed by their ordered right-hand pair
  by_rhs_pair: HashMap<(Symbol<A>, Symbol<A>), Vec<Rule<A>>>,
  by_lhs: HashMap<Symbol<A>, Vec<Rule<A>>>,
  /// accumulated frequency mass per shared left-hand symbol; written only
  /// during training, never decremented
  totals: HashMap<Symbol<A>, f64>,
}

impl<A> CnfGrammar<A>
where
  A: Clone + Eq + Hash,
{
  pub fn new() -> Self {
    Self {
      weights: HashMap::new(),
      by_rhs: HashMap::new(),
      by_rhs_pair: HashMap::new(),
      by_lhs: HashMap::new(),
      totals: HashMap::new(),
    }
  }

  /// Number of distinct rules
  pub fn len(&self) -> usize {
    self.weights.len()
  }

  pub fn is_empty(&self) -> bool {
    self.weights.is_empty()
  }

  fn index_rule(&mut self, rule: &Rule<A>) {
    match &rule.to2 {
      None => self
        .by_rhs
        .entry(rule.to1.clone())
        .or_default()
        .push(rule.clone()),
      Some(to2) => self
        .by_rhs_pair
        .entry((rule.to1.clone(), to2.clone()))
        .or_default()
        .push(rule.clone()),
    }
    self.by_lhs.entry(rule.from.clone()).or_default().push(rule.clone());
  }

  pub fn add_rule(&mut self, rule: Rule<A>) {
    self.add_rule_weighted(rule, 1.0);
  }

  /// Increments the stored weight for the exact rule, creating it if absent
  pub fn add_rule_weighted(&mut self, rule: Rule<A>, weight: f64) {
    if !self.weights.contains_key(&rule) {
      self.index_rule(&rule);
    }
    *self.weights.entry(rule).or_insert(0.0) += weight;
  }

  /// Replaces the stored weight for the exact rule, creating it if absent.
  /// Used for unique-LHS rules, whose weight is fully normalized at storage
  /// time.
  pub fn set_rule_weighted(&mut self, rule: Rule<A>, weight: f64) {
    if !self.weights.contains_key(&rule) {
      self.index_rule(&rule);
    }
    self.weights.insert(rule, weight);
  }

  /// Accumulates frequency mass for a shared left-hand symbol. Unique
  /// symbols don't normalize through the table and are ignored here.
  pub fn add_frequency(&mut self, from: &Symbol<A>, amount: f64) {
    if from.is_shared() {
      *self.totals.entry(from.clone()).or_insert(0.0) += amount;
    }
  }

  pub fn frequency_total(&self, from: &Symbol<A>) -> f64 {
    self.totals.get(from).copied().unwrap_or(0.0)
  }

  /// The rule's probability: 0 if absent; the stored weight directly for a
  /// unique LHS; `weight / total` for a shared LHS (0 when the symbol never
  /// accumulated any frequency, never a division error).
  pub fn probability(&self, rule: &Rule<A>) -> f64 {
    let weight = match self.weights.get(rule) {
      Some(w) => *w,
      None => return 0.0,
    };
    if rule.from.is_unique() {
      return weight;
    }
    let total = self.frequency_total(&rule.from);
    if total == 0.0 { 0.0 } else { weight / total }
  }

  /// All unary rules producing exactly `rhs`
  pub fn unary_rules_for(&self, rhs: &Symbol<A>) -> &[Rule<A>] {
    self.by_rhs.get(rhs).map(Vec::as_slice).unwrap_or(&[])
  }

  /// All binary rules producing exactly the ordered pair `(left, right)`
  pub fn binary_rules_for(&self, left: &Symbol<A>, right: &Symbol<A>) -> &[Rule<A>] {
    // a HashMap<(Symbol, Symbol), _> can't be keyed by a pair of refs
    // without cloning; the clone here is on the lookup path but keeps the
    // index simple
    self
      .by_rhs_pair
      .get(&(left.clone(), right.clone()))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// All rules expanding `lhs`
  pub fn rules_for(&self, lhs: &Symbol<A>) -> &[Rule<A>] {
    self.by_lhs.get(lhs).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn rules(&self) -> impl Iterator<Item = (&Rule<A>, f64)> {
    self.weights.iter().map(|(r, w)| (r, *w))
  }

  pub fn frequencies(&self) -> impl Iterator<Item = (&Symbol<A>, f64)> {
    self.totals.iter().map(|(s, t)| (s, *t))
  }
}

impl<A> CnfGrammar<A>
where
  A: Clone + Eq + Hash + fmt::Display,
{
  /// Dumps the frequency table and the raw rule table as flat CSV-ish files
  /// `{base}-frequencies.csv` and `{base}-rules.csv` under `dir`.
  pub fn write(&self, dir: &Path, base: &str) -> Result<(), Err> {
    let mut freqs = File::create(dir.join(format!("{}-frequencies.csv", base)))?;
    writeln!(freqs, "symbol,total")?;
    for (symbol, total) in self.frequencies() {
      writeln!(freqs, "{},{}", symbol, total)?;
    }

    let mut rules = File::create(dir.join(format!("{}-rules.csv", base)))?;
    writeln!(rules, "from,to1,to2,weight,probability")?;
    for (rule, weight) in self.rules() {
      writeln!(
        rules,
        "{},{},{},{},{}",
        rule.from,
        rule.to1,
        rule.to2.as_ref().map(|s| s.to_string()).unwrap_or_default(),
        weight,
        self.probability(rule)
      )?;
    }

    Ok(())
  }
}

impl<A> fmt::Display for CnfGrammar<A>
where
  A: Clone + Eq + Hash + fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** rules: {}", self.len())?;
    for (rule, weight) in self.weights.iter() {
      writeln!(f, "{}  [w={}, p={}]", rule, weight, self.probability(rule))?;
    }
    Ok(())
  }
}

#[cfg(test)]
use crate::symbol::SymbolRegistry;

#[test]
fn test_add_increments_set_replaces() {
  let mut g: CnfGrammar<&str> = CnfGrammar::new();
  let r = Rule::unary(Symbol::Shared("N"), Symbol::Shared("man"));

  g.add_rule_weighted(r.clone(), 1.0);
  g.add_rule_weighted(r.clone(), 2.0);
  assert_eq!(g.len(), 1);
  g.add_frequency(&Symbol::Shared("N"), 4.0);
  assert!((g.probability(&r) - 0.75).abs() < 1e-12);

  g.set_rule_weighted(r.clone(), 1.0);
  assert!((g.probability(&r) - 0.25).abs() < 1e-12);
}

#[test]
fn test_unique_lhs_is_prenormalized() {
  let mut reg = SymbolRegistry::new();
  let mut g: CnfGrammar<&str> = CnfGrammar::new();
  let u = reg.unique("N");
  let r = Rule::unary(u, Symbol::Shared("man"));

  g.set_rule_weighted(r.clone(), 0.125);
  // no frequency total involved
  assert_eq!(g.probability(&r), 0.125);
}

#[test]
fn test_absent_and_zero_total_lookups() {
  let mut g: CnfGrammar<&str> = CnfGrammar::new();
  let r = Rule::binary(Symbol::Shared("S"), Symbol::Shared("NP"), Symbol::Shared("VP"));
  assert_eq!(g.probability(&r), 0.0);

  // present rule, but its LHS never accumulated frequency: 0, not an error
  g.add_rule_weighted(r.clone(), 3.0);
  assert_eq!(g.probability(&r), 0.0);
}

#[test]
fn test_indices() {
  let mut g: CnfGrammar<&str> = CnfGrammar::new();
  let lex = Rule::unary(Symbol::Shared("D"), Symbol::Shared("the"));
  let bin = Rule::binary(Symbol::Shared("NP"), Symbol::Shared("D"), Symbol::Shared("N"));
  g.add_rule(lex.clone());
  g.add_rule(bin.clone());

  assert_eq!(g.unary_rules_for(&Symbol::Shared("the")), &[lex.clone()]);
  assert_eq!(
    g.binary_rules_for(&Symbol::Shared("D"), &Symbol::Shared("N")),
    &[bin.clone()]
  );
  assert_eq!(g.rules_for(&Symbol::Shared("NP")), &[bin]);
  assert!(g.unary_rules_for(&Symbol::Shared("cat")).is_empty());

  // re-adding the same rule must not duplicate index entries
  g.add_rule(lex.clone());
  assert_eq!(g.unary_rules_for(&Symbol::Shared("the")).len(), 1);
}
