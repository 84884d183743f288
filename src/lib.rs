#[macro_use]
extern crate lazy_static;

pub mod binarize;
pub mod chart;
pub mod corpus;
pub mod goodman;
pub mod grammar;
pub mod parse;
pub mod parse_tree;
pub mod symbol;
pub mod tree;
pub mod udop;
pub mod utils;

pub use crate::binarize::{reconstruct, BinTok, Binarizer};
pub use crate::chart::{parse_chart, parse_chart_tagged, Chart};
pub use crate::goodman::GoodmanDop;
pub use crate::grammar::{CnfGrammar, Rule};
pub use crate::parse::DopParse;
pub use crate::parse_tree::parse_trees;
pub use crate::symbol::{Symbol, SymbolRegistry};
pub use crate::tree::Tree;
pub use crate::udop::{FastUdop, SimpleUdop};
pub use crate::utils::Err;

#[test]
fn test_supervised_train_and_parse() {
  let corpus = parse_trees(
    r"
    (S (NP (D the) (N man)) (VP walks))
    (S (NP (D the) (N dog)) (VP sleeps))
    (S (NP (D a) (N dog)) (VP walks))
  ",
  )
  .unwrap();

  let mut dop: GoodmanDop<String> = GoodmanDop::new();
  dop.add_corpus(&corpus).unwrap();

  let sentence: Vec<String> = ["the", "dog", "walks"].iter().map(|s| s.to_string()).collect();
  let result = dop.parse(&sentence).unwrap();
  assert!(result.is_member());

  let (best, p) = result.best_parse().unwrap();
  assert_eq!(best.to_string(), "(S (NP (D the) (N dog)) (VP walks))");
  assert!(p > 0.0 && p <= 1.0 + 1e-9);

  // the most probable derivation reconstructs to some surface parse too
  let (derivation, dp) = result.best_derivation().unwrap();
  assert!(dp <= p + 1e-12);
  assert!(parse::is_goodman_derivation(derivation));
}

#[test]
fn test_unseen_word_is_not_a_member() {
  let corpus = parse_trees("(S (NP (D the) (N man)) (VP walks))").unwrap();
  let mut dop: GoodmanDop<String> = GoodmanDop::new();
  dop.add_corpus(&corpus).unwrap();

  let sentence: Vec<String> = ["the", "cat", "walks"].iter().map(|s| s.to_string()).collect();
  assert!(!dop.parse(&sentence).unwrap().is_member());
}

#[test]
fn test_unsupervised_train_and_parse() {
  let words = |ws: &[&str]| -> Vec<String> { ws.iter().map(|s| s.to_string()).collect() };

  let mut udop = FastUdop::new("X".to_string(), 8);
  udop.add_sentence(&words(&["the", "man", "walks"])).unwrap();
  udop.add_sentence(&words(&["the", "dog", "sleeps"])).unwrap();

  let result = udop.parse(&words(&["the", "man", "sleeps"])).unwrap();
  assert!(result.is_member());

  // every surface parse is a complete binary bracketing under the category
  for (tree, p) in result.parses() {
    assert_eq!(tree.label, "X");
    assert_eq!(tree.leaves().len(), 3);
    assert!(*p > 0.0);
  }
}
