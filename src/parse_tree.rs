//! Simple recursive-descent parsing of bracketed treebank notation,
//! e.g. `(S (NP (D the) (N man)) (VP walks))`

use regex::Regex;
use std::str::FromStr;

use crate::tree::Tree;
use crate::Err;

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(caps) = re.captures(s) {
    let m = caps.get(0).unwrap();
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<Option<char>> {
  let mut iter = s.char_indices().peekable();
  if let Some((_, c1)) = iter.next() {
    if c == c1 {
      let rest = if let Some((idx, _)) = iter.peek() {
        s.split_at(*idx).1
      } else {
        ""
      };
      return (Some(c), rest);
    }
  }
  (None, s)
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, s).into())
  }
}

/// Tries to skip 1 or more \s characters and comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"\s+(//.*?\n\s*)*|(//.*?\n\s*)+");
  optional_re(&WHITESPACE_OR_COMMENT, s).1
}

/// Tries to parse a label: anything that isn't whitespace or a paren
fn parse_label(s: &str) -> ParseResult<&str> {
  regex_static!(LABEL, r"[^\s()]+");
  if let (Some(label), rest) = optional_re(&LABEL, s) {
    Ok((label, rest))
  } else {
    Err(format!("expected label at {}", s).into())
  }
}

/// Parses one node: either a bare leaf label, or `(label child...)`
fn parse_node(s: &str) -> ParseResult<Tree<String>> {
  if s.starts_with('(') {
    let (_, s) = needed_char('(', s)?;
    let s = skip_whitespace(s);
    let (label, s) = parse_label(s)?;

    let mut children = Vec::new();
    let mut rem = s;
    loop {
      rem = skip_whitespace(rem);
      if let (Some(_), s) = optional_char(')', rem) {
        return Ok((Tree::with_children(label.to_string(), children), s));
      }
      if rem.is_empty() {
        return Err(format!("unclosed ( for {}", label).into());
      }
      let (child, s) = parse_node(rem)?;
      children.push(child);
      rem = s;
    }
  } else {
    let (label, s) = parse_label(s)?;
    Ok((Tree::new(label.to_string()), s))
  }
}

/// Parses a whole corpus: any number of whitespace-separated trees
pub fn parse_trees(s: &str) -> Result<Vec<Tree<String>>, Err> {
  let mut trees = Vec::new();
  let mut rem = skip_whitespace(s);
  while !rem.is_empty() {
    let (tree, s) = parse_node(rem)?;
    trees.push(tree);
    rem = skip_whitespace(s);
  }
  Ok(trees)
}

impl FromStr for Tree<String> {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (tree, rest) = parse_node(skip_whitespace(s))?;
    let rest = skip_whitespace(rest);
    if rest.is_empty() {
      Ok(tree)
    } else {
      Err(format!("trailing input after tree: {}", rest).into())
    }
  }
}

#[test]
fn test_parse_tree() {
  let t: Tree<String> = "(S (NP (D the) (N man)) (VP walks))".parse().unwrap();
  assert_eq!(t.label, "S");
  assert_eq!(t.children.len(), 2);
  assert_eq!(
    t.leaves(),
    vec![&"the".to_string(), &"man".to_string(), &"walks".to_string()]
  );
  // round-trips through Display
  assert_eq!(t.to_string().parse::<Tree<String>>().unwrap(), t);
}

#[test]
fn test_parse_corpus() {
  let corpus = r#"
    // two tiny trees
    (S (N mary) (V sleeps))
    (S (N sue) (V walks))
  "#;
  let trees = parse_trees(corpus).unwrap();
  assert_eq!(trees.len(), 2);
  assert_eq!(trees[1].leaves(), vec![&"sue".to_string(), &"walks".to_string()]);
}

#[test]
fn test_parse_errors() {
  assert!("(S (NP".parse::<Tree<String>>().is_err());
  assert!("(S x) y".parse::<Tree<String>>().is_err());
  assert!("".parse::<Tree<String>>().is_err());
}
