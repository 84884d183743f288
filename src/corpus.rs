//! Boundary interface for feeding sentences into the unsupervised trainers.
//!
//! Corpus readers live outside this crate; all the trainers need is a pull
//! source of tokens with sentence boundaries. The source yields each token
//! together with a flag marking it as the last token of its sentence.

/// A pull source of sentence tokens.
pub trait SentenceSource<T> {
  /// The next token, paired with `true` iff it ends its sentence. `None`
  /// means the source is exhausted.
  fn next_token(&mut self) -> Option<(T, bool)>;
}

/// Drains a source into whole sentences. A trailing sentence without an
/// end-of-sentence flag is still returned; empty sentences are not produced.
pub fn collect_sentences<T>(source: &mut impl SentenceSource<T>) -> Vec<Vec<T>> {
  let mut sentences = Vec::new();
  let mut current = Vec::new();
  while let Some((token, end)) = source.next_token() {
    current.push(token);
    if end {
      sentences.push(std::mem::take(&mut current));
    }
  }
  if !current.is_empty() {
    sentences.push(current);
  }
  sentences
}

/// Adapts pre-segmented sentences to the pull interface
pub struct SliceSource<'a, T> {
  sentences: &'a [Vec<T>],
  sentence: usize,
  position: usize,
}

impl<'a, T> SliceSource<'a, T> {
  pub fn new(sentences: &'a [Vec<T>]) -> Self {
    Self {
      sentences,
      sentence: 0,
      position: 0,
    }
  }
}

impl<'a, T> SentenceSource<T> for SliceSource<'a, T>
where
  T: Clone,
{
  fn next_token(&mut self) -> Option<(T, bool)> {
    // skip any empty sentences
    while self.sentence < self.sentences.len() && self.sentences[self.sentence].is_empty() {
      self.sentence += 1;
    }
    let words = self.sentences.get(self.sentence)?;

    let token = words[self.position].clone();
    let end = self.position + 1 == words.len();
    if end {
      self.sentence += 1;
      self.position = 0;
    } else {
      self.position += 1;
    }
    Some((token, end))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_slice_source_roundtrip() {
    let sentences = vec![
      vec!["the", "man", "walks"],
      vec!["mary"],
      vec!["the", "dog", "sleeps"],
    ];
    let mut source = SliceSource::new(&sentences);
    assert_eq!(collect_sentences(&mut source), sentences);

    // exhausted
    assert!(source.next_token().is_none());
  }

  #[test]
  fn test_empty_sentences_are_skipped() {
    let sentences = vec![vec![], vec!["a"], vec![]];
    let mut source = SliceSource::new(&sentences);
    assert_eq!(collect_sentences(&mut source), vec![vec!["a"]]);
  }

  #[test]
  fn test_unterminated_tail() {
    struct Tail {
      tokens: Vec<(&'static str, bool)>,
    }
    impl SentenceSource<&'static str> for Tail {
      fn next_token(&mut self) -> Option<(&'static str, bool)> {
        if self.tokens.is_empty() {
          None
        } else {
          Some(self.tokens.remove(0))
        }
      }
    }

    let mut source = Tail {
      tokens: vec![("a", true), ("b", false), ("c", false)],
    };
    assert_eq!(
      collect_sentences(&mut source),
      vec![vec!["a"], vec!["b", "c"]]
    );
  }
}
