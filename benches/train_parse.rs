use criterion::{black_box, criterion_group, criterion_main, Criterion};

use treedop::{parse_trees, FastUdop, GoodmanDop, Tree};

const CORPUS: &str = r"
    (S (NP (D the) (N man)) (VP (V walks)))
    (S (NP (D the) (N dog)) (VP (V sleeps)))
    (S (NP (D a) (N dog)) (VP (V walks)))
    (S (NP (D a) (N man)) (VP (V sleeps)))
    (S (NP (D the) (N man)) (VP (V sees) (NP (D a) (N dog))))
    (S (NP (D the) (N dog)) (VP (V sees) (NP (D the) (N man))))
";

fn train(corpus: &[Tree<String>]) -> GoodmanDop<String> {
  let mut dop = GoodmanDop::new();
  dop.add_corpus(corpus).unwrap();
  dop
}

fn parse(dop: &GoodmanDop<String>, input: &[String]) -> usize {
  dop.parse(input).unwrap().parses().len()
}

fn criterion_benchmark(c: &mut Criterion) {
  let corpus = parse_trees(CORPUS).unwrap();
  let dop = train(&corpus);

  let simple_input: Vec<String> = "the man walks".split(' ').map(String::from).collect();
  let complex_input: Vec<String> = "the dog sees a man".split(' ').map(String::from).collect();

  c.bench_function("train corpus", |b| b.iter(|| train(black_box(&corpus))));

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(black_box(&dop), black_box(&simple_input)))
  });

  c.bench_function("parse transitive", |b| {
    b.iter(|| parse(black_box(&dop), black_box(&complex_input)))
  });

  c.bench_function("train udop length 5", |b| {
    b.iter(|| {
      let mut udop = FastUdop::new("X".to_string(), 4);
      udop.add_sentence(black_box(&complex_input)).unwrap();
      udop.dop.grammar().len()
    })
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
