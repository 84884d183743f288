use std::env;
use std::fs;
use std::io;
use std::io::Write;
use std::process;

use treedop::{parse_chart, parse_trees, BinTok, Err, GoodmanDop};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} TREEBANK [options]

Trains a DOP model on a file of bracketed trees, then parses stdin.

Options:
  -h, --help          Print this message
  -c, --chart         Print the parse chart (defaults to not printing)
  -d, --derivations   Print individual derivations, not just parses
  -g, --grammar       Print the reduced grammar after training
  -b, --beam N        Prune each span length to its N best nodes",
    prog_name
  )
}

fn parse(
  dop: &GoodmanDop<String>,
  sentence: &str,
  print_chart: bool,
  print_derivations: bool,
) -> Result<(), Err> {
  let words = sentence.split(' ').map(|w| w.to_string()).collect::<Vec<_>>();

  if print_chart {
    let toks = words.iter().map(|w| BinTok::Regular(w.clone())).collect::<Vec<_>>();
    let chart = parse_chart(dop.grammar(), &toks, dop.beam);
    println!("chart:\n{}\n", chart);
  }

  let result = dop.parse(&words)?;
  let parses = result.parses();

  println!(
    "Parsed {} tree{}",
    parses.len(),
    if parses.len() == 1 { "" } else { "s" }
  );

  for (t, p) in parses {
    println!("{}  [p={}]", t, p);
  }

  if print_derivations {
    println!();
    for (d, p) in result.derivations() {
      println!("{}  [p={}]", d, p);
    }
  }

  Ok(())
}

struct Args {
  filename: String,
  print_chart: bool,
  print_derivations: bool,
  print_grammar: bool,
  beam: Option<usize>,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    if v.is_empty() {
      return Err(Self::make_error_message("bad argument vector", "treedop"));
    }

    let args_len = v.len();
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap();

    if args_len < 2 {
      return Err(Self::make_error_message("not enough arguments", prog_name));
    }

    let mut filename: Option<String> = None;
    let mut print_chart = false;
    let mut print_derivations = false;
    let mut print_grammar = false;
    let mut beam: Option<usize> = None;
    let mut expect_beam = false;

    for o in iter {
      if expect_beam {
        match o.parse::<usize>() {
          Ok(b) => beam = Some(b),
          Err(_) => return Err(Self::make_error_message("bad beam width", prog_name)),
        }
        expect_beam = false;
      } else if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-d" || o == "--derivations" {
        print_derivations = true;
      } else if o == "-g" || o == "--grammar" {
        print_grammar = true;
      } else if o == "-b" || o == "--beam" {
        expect_beam = true;
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if expect_beam {
      return Err(Self::make_error_message("missing beam width", prog_name));
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        print_chart,
        print_derivations,
        print_grammar,
        beam,
      })
    } else {
      Err(Self::make_error_message("missing filename", prog_name))
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let corpus = parse_trees(&fs::read_to_string(&opts.filename)?)?;
  let mut dop: GoodmanDop<String> = GoodmanDop::new();
  dop.add_corpus(&corpus)?;
  dop.beam = opts.beam;

  if opts.print_grammar {
    println!("{}", dop.grammar());
  }

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        input.make_ascii_lowercase();
        parse(&dop, input.trim(), opts.print_chart, opts.print_derivations)?;
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
