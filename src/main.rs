use treedop::{parse_trees, Err, GoodmanDop};

const CORPUS: &str = r"
    // tiny treebank fragment
    (S (NP (D the) (N man)) (VP (V walks)))
    (S (NP (D the) (N dog)) (VP (V sleeps)))
    (S (NP (D a) (N dog)) (VP (V walks)))
    (S (NP (D the) (N man)) (VP (V sleeps)))
";

fn main() -> Result<(), Err> {
    let mut dop: GoodmanDop<String> = GoodmanDop::new();
    for tree in parse_trees(CORPUS)? {
        dop.add_tree(&tree)?;
    }

    let sentence = "a man walks";
    let words = sentence.split(' ').map(|w| w.to_string()).collect::<Vec<_>>();

    let result = dop.parse(&words)?;
    let parses = result.parses();

    println!("Parsed {} tree{}", parses.len(), if parses.len() == 1 { "" } else { "s" });
    for (tree, p) in parses {
        println!("{}  [p={}]", tree, p);
    }

    Ok(())
}
