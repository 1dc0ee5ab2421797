use clap::Parser;
use keyhole::btree::{BTree, DEFAULT_DEGREE};
use keyhole::logging::setup_logging;

/// Builds a tree locally and reports its shape.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Minimum degree `t`
    #[arg(short = 't', long, default_value_t = DEFAULT_DEGREE)]
    degree: usize,

    /// Keys to insert, in order. Defaults to 0..count.
    keys: Vec<i64>,

    /// How many sequential keys to insert when none are given
    #[arg(short, long, default_value_t = 20000)]
    count: i64,

    /// Print every node
    #[arg(short, long)]
    print: bool,

    /// Debug level, repeat for more (-d, -dd, -ddd)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let mut tree = BTree::with_degree(cli.degree)?;
    if cli.keys.is_empty() {
        tree.extend(0..cli.count);
    } else {
        tree.extend(cli.keys.iter().copied());
    }

    println!("degree: {}", tree.degree());
    println!("keys stored: {}", tree.len());
    println!("height: {}", tree.height());
    if cli.print {
        print!("{}", tree);
    }

    Ok(())
}
