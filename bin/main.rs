mod search;

use clap::Parser;
use search::{DistanceArgs, SearchArgs};

#[derive(clap::Parser)]
#[command(author, version, about)]
enum Args {
    /// Search a CDR3 database and write matching records to a CSV file.
    ///
    /// Give either --cdr3-aa for a generic search, or --cdr3-aa-heavy and/or
    /// --cdr3-aa-light for a chain-specific or paired search.
    Search(SearchArgs),
    /// Print the distance between two CDR3 sequences.
    Distance(DistanceArgs),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::init();

    match args {
        Args::Search(search_args) => search_args.run(),
        Args::Distance(distance_args) => distance_args.run(),
    }
}
