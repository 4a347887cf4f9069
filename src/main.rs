//! HeapDB demo - runs the Etudiants scenario against a database directory

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use log::error;

use heapdb::buffer::ReplacementPolicy;
use heapdb::catalog::Database;
use heapdb::common::DbConfig;
use heapdb::execution::{CompareOp, Condition, Projection};
use heapdb::tuple::{DataType, Record, Schema, Value};
use heapdb::Result;

const TABLE: &str = "Etudiants";

/// HeapDB - A page-based relational storage engine
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (`key = value` lines)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the configuration file
    #[arg(short = 'D', long)]
    data_dir: Option<PathBuf>,

    /// Buffer replacement policy (LRU or MRU)
    #[arg(short, long)]
    policy: Option<ReplacementPolicy>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DbConfig::load(path)?,
        None => DbConfig::new("./heapdb_data"),
    };
    if let Some(dir) = args.data_dir {
        config.db_path = dir;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }

    let mut db = Database::open(config)?;
    println!("Data directory: {}", db.config().db_path.display());

    if db.table_exists(TABLE) {
        db.drop_table(TABLE)?;
    }
    let schema = Schema::builder()
        .column("id", DataType::Int)
        .column("nom", DataType::Char(10))
        .column("age", DataType::Int)
        .build();
    db.create_table(TABLE, schema)?;
    println!("Created {}", db.describe_table(TABLE)?);

    for (id, nom, age) in [(1, "Alice", 22), (2, "Bob", 23), (3, "Charlie", 24)] {
        let record = Record::new(vec![Value::Int(id), Value::from(nom), Value::Int(age)]);
        let rid = db.insert(TABLE, &record)?;
        println!("Inserted {} at {:?}", record, rid);
    }

    print_records("All records", &db.select(TABLE, vec![], Projection::All)?);

    let deleted = db.delete_where(TABLE, &[Condition::column_literal(0, CompareOp::Eq, 2)])?;
    println!("\nDeleted {} record(s) with id = 2", deleted);
    print_records("Remaining records", &db.select(TABLE, vec![], Projection::All)?);

    let names = db.select(
        TABLE,
        vec![Condition::column_literal(2, CompareOp::Ge, 23)],
        Projection::Columns(vec![1]),
    )?;
    print_records("Names with age >= 23", &names);

    db.finish()?;
    println!("\nState saved.");
    Ok(())
}

fn print_records(title: &str, records: &[Record]) {
    println!("\n{}:", title);
    for record in records {
        println!("  {}", record);
    }
    println!("  ({} records)", records.len());
}
