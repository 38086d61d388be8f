// Wed Jan 15 2026 - Alex

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "idb-typelib")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Create or validate struct types in a type database from a schema", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// JSON config file; flags given on the command line win
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create missing structs and repair mismatching ones
    Sync(SyncArgs),
    /// Report how the database differs from the schema without changing it
    Check(CheckArgs),
    /// List the structs stored in the database
    Show(ShowArgs),
    /// Print the C declaration of each schema struct
    Declare(DeclareArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    #[arg(long)]
    pub pointer_size: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct SyncArgs {
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Only sync these structs
    #[arg(long = "only")]
    pub only: Vec<String>,

    /// Overwrite mismatching structs without asking
    #[arg(short, long, conflicts_with = "no")]
    pub yes: bool,

    /// Never overwrite mismatching structs
    #[arg(short, long)]
    pub no: bool,
}

#[derive(ClapArgs, Debug)]
pub struct CheckArgs {
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    #[command(flatten)]
    pub db: DatabaseArgs,

    #[arg(long = "only")]
    pub only: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Only show this struct
    pub name: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct DeclareArgs {
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    #[command(flatten)]
    pub db: DatabaseArgs,

    pub name: Option<String>,
}

impl SyncArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.only.iter().any(|n| n.trim().is_empty()) {
            return Err("--only needs a struct name".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() {
        let args = Args::parse_from([
            "idb-typelib", "-vv", "sync", "-s", "schema.json", "-d", "db.json", "--only", "Header", "--yes",
        ]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Sync(sync) => {
                assert_eq!(sync.schema, Some(PathBuf::from("schema.json")));
                assert_eq!(sync.db.database, Some(PathBuf::from("db.json")));
                assert_eq!(sync.only, vec!["Header".to_string()]);
                assert!(sync.yes);
                assert!(!sync.no);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_yes_and_no_conflict() {
        assert!(Args::try_parse_from(["idb-typelib", "sync", "--yes", "--no"]).is_err());
    }
}
