//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "barcraft")]
#[command(about = "AI bar manager: cocktail menu ideas grounded in a reference library")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS for all origins
        #[arg(long)]
        cors: bool,
    },
    /// Build the knowledge index from PDF or plain-text documents
    Ingest {
        /// Source documents (`.pdf` files are text-extracted)
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Index file to write (default: knowledge.index_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a similarity search against the knowledge index
    Retrieve {
        /// Query text
        query: String,
        /// Number of chunks to return (default: knowledge.top_k)
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show current configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["barcraft", "-v", "serve", "--port", "8080", "--cors"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { host, port, cors } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
                assert!(cors);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_ingest_requires_sources() {
        assert!(Cli::try_parse_from(["barcraft", "ingest"]).is_err());
        let cli = Cli::try_parse_from(["barcraft", "ingest", "codex.txt", "-o", "idx.json"]).unwrap();
        match cli.command {
            Commands::Ingest { sources, output } => {
                assert_eq!(sources, vec![PathBuf::from("codex.txt")]);
                assert_eq!(output, Some(PathBuf::from("idx.json")));
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_parse_retrieve() {
        let cli = Cli::try_parse_from(["barcraft", "retrieve", "sour ratio", "-k", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Retrieve { k: Some(5), .. }));
    }
}
