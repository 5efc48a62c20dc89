use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bow",
    about = "Inspect Parquet files and convert them to and from delimited text",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs (RUST_LOG overrides the level)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress all logs
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print Parquet file metadata
    Info(InfoArgs),

    /// Print a Parquet file as delimited text
    #[command(alias = "par2txt")]
    Cat(CatArgs),

    /// Convert delimited text to a Parquet file
    Txt2par(Txt2parArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Parquet file, or `-` for standard input
    pub path: PathBuf,

    /// Print the table schema instead of the file metadata
    #[arg(short = 's', long)]
    pub schema: bool,
}

#[derive(Args)]
pub struct CatArgs {
    /// Parquet file, or `-` for standard input
    pub path: PathBuf,

    /// Output field separator
    #[arg(short = 's', long, default_value = "\t")]
    pub sep: String,

    /// Include a column name header in the output
    #[arg(short = 'H', long)]
    pub header: bool,

    /// Include the index in the output
    #[arg(short = 'i', long)]
    pub index: bool,

    /// Only print these columns (comma separated)
    #[arg(short = 'c', long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,
}

#[derive(Args)]
pub struct Txt2parArgs {
    /// Delimited text file, or `-` for standard input
    pub path: PathBuf,

    /// Parquet file to write
    pub outpath: PathBuf,

    /// Input bytes parsed per batch
    #[arg(long = "input-chunksize", visible_alias = "ic", default_value_t = 4096)]
    pub input_chunksize: usize,

    /// Rows per output row group
    #[arg(long = "output-chunksize", visible_alias = "oc", default_value_t = 1_000_000)]
    pub output_chunksize: usize,

    /// Input field separator
    #[arg(short = 's', long, default_value = "\t")]
    pub sep: String,

    /// The input starts with a header line
    #[arg(short = 'H', long)]
    pub header: bool,

    /// Store the first input column as the index
    #[arg(short = 'i', long)]
    pub index: bool,

    /// Column types as a JSON object, e.g. '{"id": "int32"}'
    #[arg(short = 'k', long)]
    pub schema: Option<String>,

    /// Compression codec for every column
    #[arg(long, default_value = "snappy")]
    pub compression: String,
}
