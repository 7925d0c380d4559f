use charmatrix::distances::{pairwise_mismatch_matrix, pairwise_p_distance_matrix};
use charmatrix::io::{read_matrix, read_newick_namespace, write_fasta, write_matrix_tsv, MatrixFormat};
use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use std::time::Instant;

/// Read a FASTA or NEXUS character matrix, optionally check its taxa against
/// a tree, and write pairwise sequence distances as a labeled TSV matrix.
#[derive(Parser, Debug)]
#[command(name = "charmatrix", version, about = "Taxon-indexed character matrix tool")]
struct Args {
    /// Path to the character matrix (FASTA or NEXUS, optionally .gz)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Input format; guessed from the file extension when omitted
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<FormatArg>,

    /// Newick tree whose leaves define the allowed taxa
    #[arg(short = 't', long = "taxa-tree")]
    taxa_tree: Option<PathBuf>,

    /// Output path for TSV distance matrix ('-' for stdout, .gz to compress)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Distance to compute: p | mismatches
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::P)]
    metric: MetricArg,

    /// Re-export the matrix as FASTA
    #[arg(long = "fasta-out")]
    fasta_out: Option<PathBuf>,

    /// Wrap FASTA output lines at this many states (0 = no wrapping)
    #[arg(long = "line-width", default_value_t = 60)]
    line_width: usize,

    /// Make output more verbose (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode: only errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg { Fasta, Nexus }

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg { P, Mismatches }

impl From<FormatArg> for MatrixFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Fasta => MatrixFormat::Fasta,
            FormatArg::Nexus => MatrixFormat::Nexus,
        }
    }
}

/// Progress and the run summary are shown by default; `-q` keeps only errors.
fn log_level(quiet: bool, verbose: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn setup_logger(args: &Args) {
    let level = log_level(args.quiet, args.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}

fn main() {
    let args = Args::parse();
    setup_logger(&args);

    let Some(format) = args.format.map(MatrixFormat::from).or_else(|| MatrixFormat::from_path(&args.input)) else {
        error!("Cannot guess the format of {:?}; pass --format", args.input);
        std::process::exit(2);
    };

    let taxon_namespace = match &args.taxa_tree {
        Some(path) => match read_newick_namespace(path) {
            Ok(ns) => {
                info!("Read {} taxa from {:?}", ns.len(), path);
                Some(ns)
            }
            Err(e) => {
                error!("Failed to read taxa tree {:?}: {e}", path);
                std::process::exit(2);
            }
        },
        None => None,
    };

    let t0 = Instant::now();
    let matrix = match read_matrix(&args.input, format, taxon_namespace.as_ref()) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to read matrix {:?}: {e}", args.input);
            std::process::exit(3);
        }
    };
    info!("Reading matrix {:.3}s", t0.elapsed().as_secs_f64());
    info!(
        "{} sequences, {} taxa in namespace, max length {}, aligned: {}",
        matrix.len(),
        matrix.taxon_namespace().len(),
        matrix.max_sequence_len(),
        matrix.is_aligned()
    );

    if let Some(path) = &args.fasta_out {
        if let Err(e) = write_fasta(path, &matrix, args.line_width) {
            error!("Failed to write FASTA {:?}: {e}", path);
            std::process::exit(4);
        }
    }

    let Some(output) = &args.output else {
        return;
    };

    let t1 = Instant::now();
    let written = match args.metric {
        MetricArg::P => pairwise_p_distance_matrix(&matrix)
            .and_then(|(names, mat)| write_matrix_tsv(output, &names, &mat)),
        MetricArg::Mismatches => pairwise_mismatch_matrix(&matrix)
            .and_then(|(names, mat)| write_matrix_tsv(output, &names, &mat)),
    };
    if let Err(e) = written {
        error!("Failed to compute or write distances to {:?}: {e}", output);
        std::process::exit(4);
    }
    info!("Determining distances using {:?} {:.3}s", args.metric, t1.elapsed().as_secs_f64());
}
