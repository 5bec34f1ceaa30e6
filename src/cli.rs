use clap::{Args, Parser, Subcommand};
use image::{ImageBuffer, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqdist::distance::{
    DistanceMatrix, DistanceMatrixComputer, Strategy, VectorBatch, discrepancy,
};
use std::cmp::max;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "sqdist", about = "Pairwise squared Euclidean distance matrices")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, action, global = true, help = "Enable debug mode")]
    pub debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the distance matrix between the vectors of two files
    Compute(ComputeArgs),
    /// Check that every strategy agrees on random batches
    Compare(CompareArgs),
}

#[derive(Args)]
struct ComputeArgs {
    #[arg(help = "File with one vector per line (comma or whitespace separated)")]
    x: String,

    #[arg(help = "Second file [default: same as X]")]
    y: Option<String>,

    #[arg(
        long,
        short = 's',
        default_value = "expansion",
        help = "Strategy used to compute the matrix [direct,expansion,chunked]"
    )]
    strategy: Strategy,

    #[command(flatten)]
    chunking: ChunkArgs,

    #[arg(long, short, help = "Write the matrix as CSV to this file instead of stdout")]
    output: Option<String>,

    #[arg(long, help = "Render the matrix as a grayscale png")]
    heatmap: Option<String>,

    #[arg(long, action, help = "Print the index of the nearest Y vector for every X vector")]
    nearest: bool,

    #[arg(long, short = 'w', action, help = "Overwrite output if exists")]
    overwrite: bool,
}

#[derive(Args)]
struct CompareArgs {
    #[arg(long, short = 'n', default_value = "50", help = "Number of vectors per batch")]
    rows: usize,

    #[arg(long, short = 'm', default_value = "10", help = "Number of features per vector")]
    cols: usize,

    #[arg(long, default_value = "0", help = "Lower bound of generated values")]
    low: f64,

    #[arg(long, default_value = "10", help = "Upper bound (exclusive) of generated values")]
    high: f64,

    #[arg(long, help = "Seed for the generated batches [default: random]")]
    seed: Option<u64>,

    #[arg(
        long,
        default_value = "1e-6",
        help = "Maximum absolute discrepancy allowed against the direct strategy"
    )]
    tolerance: f64,

    #[command(flatten)]
    chunking: ChunkArgs,
}

#[derive(Args)]
struct ChunkArgs {
    #[arg(long, default_value = "256", help = "Rows per block for the chunked strategy")]
    chunk_rows: usize,

    #[arg(
        long,
        short = 't',
        default_value = default_concurrency(),
        help = "Maximum blocks computed at a time by the chunked strategy [0=auto]"
    )]
    threads: usize,
}

fn default_concurrency() -> String {
    let num = num_cpus::get();
    let default_concurrency = max(num, 1);
    default_concurrency.to_string()
}

impl ChunkArgs {
    fn computer(&self, strategy: Strategy) -> DistanceMatrixComputer {
        DistanceMatrixComputer {
            strategy,
            chunk_rows: self.chunk_rows,
            workers: self.threads,
        }
    }
}

impl Cli {
    pub fn new() -> Self {
        let mut cli = Self::parse();
        let chunking = match &mut cli.command {
            Command::Compute(args) => &mut args.chunking,
            Command::Compare(args) => &mut args.chunking,
        };
        if chunking.threads == 0 {
            chunking.threads = max(num_cpus::get(), 1);
        }
        cli
    }

    pub fn execute(self) -> Result<(), Box<dyn Error>> {
        match self.command {
            Command::Compute(args) => compute(args),
            Command::Compare(args) => compare(args),
        }
    }
}

fn compute(args: ComputeArgs) -> Result<(), Box<dyn Error>> {
    let x = read_batch(&args.x)?;
    let y = match &args.y {
        Some(path) => read_batch(path)?,
        None => x.clone(),
    };
    if !x.is_finite() || !y.is_finite() {
        warn!("Input contains non-finite values, they will propagate into the matrix");
    }
    info!(
        x = x.rows(),
        y = y.rows(),
        features = x.cols(),
        strategy = %args.strategy,
        "Computing distance matrix"
    );

    let start = Instant::now();
    let matrix = args.chunking.computer(args.strategy).compute(&x, &y)?;
    info!(
        ms = start.elapsed().as_millis(),
        dimension = format!("{}x{}", matrix.rows(), matrix.cols()),
        "Matrix computed"
    );

    if let Some(heatmap) = &args.heatmap {
        if should_write(heatmap, args.overwrite) {
            write_heatmap(&matrix, heatmap)?;
            info!(out = heatmap, "Heatmap written");
        }
    }

    match &args.output {
        Some(output) => {
            if should_write(output, args.overwrite) {
                let mut out = BufWriter::new(File::create(output)?);
                write_result(&mut out, &matrix, args.nearest)?;
                out.flush()?;
                info!(out = output, "Output written");
            }
        }
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            write_result(&mut out, &matrix, args.nearest)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn compare(args: CompareArgs) -> Result<(), Box<dyn Error>> {
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    let x = VectorBatch::random(args.rows, args.cols, args.low..args.high, &mut rng)?;
    let y = VectorBatch::random(args.rows, args.cols, args.low..args.high, &mut rng)?;
    info!(
        seed,
        rows = args.rows,
        cols = args.cols,
        tolerance = args.tolerance,
        "Comparing strategies"
    );

    let start = Instant::now();
    let reference = args.chunking.computer(Strategy::Direct).compute(&x, &y)?;
    info!(
        strategy = %Strategy::Direct,
        ms = start.elapsed().as_millis(),
        "Reference computed"
    );

    let mut failed = Vec::new();
    for strategy in [Strategy::Expansion, Strategy::Chunked] {
        let start = Instant::now();
        let matrix = args.chunking.computer(strategy).compute(&x, &y)?;
        let ms = start.elapsed().as_millis();
        let found = discrepancy(&reference, &matrix)?;
        info!(
            strategy = %strategy,
            ms,
            max_abs = found.max_abs,
            max_rel = found.max_rel,
            "Strategy compared"
        );
        if !found.within(args.tolerance) {
            failed.push(strategy.to_string());
        }
    }

    if !failed.is_empty() {
        return Err(format!(
            "strategies disagree with direct beyond {}: {}",
            args.tolerance,
            failed.join(", ")
        )
        .into());
    }
    Ok(())
}

/// Existing files are only replaced with `--overwrite`.
fn should_write(path: &str, overwrite: bool) -> bool {
    if let Ok(metadata) = fs::metadata(path) {
        info!(
            path = path,
            isDir = metadata.is_dir(),
            overwrite = overwrite,
            "File existed"
        );
        return overwrite && metadata.is_file();
    }
    true
}

fn read_batch(path: &str) -> Result<VectorBatch, Box<dyn Error>> {
    let text = fs::read_to_string(path).map_err(|err| format!("{path}: {err}"))?;
    let batch = parse_batch(&text, path)?;
    debug!(path = path, rows = batch.rows(), cols = batch.cols(), "Batch loaded");
    Ok(batch)
}

/// One vector per line. Values are separated by commas and/or whitespace;
/// blank lines and lines starting with `#` are skipped.
fn parse_batch(text: &str, source: &str) -> Result<VectorBatch, Box<dyn Error>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut row = Vec::new();
        for token in line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: f64 = token
                .parse()
                .map_err(|_| format!("{source}:{}: invalid number {token:?}", index + 1))?;
            row.push(value);
        }
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(format!(
                    "{source}:{}: expected {} values, found {}",
                    index + 1,
                    first.len(),
                    row.len()
                )
                .into());
            }
        }
        rows.push(row);
    }
    Ok(VectorBatch::from_rows(rows)?)
}

fn write_result<W: Write>(out: &mut W, matrix: &DistanceMatrix, nearest: bool) -> io::Result<()> {
    if nearest {
        for index in matrix.nearest() {
            match index {
                Some(j) => writeln!(out, "{j}")?,
                None => writeln!(out, "-")?,
            }
        }
        return Ok(());
    }

    for row in matrix.to_rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    Ok(())
}

/// Black is distance 0, white the largest distance. NaN entries are white.
fn write_heatmap(matrix: &DistanceMatrix, path: &str) -> Result<(), Box<dyn Error>> {
    if matrix.rows() == 0 || matrix.cols() == 0 {
        return Err(format!(
            "{path}: cannot render an empty {}x{} matrix",
            matrix.rows(),
            matrix.cols()
        )
        .into());
    }
    let width = u32::try_from(matrix.cols())?;
    let height = u32::try_from(matrix.rows())?;
    let peak = matrix.max_value().unwrap_or(0.0);

    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let v = matrix.get(y as usize, x as usize).unwrap_or(f64::NAN);
        Luma([shade(v, peak)])
    });
    img.save(Path::new(path))?;
    Ok(())
}

fn shade(v: f64, peak: f64) -> u8 {
    if v.is_nan() {
        return u8::MAX;
    }
    if !(peak > 0.0) || !peak.is_finite() {
        return if v > 0.0 { u8::MAX } else { 0 };
    }
    (v / peak * 255.0).round().clamp(0.0, 255.0) as u8
}
