use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use momo_ledger::{
    compare_lookups, ingest_xml, load_store, pad_store, AppConfig, Extractor, TransactionStore,
};

#[derive(Parser)]
#[command(name = "momo-ledger", version = momo_ledger::VERSION)]
#[command(about = "Mobile-money SMS → transaction ledger", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an SMS export and write a JSON snapshot
    Import {
        /// SMS export (overrides data.xml_path)
        xml: Option<PathBuf>,

        /// Snapshot destination
        #[arg(short, long, default_value = "transactions.json")]
        out: PathBuf,
    },
    /// Export the loaded store
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print totals and per-type counts
    Stats,
    /// Compare linear scan vs index lookup
    Compare {
        /// Number of ids to time
        #[arg(long, default_value_t = 20)]
        sample: usize,

        /// Calls per id
        #[arg(long, default_value_t = 500)]
        repeats: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::load(cli.config.as_deref())?;
    let extractor = Extractor::new(&config.extractor)?;

    match cli.command {
        Commands::Import { xml, out } => {
            let xml = xml.unwrap_or_else(|| config.data.xml_path.clone());
            run_import(&xml, &out, &extractor)?;
        }
        Commands::Export { format, out } => {
            let store = load_store(&config.data, &extractor)?;
            match format {
                ExportFormat::Json => store.export_json(&out)?,
                ExportFormat::Csv => store.export_csv(&out)?,
            }
            println!("✓ Exported {} transactions to {}", store.len(), out.display());
        }
        Commands::Stats => {
            let store = load_store(&config.data, &extractor)?;
            print_stats(&store);
        }
        Commands::Compare { sample, repeats } => {
            let mut store = load_store(&config.data, &extractor)?;
            run_compare(&mut store, sample, repeats)?;
        }
    }

    Ok(())
}

fn run_import(xml: &Path, out: &Path, extractor: &Extractor) -> Result<()> {
    println!("📩 Import: SMS export → transactions");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Parsing {}...", xml.display());
    let inputs = ingest_xml(xml, extractor)?;
    println!("✓ Extracted {} financial messages", inputs.len());

    let mut store = TransactionStore::new();
    let count = store.bulk_load(inputs)?;

    println!("\n💾 Writing snapshot...");
    store.export_json(out)?;
    println!("✓ {} transactions → {}", count, out.display());

    let undetermined = store.stats().undetermined_amounts;
    if undetermined > 0 {
        println!("⚠️  {} transactions without a parseable amount", undetermined);
    }

    Ok(())
}

fn print_stats(store: &TransactionStore) {
    let stats = store.stats();

    println!("📊 Transaction Statistics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  total:          {}", stats.total);
    println!("  total amount:   {:.2} RWF", stats.total_amount);
    println!("  average amount: {:.2} RWF", stats.avg_amount);
    println!("  no amount:      {}", stats.undetermined_amounts);
    println!("\n  by type:");
    for (kind, count) in &stats.by_type {
        println!("    {:<12} {}", kind, count);
    }
}

fn run_compare(store: &mut TransactionStore, sample: usize, repeats: u32) -> Result<()> {
    let padded = pad_store(store, sample)?;
    if padded > 0 {
        println!("ℹ️  Added {} placeholder records to reach {} ids", padded, sample);
    }

    let report = compare_lookups(store, sample, repeats);

    println!("⏱️  Lookup comparison ({} records, {} calls per id)", report.store_size, report.repeats);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for timing in &report.timings {
        println!(
            "  id {:<8} linear {:>10.3?}  indexed {:>10.3?}  {:>8.2}x",
            timing.id,
            timing.linear_scan,
            timing.indexed_lookup,
            timing.speedup()
        );
    }
    println!("\n  mean linear scan:    {:?}", report.mean_linear());
    println!("  mean indexed lookup: {:?}", report.mean_indexed());
    println!("  speedup:             {:.2}x", report.speedup());

    if !report.all_agreed() {
        println!("❌ Lookup paths disagreed on at least one id");
    }

    Ok(())
}
