
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use format_num::format_num;

use tage_predictor::*;
use tage_predictor::stats::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// ~1MB, 14 tagged components
    Large,
    /// ~32KB, 4 tagged components
    Small,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate a TAGE predictor", long_about = None)]
struct Args {
    /// Binary trace file (24-byte records)
    trace: Option<PathBuf>,

    /// Built-in predictor configuration
    #[arg(short, long, value_enum, default_value = "large")]
    preset: Preset,

    /// Load the predictor configuration from a JSON file instead
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Generate this many synthetic records instead of reading a trace
    #[arg(short, long, conflicts_with = "trace")]
    synthetic: Option<usize>,

    /// Number of branch sites in the synthetic program
    #[arg(long, default_value_t = 256)]
    sites: usize,

    /// Seed for the synthetic program
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Write the synthetic records to a trace file
    #[arg(long, requires = "synthetic")]
    emit: Option<PathBuf>,

    /// Only simulate the first N records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn load_trace(args: &Args) -> Result<BinaryTrace> {
    if let Some(n) = args.synthetic {
        let records = SyntheticTrace::random(args.seed, args.sites).generate(n);
        let trace = BinaryTrace::new(records,
            format!("synthetic-{}-{}", args.sites, args.seed));
        if let Some(path) = &args.emit {
            trace.write_file(path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("[*] Wrote {} records to {}", trace.num_entries(),
                path.display());
        }
        return Ok(trace);
    }
    match &args.trace {
        Some(path) => BinaryTrace::from_file(path)
            .with_context(|| format!("reading {}", path.display())),
        None => bail!("expected a trace file or --synthetic <n>"),
    }
}

fn print_config(tage: &TagePredictor) {
    let cfg = &tage.cfg;
    println!("[*] TAGE configuration:");
    println!("      Entries (in total): {}",
        format_num!(",.0", cfg.total_entries() as f64));
    println!("        {} entries (base component)", cfg.base.size());
    for comp in tage.comp.iter() {
        println!("        {} entries (tagged component {}, {} history bits, {}-bit tags)",
            comp.cfg.size(), comp.id, comp.cfg.history_len, comp.cfg.tag_bits,
        );
    }
    let storage_bits = cfg.storage_bits();
    let storage_kib = storage_bits as f64 / 1024.0 / 8.0;
    println!("      Storage bits: {}b, {:.2}KiB",
        format_num!(",.0", storage_bits as f64), storage_kib
    );
    println!("      Global history register length: {} bits", cfg.history_bits);
    println!("      Useful counters aged every {} updates",
        format_num!(",.0", (1u64 << cfg.aging_period_log2) as f64));
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => TageConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => match args.preset {
            Preset::Large => TageConfig::large(),
            Preset::Small => TageConfig::small(),
        },
    };
    if args.dump_config {
        println!("{}", cfg.to_json()?);
        return Ok(());
    }
    let mut tage = cfg.build()?;
    print_config(&tage);

    let trace = load_trace(&args)?;
    let records = match args.limit {
        Some(limit) => trace.as_slice_trunc(limit),
        None => trace.as_slice(),
    };
    println!("[*] Loaded {} records from {}",
        format_num!(",.0", records.len() as f64), trace.name());

    let mut stats = BranchStats::new();
    let start = Instant::now();
    for record in records {
        let prediction = tage.try_predict(record.pc, record.is_conditional())?;
        if record.is_conditional() {
            stats.update(record, prediction.outcome);
        }
        tage.try_update(prediction, record.outcome, record.tgt)?;
    }
    let done = start.elapsed();
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    println!("[*] Global statistics:");
    println!("      Unique branches: {}", stats.num_unique_branches());
    println!("        {} always taken, {} never taken",
        stats.num_always_taken(), stats.num_never_taken());
    println!("      Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stats.global_hits, stats.global_brns, stats.hit_rate() * 100.0,
        stats.global_miss()
    );
    println!("      Average MPKB:    {:.3} miss/kbrn", stats.avg_mpkb());
    if let Some((best, worst)) = stats.mpkb_range() {
        println!("        {} windows, best {} misses, worst {} misses",
            stats.mpkb.len(), best, worst);
    }
    println!();

    let s = &tage.stat;
    println!("[*] Per-component statistics:");
    println!("      Base component:");
    println!("        {} misses, {} hits", s.base_miss, s.base_hits);
    for (idx, comp) in tage.comp.iter().enumerate() {
        println!("      Component[{:2}] (history length {:4}):",
            idx, comp.cfg.history_len,
        );
        println!("        {} misses, {} hits", s.comp_miss[idx], s.comp_hits[idx]);
        println!("        {} useful entries", comp.num_useful_entries());
    }
    println!("      Alternate used:      {}", s.alt_used);
    println!("      Allocations:         {} ({} forced, {} failed)",
        s.alcs, s.forced_alcs, s.failed_alcs);
    println!("      Aging passes:        {}", s.agings);
    println!();

    println!("[*] Low hit-rate branches:");
    for (pc, data) in stats.get_low_rate_branches(8, 100, 0.55) {
        println!("      {:016x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }
    Ok(())
}
