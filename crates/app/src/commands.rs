use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use netzero_core::ReconcileConfig;
use netzero_import::export::write_all;
use netzero_import::import::import_files;
use netzero_import::{CsvImportProfile, ReconciliationReport, ReportMeta};
use netzero_reconcile::{reconcile as run_engine, Resolution};
use rust_decimal::Decimal;

#[derive(Debug, clap::Args)]
pub struct ReconcileArgs {
    /// Input CSV files, concatenated in the given order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Reconciliation config (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// CSV import profile (TOML): column names, delimiter, banner rows
    #[arg(long, short = 'p')]
    pub profile: Option<PathBuf>,

    /// Field delimiter, overrides the profile
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Rows above the header to skip, overrides the profile
    #[arg(long)]
    pub header_row: Option<usize>,

    /// Values use a decimal comma (1.234,56)
    #[arg(long)]
    pub decimal_comma: bool,

    /// Directory for unresolved_imbalances.csv, partial_matches.csv and report.json
    #[arg(long, short = 'o')]
    pub out_dir: Option<PathBuf>,

    /// Print the JSON report to stdout instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Largest |sum of values| at which a group counts as balanced
    #[arg(long)]
    pub balance_tolerance: Option<Decimal>,

    /// Description similarity (0 to 1) a leg must exceed to join a cluster
    #[arg(long)]
    pub similarity_threshold: Option<f64>,

    /// Largest credit/debit gap accepted inside a similarity cluster
    #[arg(long)]
    pub cluster_tolerance: Option<Decimal>,

    /// Largest deviation between a combination and the opposite side's total
    #[arg(long)]
    pub match_tolerance: Option<Decimal>,

    /// Fewest legs in a searched combination
    #[arg(long)]
    pub min_combination: Option<usize>,

    /// Most legs in a searched combination
    #[arg(long)]
    pub max_combination: Option<usize>,

    /// Worker threads for per-group resolution
    #[arg(long, env = "NETZERO_WORKERS")]
    pub workers: Option<usize>,

    /// Leave groups explained by a partial match out of the unresolved set
    #[arg(long)]
    pub exclude_resolved: bool,

    /// Report each leg at most once across similarity clusters
    #[arg(long)]
    pub dedup_clusters: bool,
}

impl ReconcileArgs {
    fn apply_overrides(&self, config: &mut ReconcileConfig) {
        if let Some(v) = self.balance_tolerance {
            config.balance_tolerance = v;
        }
        if let Some(v) = self.similarity_threshold {
            config.similarity_threshold = v;
        }
        if let Some(v) = self.cluster_tolerance {
            config.cluster_tolerance = v;
        }
        if let Some(v) = self.match_tolerance {
            config.match_tolerance = v;
        }
        if let Some(v) = self.min_combination {
            config.min_combination_size = v;
        }
        if let Some(v) = self.max_combination {
            config.max_combination_size = v;
        }
        if let Some(v) = self.workers {
            config.worker_threads = v;
        }
        config.exclude_resolved_groups |= self.exclude_resolved;
        config.deduplicate_cluster_legs |= self.dedup_clusters;
    }

    fn import_profile(&self) -> Result<CsvImportProfile> {
        let mut profile = match &self.profile {
            Some(path) => {
                let text = read(path)?;
                toml::from_str(&text)
                    .with_context(|| format!("invalid import profile {}", path.display()))?
            }
            None => CsvImportProfile::default(),
        };
        if let Some(d) = &self.delimiter {
            profile.delimiter = d.clone();
        }
        if let Some(n) = self.header_row {
            profile.header_row_offset = n;
        }
        profile.decimal_comma |= self.decimal_comma;
        Ok(profile)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn load_config(path: &Path) -> Result<ReconcileConfig> {
    ReconcileConfig::from_toml(&read(path)?)
        .with_context(|| format!("invalid config {}", path.display()))
}

pub fn reconcile(args: ReconcileArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReconcileConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let profile = args.import_profile()?;
    let loaded = import_files(&args.inputs, &profile).context("failed to import legs")?;
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let result = run_engine(loaded.legs, &config)?;
    for outcome in &result.outcomes {
        tracing::info!(
            group = %outcome.external_id,
            credit = %outcome.credit_total,
            debit = %outcome.debit_total,
            resolution = ?outcome.resolution,
            "imbalanced transaction"
        );
    }

    let inputs = args.inputs.iter().map(|p| p.display().to_string()).collect();
    let report = ReconciliationReport {
        meta: ReportMeta::new(inputs, &config),
        result,
    };

    if let Some(dir) = &args.out_dir {
        write_all(dir, &report).with_context(|| format!("failed to write results to {}", dir.display()))?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        print_summary(&mut out, &report)?;
    }
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, report: &ReconciliationReport) -> Result<()> {
    let s = &report.result.summary;
    writeln!(out, "legs:                 {}", s.total_legs)?;
    writeln!(out, "groups:               {} ({} balanced)", s.total_groups, s.balanced_groups)?;
    writeln!(out, "imbalanced groups:    {}", s.imbalanced_groups)?;
    writeln!(out, "  by similarity:      {}", s.resolved_by_similarity)?;
    writeln!(out, "  by combination:     {}", s.resolved_by_combination)?;
    writeln!(out, "  unresolved:         {}", s.unresolved_groups)?;
    if s.warnings > 0 {
        writeln!(out, "warnings:             {}", s.warnings)?;
    }

    for outcome in &report.result.outcomes {
        let status = match &outcome.resolution {
            Resolution::SimilarityClusters { count } => format!("{count} similarity cluster(s)"),
            Resolution::Combinations { count } => format!("{count} combination(s)"),
            Resolution::Unresolved => "unresolved".to_string(),
            Resolution::BudgetExhausted => "unresolved (search budget exhausted)".to_string(),
        };
        writeln!(
            out,
            "{} | credit {} | debit {} | {}",
            outcome.external_id, outcome.credit_total, outcome.debit_total, status
        )?;
    }

    if report.result.partial_matches.is_empty() {
        writeln!(out, "No partial match found within the configured tolerance.")?;
    }
    Ok(())
}

pub fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config).context("cannot render config")?;
    println!("{} is valid\n\n{rendered}", path.display());
    Ok(())
}
