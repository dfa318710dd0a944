//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::classification_adapter::StaticClassifier;
use crate::adapters::csv_adapter::{CsvAdapter, read_proposals};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocation::Allocation;
use crate::domain::audit::{AuditReport, audit};
use crate::domain::config_validation::{Settings, load_settings};
use crate::domain::correlation::{self, CorrelationResult, returns_from_bars};
use crate::domain::enforcer::{Candidate, enforce};
use crate::domain::error::RiskfuseError;
use crate::domain::policy::{RiskPolicy, RiskProfile};
use crate::domain::scoring::{CompositeScore, score};
use crate::domain::screening::{ScreeningOutcome, ScreeningSummary, screen};
use crate::domain::snapshot::{self, IndicatorSnapshot};
use crate::domain::universe::{self, Universe, load_universe, parse_codes};
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "riskfuse",
    about = "Indicator scoring and risk-policy enforcement for allocation proposals"
)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in risk profiles
    Profiles {
        #[arg(long)]
        json: bool,
    },
    /// Load and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Compute indicator snapshots and composite scores
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated codes; every CSV in the data directory when omitted
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run the pre-screening filter over a universe
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated codes; every CSV in the data directory when omitted
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Enforce the risk policy over an allocation proposal and audit the result
    Allocate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated codes; every CSV in the data directory when omitted
        #[arg(long)]
        codes: Option<String>,
        #[arg(short, long)]
        proposal: PathBuf,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Profiles { json } => run_profiles(json),
        Command::Validate { config, profile } => run_validate(&config, profile.as_deref()),
        Command::Score {
            config,
            data,
            codes,
            json,
        } => run_score(&config, &data, codes.as_deref(), json),
        Command::Screen {
            config,
            data,
            codes,
            json,
        } => run_screen(&config, &data, codes.as_deref(), json),
        Command::Allocate {
            config,
            data,
            codes,
            proposal,
            profile,
            json,
        } => run_allocate(
            &config,
            &data,
            codes.as_deref(),
            &proposal,
            profile.as_deref(),
            json,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), RiskfuseError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{}", text);
    Ok(())
}

struct Context {
    settings: Settings,
    universe: Universe,
}

fn load_context(
    config_path: &Path,
    data_path: &Path,
    codes: Option<&str>,
    profile: Option<&str>,
) -> Result<Context, RiskfuseError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let settings = load_settings(&config, profile)?;
    let classifier = StaticClassifier::from_config(&config)?;
    let data = CsvAdapter::new(data_path.to_path_buf());
    let codes = match codes {
        Some(list) => parse_codes(list)?,
        None => data.list_symbols()?,
    };
    let universe = load_universe(&data, &classifier, &codes, universe::MIN_BARS)?;
    Ok(Context { settings, universe })
}

/// Snapshot and score every instrument in the universe.
pub fn build_candidates(universe: &Universe, settings: &Settings) -> BTreeMap<String, Candidate> {
    universe
        .instruments
        .iter()
        .map(|inst| {
            let snap = snapshot::compute(&inst.code, &inst.bars, &settings.snapshot);
            let composite = score(&snap, &inst.fundamentals, inst.classification.class);
            tracing::debug!(
                code = %inst.code,
                total = composite.total_score,
                technical = composite.technical_score,
                fundamental = composite.fundamental_score,
                "instrument scored"
            );
            (
                inst.code.clone(),
                Candidate::new(snap, composite, inst.classification.class),
            )
        })
        .collect()
}

pub fn universe_correlation(universe: &Universe, settings: &Settings) -> CorrelationResult {
    let returns = universe
        .instruments
        .iter()
        .map(|inst| (inst.code.clone(), returns_from_bars(&inst.bars)))
        .collect();
    correlation::compute(&returns, &settings.correlation)
}

fn run_profiles(json: bool) -> Result<(), RiskfuseError> {
    let policies: Vec<RiskPolicy> = RiskProfile::ALL
        .iter()
        .map(|p| RiskPolicy::preset(*p))
        .collect();
    if json {
        return print_json(&policies);
    }
    println!(
        "{:<14} {:>9} {:>10} {:>9} {:>12} {:>8} {:>13}",
        "profile", "min score", "single cap", "min cash", "max invested", "kelly", "sharpe floor"
    );
    for p in &policies {
        println!(
            "{:<14} {:>9.0} {:>9.0}% {:>8.0}% {:>11.0}% {:>8.1} {:>13}",
            p.name,
            p.min_score_threshold,
            p.max_single_weight_pct,
            p.min_cash_pct,
            p.max_invested_pct,
            p.kelly_multiplier,
            p.min_sharpe_floor
                .map_or_else(|| "none".to_string(), |f| format!("{:.1}", f))
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path, profile: Option<&str>) -> Result<(), RiskfuseError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let settings = load_settings(&config, profile)?;
    StaticClassifier::from_config(&config)?;
    println!(
        "Config OK: profile {} (invested cap {:.1}%, score threshold {:.0})",
        settings.policy.name,
        settings.policy.invested_cap(),
        settings.policy.min_score_threshold
    );
    Ok(())
}

#[derive(Serialize)]
struct ScoredInstrument<'a> {
    code: &'a str,
    class: String,
    score: &'a CompositeScore,
    snapshot: &'a IndicatorSnapshot,
}

fn run_score(
    config_path: &Path,
    data_path: &Path,
    codes: Option<&str>,
    json: bool,
) -> Result<(), RiskfuseError> {
    let ctx = load_context(config_path, data_path, codes, None)?;
    let candidates = build_candidates(&ctx.universe, &ctx.settings);

    if json {
        let rows: Vec<ScoredInstrument> = candidates
            .iter()
            .map(|(code, c)| ScoredInstrument {
                code,
                class: c.class.to_string(),
                score: &c.score,
                snapshot: &c.snapshot,
            })
            .collect();
        return print_json(&rows);
    }

    for (code, c) in &candidates {
        println!(
            "{} [{}] total {:.0} (technical {:.0}, fundamental {:.0})",
            code, c.class, c.score.total_score, c.score.technical_score, c.score.fundamental_score
        );
        for line in &c.score.explanations {
            println!("    {}", line);
        }
    }
    Ok(())
}

fn run_screen(
    config_path: &Path,
    data_path: &Path,
    codes: Option<&str>,
    json: bool,
) -> Result<(), RiskfuseError> {
    let ctx = load_context(config_path, data_path, codes, None)?;
    let summaries: Vec<ScreeningSummary> = ctx
        .universe
        .instruments
        .iter()
        .filter_map(|inst| {
            ScreeningSummary::from_bars(
                &inst.code,
                &inst.bars,
                inst.fundamentals.clone(),
                inst.classification,
            )
            .ready()
        })
        .collect();
    let outcome: ScreeningOutcome = screen(summaries, &ctx.settings.screening);

    if json {
        return print_json(&outcome);
    }

    println!("Selected ({}):", outcome.selected.len());
    for s in &outcome.selected {
        println!(
            "  {:<10} quality {:>5.1}  manipulation {:>5.1}  bubble {:>5.1}{}",
            s.summary.code,
            s.quality,
            s.manipulation,
            s.bubble,
            if s.summary.pinned { "  (pinned)" } else { "" }
        );
    }
    println!("Rejected ({}):", outcome.rejected.len());
    for r in &outcome.rejected {
        println!(
            "  {:<10} {:?}  quality {:>5.1}",
            r.instrument.summary.code, r.reason, r.instrument.quality
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct AllocationOutput<'a> {
    policy: &'a RiskPolicy,
    correlation: &'a CorrelationResult,
    allocation: &'a Allocation,
    audit: &'a AuditReport,
}

fn run_allocate(
    config_path: &Path,
    data_path: &Path,
    codes: Option<&str>,
    proposal_path: &Path,
    profile: Option<&str>,
    json: bool,
) -> Result<(), RiskfuseError> {
    let ctx = load_context(config_path, data_path, codes, profile)?;
    let proposals = read_proposals(proposal_path)?;
    let candidates = build_candidates(&ctx.universe, &ctx.settings);
    let correlation = universe_correlation(&ctx.universe, &ctx.settings);

    let policy = &ctx.settings.policy;
    let allocation = enforce(&proposals, &candidates, &correlation, policy);
    let report = audit(&allocation, &candidates, &correlation, policy);
    if !report.is_compliant() {
        tracing::warn!(
            breaches = report.breaches().count(),
            "audit found invariant breaches"
        );
    }

    if json {
        return print_json(&AllocationOutput {
            policy,
            correlation: &correlation,
            allocation: &allocation,
            audit: &report,
        });
    }

    println!("Profile: {}", policy.name);
    println!(
        "{:<10} {:<5} {:>8} {:>10} {:>10}  rationale",
        "code", "act", "weight", "target", "stop"
    );
    let price = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));
    for d in &allocation.decisions {
        println!(
            "{:<10} {:<5} {:>7.2}% {:>10} {:>10}  {}",
            d.code,
            d.action,
            d.weight_pct,
            price(d.target_price),
            price(d.stop_price),
            d.rationale
        );
    }
    println!(
        "Invested {:.2}%  Cash {:.2}%",
        allocation.invested_pct, allocation.cash_pct
    );
    println!(
        "Audit: {} checks, {} violations, {}",
        report.checks,
        report.violations.len(),
        if report.is_compliant() {
            "compliant"
        } else {
            "NOT compliant"
        }
    );
    for v in &report.violations {
        println!(
            "  {:?} {:?} {:?}: observed {:.2}, limit {:.2}",
            v.severity, v.rule, v.scope, v.observed, v.limit
        );
    }
    Ok(())
}
