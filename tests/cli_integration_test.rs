//! CLI integration tests.
//!
//! Tests cover:
//! - Each subcommand against a data directory and INI file on disk
//! - JSON output shape for the allocation cycle
//! - Exit codes per error category

mod common;

use common::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const CONFIG: &str = r#"
[policy]
profile = balanced
min_score_threshold = 0

[correlation]
window = 60
min_overlap = 20

[classification]
AAA = bank
BBB = bank
CCC = energy

[pinned]
codes = CCC
"#;

const PROPOSAL: &str = "code,action,weight_pct,target_price,stop_price,rationale\n\
AAA,BUY,25,,,rates tailwind\n\
BBB,buy,25,10,,\n\
CCC,BUY,lots,,,oops\n\
ZZZ,BUY,10,,,not in universe\n\
AAA,SELL,5,,,duplicate\n";

struct Fixture {
    _dir: TempDir,
    config: PathBuf,
    data: PathBuf,
    proposal: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();

    fs::write(data.join("AAA.csv"), bars_to_csv(&wave("AAA", 120, 100.0, 6.0, 25.0, 0.0))).unwrap();
    fs::write(data.join("BBB.csv"), bars_to_csv(&wave("BBB", 120, 40.0, 2.0, 25.0, 0.0))).unwrap();
    fs::write(data.join("CCC.csv"), bars_to_csv(&trending("CCC", 120, 20.0, 0.1))).unwrap();
    fs::write(
        data.join("fundamentals.csv"),
        "code,pe_ratio,pb_ratio,roe_pct,roa_pct,debt_to_equity,free_cash_flow,revenue_growth_pct,market_cap,revenue,float_shares\n\
         AAA,7.5,0.9,22,3,0.4,500,12,,,\n",
    )
    .unwrap();

    let config = dir.path().join("riskfuse.ini");
    fs::write(&config, CONFIG).unwrap();
    let proposal = dir.path().join("proposal.csv");
    fs::write(&proposal, PROPOSAL).unwrap();

    Fixture {
        _dir: dir,
        config,
        data,
        proposal,
    }
}

fn riskfuse(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_riskfuse"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

mod subcommands {
    use super::*;

    #[test]
    fn profiles_lists_all_presets() {
        let out = riskfuse(&["profiles", "--json"]);
        assert!(out.status.success());
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        let names: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["conservative", "balanced", "aggressive"]);
        assert_eq!(value[1]["min_sharpe_floor"], -0.5);
        assert!(value[2]["min_sharpe_floor"].is_null());
        assert_eq!(value[2]["max_single_weight_pct"], 30.0);
    }

    #[test]
    fn profiles_text_marks_missing_sharpe_floor() {
        let out = riskfuse(&["profiles"]);
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        let aggressive = stdout
            .lines()
            .find(|l| l.starts_with("aggressive"))
            .unwrap();
        assert!(aggressive.trim_end().ends_with("none"), "{}", aggressive);
    }

    #[test]
    fn validate_accepts_good_config() {
        let f = fixture();
        let out = riskfuse(&["validate", "--config", path(&f.config)]);
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("profile balanced"), "{}", stdout);
    }

    #[test]
    fn score_emits_one_entry_per_instrument() {
        let f = fixture();
        let out = riskfuse(&[
            "score",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "AAA,BBB,CCC",
            "--json",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        for row in rows {
            let total = row["score"]["total_score"].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&total));
            assert!(!row["score"]["explanations"].as_array().unwrap().is_empty());
        }
    }

    #[test]
    fn score_defaults_to_every_file_in_data_dir() {
        let f = fixture();
        let out = riskfuse(&[
            "score",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--json",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        let codes: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn screen_keeps_pinned_instrument_first() {
        let f = fixture();
        let out = riskfuse(&[
            "screen",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "AAA,BBB,CCC",
            "--json",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        let selected = value["selected"].as_array().unwrap();
        assert_eq!(selected[0]["summary"]["code"], "CCC");
        assert_eq!(selected[0]["summary"]["pinned"], true);
    }

    #[test]
    fn allocate_produces_compliant_json() {
        let f = fixture();
        let out = riskfuse(&[
            "allocate",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "AAA,BBB,CCC",
            "--proposal",
            path(&f.proposal),
            "--json",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();

        let decisions = value["allocation"]["decisions"].as_array().unwrap();
        assert_eq!(decisions.len(), 5);
        assert_eq!(decisions[2]["code"], "CCC");
        assert_eq!(decisions[2]["action"], "WAIT");
        assert_eq!(decisions[3]["action"], "WAIT");
        assert_eq!(decisions[4]["action"], "WAIT");
        for d in decisions {
            let w = d["weight_pct"].as_f64().unwrap();
            assert!(w <= 12.0 + 1e-9, "correlated banks are capped: {}", d);
        }

        let invested = value["allocation"]["invested_pct"].as_f64().unwrap();
        let cash = value["allocation"]["cash_pct"].as_f64().unwrap();
        assert!((invested + cash - 100.0).abs() < 1e-9);

        let breaches = value["audit"]["violations"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|v| v["severity"] == "breach")
            .count();
        assert_eq!(breaches, 0);
    }

    #[test]
    fn allocate_text_output() {
        let f = fixture();
        let out = riskfuse(&[
            "allocate",
            "-c",
            path(&f.config),
            "-d",
            path(&f.data),
            "--codes",
            "AAA,BBB,CCC",
            "-p",
            path(&f.proposal),
            "--profile",
            "conservative",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("Profile: conservative"));
        assert!(stdout.contains("compliant"));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn missing_config_is_io_error() {
        let out = riskfuse(&["validate", "--config", "/nonexistent/riskfuse.ini"]);
        assert_eq!(out.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
    }

    #[test]
    fn invalid_value_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("bad.ini");
        fs::write(&config, "[policy]\nmin_cash_pct = lots\n").unwrap();
        let out = riskfuse(&["validate", "--config", path(&config)]);
        assert_eq!(out.status.code(), Some(2));
    }

    #[test]
    fn unknown_profile_has_its_own_code() {
        let f = fixture();
        let out = riskfuse(&["validate", "--config", path(&f.config), "--profile", "yolo"]);
        assert_eq!(out.status.code(), Some(4));
    }

    #[test]
    fn missing_proposal_is_data_error() {
        let f = fixture();
        let out = riskfuse(&[
            "allocate",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "AAA",
            "--proposal",
            "/nonexistent/proposal.csv",
        ]);
        assert_eq!(out.status.code(), Some(3));
    }

    #[test]
    fn unknown_single_code_is_no_data() {
        let f = fixture();
        let out = riskfuse(&[
            "score",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "NOPE",
        ]);
        assert_eq!(out.status.code(), Some(5));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let f = fixture();
        let out = riskfuse(&[
            "score",
            "--config",
            path(&f.config),
            "--data",
            path(&f.data),
            "--codes",
            "AAA,aaa",
        ]);
        assert_eq!(out.status.code(), Some(2));
    }
}
