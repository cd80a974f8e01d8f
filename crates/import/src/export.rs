use std::io::Write;
use std::path::{Path, PathBuf};

use netzero_core::{ReconcileConfig, TransactionLeg};
use netzero_reconcile::{LegRecord, MatchedLeg, ReconciliationResult};
use serde::Serialize;
use thiserror::Error;

pub const UNRESOLVED_FILE: &str = "unresolved_imbalances.csv";
pub const PARTIAL_MATCHES_FILE: &str = "partial_matches.csv";
pub const REPORT_FILE: &str = "report.json";

const LEG_HEADER: [&str; 5] = ["external_id", "value", "sign", "document", "description"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
    pub inputs: Vec<String>,
    pub config: ReconcileConfig,
}

impl ReportMeta {
    pub fn new(inputs: Vec<String>, config: &ReconcileConfig) -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            inputs,
            config: config.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub meta: ReportMeta,
    #[serde(flatten)]
    pub result: ReconciliationResult,
}

fn leg_fields(leg: &TransactionLeg) -> [String; 5] {
    [
        leg.external_id.clone(),
        leg.value.map(|v| v.as_decimal().to_string()).unwrap_or_default(),
        leg.sign.marker().to_string(),
        leg.document.clone(),
        leg.description.clone(),
    ]
}

pub fn write_unresolved_csv<W: Write>(out: W, records: &[LegRecord]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(std::iter::once("leg_index").chain(LEG_HEADER))?;
    for record in records {
        let index = record.leg_index.to_string();
        let fields = leg_fields(&record.leg);
        writer.write_record(std::iter::once(index.as_str()).chain(fields.iter().map(String::as_str)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_partial_matches_csv<W: Write>(out: W, matches: &[MatchedLeg]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["group", "match_kind", "match_index", "leg_index"].into_iter().chain(LEG_HEADER))?;
    for m in matches {
        let prefix = [
            m.group.clone(),
            m.match_kind.to_string(),
            m.match_index.to_string(),
            m.leg_index.to_string(),
        ];
        let fields = leg_fields(&m.leg);
        writer.write_record(prefix.iter().chain(fields.iter()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_json<W: Write>(mut out: W, report: &ReconciliationReport) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut out, report)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Write both record sets and the JSON report into `dir`, creating it if
/// needed. Returns the written paths.
pub fn write_all(dir: &Path, report: &ReconciliationReport) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;

    let unresolved = dir.join(UNRESOLVED_FILE);
    write_unresolved_csv(std::fs::File::create(&unresolved)?, &report.result.unresolved_imbalances)?;

    let partial = dir.join(PARTIAL_MATCHES_FILE);
    write_partial_matches_csv(std::fs::File::create(&partial)?, &report.result.partial_matches)?;

    let json = dir.join(REPORT_FILE);
    write_report_json(std::io::BufWriter::new(std::fs::File::create(&json)?), report)?;

    tracing::info!(dir = %dir.display(), "results exported");
    Ok(vec![unresolved, partial, json])
}

#[cfg(test)]
mod tests {
    use super::*;
    use netzero_core::{Money, Sign};
    use netzero_reconcile::MatchKind;

    fn leg(id: &str, value: Option<Money>, sign: &str, desc: &str) -> TransactionLeg {
        TransactionLeg::new(id, value, Sign::parse(sign), "DOC", desc)
    }

    #[test]
    fn unresolved_csv_layout() {
        let records = vec![
            LegRecord { leg_index: 0, leg: leg("T1", Some(Money::from_cents(-4050)), "D", "fee, bank") },
            LegRecord { leg_index: 3, leg: leg("T1", None, "?", "") },
        ];
        let mut out = Vec::new();
        write_unresolved_csv(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "leg_index,external_id,value,sign,document,description\n\
             0,T1,-40.50,D,DOC,\"fee, bank\"\n\
             3,T1,,?,DOC,\n"
        );
    }

    #[test]
    fn partial_matches_csv_layout() {
        let matches = vec![MatchedLeg {
            group: "T2".to_string(),
            match_kind: MatchKind::Combination,
            match_index: 1,
            leg_index: 7,
            leg: leg("T2", Some(Money::from(55)), "D", "fee"),
        }];
        let mut out = Vec::new();
        write_partial_matches_csv(&mut out, &matches).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("group,match_kind,match_index,leg_index,external_id,value,sign,document,description")
        );
        assert_eq!(lines.next(), Some("T2,combination,1,7,T2,55,D,DOC,fee"));
    }

    #[test]
    fn report_json_flattens_result() {
        let report = ReconciliationReport {
            meta: ReportMeta::new(vec!["a.csv".to_string()], &ReconcileConfig::default()),
            result: ReconciliationResult::default(),
        };
        let mut out = Vec::new();
        write_report_json(&mut out, &report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["meta"]["inputs"][0], "a.csv");
        assert!(value["unresolved_imbalances"].as_array().unwrap().is_empty());
        assert_eq!(value["summary"]["total_legs"], 0);
    }
}
