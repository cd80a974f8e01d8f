use netzero_core::{Money, Sign, TransactionLeg};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Header names of the leg columns. `document` and `description` may be
/// absent from the file; their fields are then empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegColumnMapping {
    pub external_id: String,
    pub value: String,
    pub sign: String,
    pub document: String,
    pub description: String,
}

impl Default for LegColumnMapping {
    fn default() -> Self {
        Self {
            external_id: "external_id".to_string(),
            value: "value".to_string(),
            sign: "sign".to_string(),
            document: "document".to_string(),
            description: "description".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvImportProfile {
    pub name: String,
    pub mapping: LegColumnMapping,
    pub delimiter: String,
    /// Rows above the header (report titles and the like) to skip.
    pub header_row_offset: usize,
    /// Values are written `1.234,56` rather than `1,234.56`.
    pub decimal_comma: bool,
}

impl Default for CsvImportProfile {
    fn default() -> Self {
        Self {
            name: "Unnamed Profile".to_string(),
            mapping: LegColumnMapping::default(),
            delimiter: ",".to_string(),
            header_row_offset: 0,
            decimal_comma: false,
        }
    }
}

/// Rows the importer dropped instead of turning into legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    MissingExternalId { source: String, line: u64 },
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingExternalId { source, line } => {
                write!(f, "{source}:{line}: row has no external id, skipped")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedLegs {
    pub legs: Vec<TransactionLeg>,
    pub warnings: Vec<ImportWarning>,
}

impl LoadedLegs {
    pub fn extend(&mut self, other: LoadedLegs) {
        self.legs.extend(other.legs);
        self.warnings.extend(other.warnings);
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column {column:?}; header has {}", .found.join(", "))]
    MissingColumn { column: String, found: Vec<String> },
    #[error("No header row after skipping {0} row(s)")]
    MissingHeader(usize),
    #[error("No data rows")]
    NoDataRows,
}

struct ColumnIndex {
    external_id: usize,
    value: usize,
    sign: usize,
    document: Option<usize>,
    description: Option<usize>,
}

impl ColumnIndex {
    fn resolve(header: &csv::StringRecord, mapping: &LegColumnMapping) -> Result<Self, ImportError> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name.trim());
        let require = |name: &str| {
            find(name).ok_or_else(|| ImportError::MissingColumn {
                column: name.to_string(),
                found: header.iter().map(|h| h.trim().to_string()).collect(),
            })
        };

        Ok(ColumnIndex {
            external_id: require(&mapping.external_id)?,
            value: require(&mapping.value)?,
            sign: require(&mapping.sign)?,
            document: find(&mapping.document),
            description: find(&mapping.description),
        })
    }
}

pub struct CsvImporter;

impl CsvImporter {
    /// Turn every data row into a leg. Unparsable values become `None`,
    /// unknown sign markers `Sign::Unknown`; only rows without an external id
    /// are dropped.
    pub fn parse_profile<R: Read>(
        reader: &mut csv::Reader<R>,
        profile: &CsvImportProfile,
        source: &str,
    ) -> Result<LoadedLegs, ImportError> {
        let mut records = reader.records();

        for _ in 0..profile.header_row_offset {
            if records.next().transpose()?.is_none() {
                return Err(ImportError::MissingHeader(profile.header_row_offset));
            }
        }
        let header = records
            .next()
            .transpose()?
            .ok_or(ImportError::MissingHeader(profile.header_row_offset))?;
        let columns = ColumnIndex::resolve(&header, &profile.mapping)?;

        let mut loaded = LoadedLegs::default();
        let mut rows = 0usize;

        for result in records {
            let record = result?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows += 1;

            let field = |col: usize| record.get(col).unwrap_or_default();
            let external_id = field(columns.external_id).trim();
            if external_id.is_empty() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                tracing::warn!(source, line, "row without external id skipped");
                loaded.warnings.push(ImportWarning::MissingExternalId {
                    source: source.to_string(),
                    line,
                });
                continue;
            }

            loaded.legs.push(TransactionLeg::new(
                external_id,
                parse_value(field(columns.value), profile.decimal_comma),
                Sign::parse(field(columns.sign)),
                columns.document.map(field).unwrap_or_default(),
                columns.description.map(field).unwrap_or_default(),
            ));
        }

        if rows == 0 {
            return Err(ImportError::NoDataRows);
        }

        Ok(loaded)
    }
}

/// Lenient money parsing: currency symbols, thousands separators and
/// accounting parentheses are accepted. Anything else is `None`.
pub fn parse_value(s: &str, decimal_comma: bool) -> Option<Money> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let mut s = s.replace(['$', ' ', '\u{a0}'], "");
    if let Some(rest) = s.strip_prefix("R") {
        // R$ prefix, the "$" is already gone
        s = rest.to_string();
    }
    let s = if decimal_comma {
        s.replace('.', "").replace(',', ".")
    } else {
        s.replace(',', "")
    };
    if s.is_empty() {
        return None;
    }
    let dec = Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()?;
    Some(Money::from_decimal(if negative { -dec } else { dec }))
}

fn reader_for<R: Read>(data: R, profile: &CsvImportProfile) -> csv::Reader<R> {
    let delimiter = profile
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b',');
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data)
}

pub fn import_csv<R: Read>(
    data: R,
    profile: &CsvImportProfile,
    source: &str,
) -> Result<LoadedLegs, ImportError> {
    let mut reader = reader_for(data, profile);
    CsvImporter::parse_profile(&mut reader, profile, source)
}

pub fn import_csv_file(path: &Path, profile: &CsvImportProfile) -> Result<LoadedLegs, ImportError> {
    let file = std::fs::File::open(path)?;
    let loaded = import_csv(file, profile, &path.display().to_string())?;
    tracing::info!(path = %path.display(), legs = loaded.legs.len(), "legs imported");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_value ───────────────────────────────────────────────────────────

    #[test]
    fn parse_value_plain() {
        assert_eq!(parse_value("123.45", false), Some(Money::from_cents(12345)));
    }

    #[test]
    fn parse_value_with_currency_and_commas() {
        assert_eq!(parse_value("$1,234.56", false), Some(Money::from_cents(123456)));
        assert_eq!(parse_value("R$ 99,90", true), Some(Money::from_cents(9990)));
    }

    #[test]
    fn parse_value_decimal_comma() {
        assert_eq!(parse_value("1.234,56", true), Some(Money::from_cents(123456)));
        assert_eq!(parse_value("-40,00", true), Some(Money::from(-40)));
    }

    #[test]
    fn parse_value_negative_forms() {
        assert_eq!(parse_value("-50.00", false), Some(Money::from(-50)));
        assert_eq!(parse_value("(75.25)", false), Some(Money::from_cents(-7525)));
    }

    #[test]
    fn parse_value_scientific() {
        assert_eq!(parse_value("1e2", false), Some(Money::from(100)));
    }

    #[test]
    fn parse_value_invalid_is_none() {
        assert_eq!(parse_value("not_a_number", false), None);
        assert_eq!(parse_value("", false), None);
        assert_eq!(parse_value("  ", false), None);
        assert_eq!(parse_value("()", false), None);
    }

    // ── import ────────────────────────────────────────────────────────────────

    #[test]
    fn import_csv_basic() {
        let data = b"external_id,value,sign,document,description\n T1 ,100,C,DOC1,rent jan\nT1,-100, D ,DOC2,rent\n";
        let loaded = import_csv(data.as_ref(), &CsvImportProfile::default(), "mem").unwrap();
        assert_eq!(loaded.legs.len(), 2);
        assert_eq!(loaded.legs[0].external_id, "T1");
        assert_eq!(loaded.legs[0].value, Some(Money::from(100)));
        assert_eq!(loaded.legs[0].document, "DOC1");
        assert_eq!(loaded.legs[1].sign, Sign::Debit);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn import_csv_keeps_bad_values_and_signs() {
        let data = b"external_id,value,sign,description\nT1,abc,C,x\nT1,10,Q,y\n";
        let loaded = import_csv(data.as_ref(), &CsvImportProfile::default(), "mem").unwrap();
        assert_eq!(loaded.legs[0].value, None);
        assert_eq!(loaded.legs[1].sign, Sign::Unknown("Q".to_string()));
        // no document column
        assert_eq!(loaded.legs[1].document, "");
    }

    #[test]
    fn import_csv_skips_banner_rows_and_maps_columns() {
        let data = "Relatório de lançamentos;;;;\n;;;;\nNº Externo;Valor;Sinal;Documento;Dados Adicionais\n9001;1.500,00;C;NF-1;Pagamento\n9001;-1.500,00;D;NF-1;Pagamento\n";
        let profile = CsvImportProfile {
            name: "erp".to_string(),
            delimiter: ";".to_string(),
            header_row_offset: 2,
            decimal_comma: true,
            mapping: LegColumnMapping {
                external_id: "Nº Externo".to_string(),
                value: "Valor".to_string(),
                sign: "Sinal".to_string(),
                document: "Documento".to_string(),
                description: "Dados Adicionais".to_string(),
            },
        };
        let loaded = import_csv(data.as_bytes(), &profile, "erp.csv").unwrap();
        assert_eq!(loaded.legs.len(), 2);
        assert_eq!(loaded.legs[0].value, Some(Money::from(1500)));
        assert_eq!(loaded.legs[1].value, Some(Money::from(-1500)));
        assert_eq!(loaded.legs[1].description, "Pagamento");
    }

    #[test]
    fn import_csv_reports_rows_without_id() {
        let data = b"external_id,value,sign\n,10,C\nT2,5,D\n";
        let loaded = import_csv(data.as_ref(), &CsvImportProfile::default(), "mem").unwrap();
        assert_eq!(loaded.legs.len(), 1);
        assert_eq!(
            loaded.warnings,
            vec![ImportWarning::MissingExternalId { source: "mem".to_string(), line: 2 }]
        );
    }

    #[test]
    fn import_csv_missing_required_column() {
        let data = b"external_id,amount,sign\nT1,1,C\n";
        let err = import_csv(data.as_ref(), &CsvImportProfile::default(), "mem").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "value"));
        assert_eq!(
            err.to_string(),
            "Missing required column \"value\"; header has external_id, amount, sign"
        );
    }

    #[test]
    fn import_csv_no_data_rows_errors() {
        let data = b"external_id,value,sign\n\n";
        let result = import_csv(data.as_ref(), &CsvImportProfile::default(), "mem");
        assert!(matches!(result, Err(ImportError::NoDataRows)));
    }

    #[test]
    fn import_csv_missing_header() {
        let profile = CsvImportProfile {
            header_row_offset: 3,
            ..Default::default()
        };
        let result = import_csv(b"a\nb\n".as_ref(), &profile, "mem");
        assert!(matches!(result, Err(ImportError::MissingHeader(3))));
    }

    #[test]
    fn missing_column_lists_header_after_banner() {
        let data = b"Ledger export\n ID , value ,sign\nT1,1,C\n";
        let profile = CsvImportProfile {
            header_row_offset: 1,
            ..Default::default()
        };
        match import_csv(data.as_ref(), &profile, "mem") {
            Err(ImportError::MissingColumn { column, found }) => {
                assert_eq!(column, "external_id");
                assert_eq!(found, vec!["ID", "value", "sign"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
