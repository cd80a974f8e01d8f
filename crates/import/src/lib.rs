pub mod csv;
pub mod export;

pub use crate::csv::{CsvImportProfile, ImportError, ImportWarning, LegColumnMapping, LoadedLegs};
pub use export::{ExportError, ReconciliationReport, ReportMeta};

pub mod import {
    use std::path::Path;

    use crate::*;

    /// Load every file in order and concatenate the legs.
    pub fn import_files<P: AsRef<Path>>(
        paths: &[P],
        profile: &CsvImportProfile,
    ) -> Result<LoadedLegs, ImportError> {
        let mut loaded = LoadedLegs::default();
        for path in paths {
            loaded.extend(crate::csv::import_csv_file(path.as_ref(), profile)?);
        }
        Ok(loaded)
    }
}
