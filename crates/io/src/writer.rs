use log::info;
use tally_recon::{ReportFile, ReportFormat};

use crate::error::IoError;
use crate::storage;

/// Serialize one report file into `dir` and return the locators written.
///
/// CSV holds one table per file, so multi-table reports fan out to
/// `<stem>_<table>.csv`.
pub fn write_report(dir: &str, file: &ReportFile, format: ReportFormat) -> Result<Vec<String>, IoError> {
    let mut written = Vec::new();
    let mut emit = |name: String, bytes: Result<Vec<u8>, String>| -> Result<(), IoError> {
        let locator = storage::join(dir, &name);
        let bytes = bytes.map_err(|message| IoError::Write {
            locator: locator.clone(),
            message,
        })?;
        storage::write_bytes(&locator, &bytes)?;
        info!("wrote {}", locator);
        written.push(locator);
        Ok(())
    };

    match format {
        ReportFormat::Xlsx => emit(
            format!("{}.{}", file.stem, format.extension()),
            crate::xlsx::write_workbook(file),
        )?,
        ReportFormat::Json => emit(
            format!("{}.{}", file.stem, format.extension()),
            crate::json::write_report(file),
        )?,
        ReportFormat::Csv => match file.tables.as_slice() {
            [single] => emit(format!("{}.csv", file.stem), crate::csv::write_table(single))?,
            tables => {
                for table in tables {
                    emit(
                        format!("{}_{}.csv", file.stem, file_safe(&table.name)),
                        crate::csv::write_table(table),
                    )?;
                }
            }
        },
    }
    Ok(written)
}

pub fn write_reports(
    dir: &str,
    files: &[ReportFile],
    format: ReportFormat,
) -> Result<Vec<String>, IoError> {
    let mut written = Vec::new();
    for file in files {
        written.extend(write_report(dir, file, format)?);
    }
    Ok(written)
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_recon::ReportTable;
    use tempfile::tempdir;

    fn table(name: &str) -> ReportTable {
        ReportTable {
            name: name.into(),
            columns: vec!["Invoice No.".into(), "Status".into()],
            rows: vec![vec!["INV1".into(), "Pass".into()]],
        }
    }

    #[test]
    fn csv_single_table_uses_stem() {
        let dir = tempdir().unwrap();
        let out = dir.path().to_string_lossy().into_owned();
        let file = ReportFile {
            stem: "producer_report".into(),
            tables: vec![table("Report")],
        };
        let written = write_report(&out, &file, ReportFormat::Csv).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("producer_report.csv"));
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(text, "Invoice No.,Status\nINV1,Pass\n");
    }

    #[test]
    fn csv_multi_table_fans_out() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("reports").to_string_lossy().into_owned();
        let file = ReportFile {
            stem: "final_report".into(),
            tables: vec![table("producer"), table("Final Sheet")],
        };
        let written = write_report(&out, &file, ReportFormat::Csv).unwrap();
        let names: Vec<_> = written.iter().map(|l| storage::file_name(l)).collect();
        assert_eq!(names, ["final_report_producer.csv", "final_report_Final_Sheet.csv"]);
    }

    #[test]
    fn xlsx_and_json_are_single_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().to_string_lossy().into_owned();
        let files = vec![
            ReportFile {
                stem: "consolidated_report".into(),
                tables: vec![table("Consolidated")],
            },
            ReportFile {
                stem: "final_report".into(),
                tables: vec![table("producer"), table("Final")],
            },
        ];
        let xlsx = write_reports(&out, &files, ReportFormat::Xlsx).unwrap();
        assert_eq!(xlsx.len(), 2);
        assert!(xlsx[1].ends_with("final_report.xlsx"));

        let json = write_reports(&out, &files, ReportFormat::Json).unwrap();
        let text = std::fs::read_to_string(&json[0]).unwrap();
        assert!(text.contains("\"Consolidated\""));
    }
}
