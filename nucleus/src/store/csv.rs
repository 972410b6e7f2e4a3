//! Flat CSV export of the image summary table.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::summary::ImageSummaryRecord;

use super::StoreError;

pub const SUMMARY_CSV_HEADER: &str = "image_id,region,genotype,seedling,z_slice,channel,\
nucleus_count,mean_area,mean_integrated_intensity,total_area,total_integrated_intensity,\
mean_intensity";

/// Write `rows` to `path`, replacing any previous file.
///
/// The file is written next to the target and renamed into place, so a
/// failed export never leaves a truncated summary behind.
pub fn write_summary_csv(path: &Path, rows: &[ImageSummaryRecord]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("csv.tmp");
    let result = write_rows(&tmp_path, rows).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Csv {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::info!(path = %path.display(), rows = rows.len(), "Wrote summary CSV");
    Ok(())
}

fn write_rows(path: &Path, rows: &[ImageSummaryRecord]) -> io::Result<()> {
    let mut wtr = BufWriter::new(File::create(path)?);
    writeln!(wtr, "{SUMMARY_CSV_HEADER}")?;
    for row in rows {
        writeln!(
            wtr,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            escape(row.image_id.as_str()),
            escape(&row.region),
            escape(&row.genotype),
            optional(row.seedling),
            optional(row.z_slice),
            escape(&row.channel),
            row.nucleus_count,
            row.mean_area,
            row.mean_integrated_intensity,
            row.total_area,
            row.total_integrated_intensity,
            row.mean_intensity,
        )?;
    }
    wtr.flush()
}

fn optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// RFC 4180 quoting.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("meristem"), "meristem");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_optional_empty() {
        assert_eq!(optional(None), "");
        assert_eq!(optional(Some(7)), "7");
    }
}
