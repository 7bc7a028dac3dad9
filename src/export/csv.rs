use std::io::Write;

use crate::error::{ClimbRsError, Result};
use crate::models::SegmentRow;

/// Export segment rows as CSV with a header line
pub fn write_csv<W: Write>(rows: &[SegmentRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|e| ClimbRsError::Export(format!("CSV write failed: {}", e)))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::sample_plan;

    #[test]
    fn test_header_and_enum_columns() {
        let mut buffer = Vec::new();
        write_csv(&sample_plan().rows, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("segment,start_km,end_km"));
        assert!(header.ends_with("glycogen_level_pct"));

        let first = lines.next().unwrap();
        assert!(first.contains(",climb,no_draft,"));
    }

    #[test]
    fn test_empty_rows_write_nothing() {
        let mut buffer = Vec::new();
        write_csv(&[], &mut buffer).unwrap();
        assert!(buffer.is_empty());
    }
}
