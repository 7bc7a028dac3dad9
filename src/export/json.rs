use std::io::Write;

use crate::error::{ClimbRsError, Result};
use crate::models::StagePlan;

/// Export the full plan, route stats and summary included
pub fn write_json<W: Write>(plan: &StagePlan, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, plan)
        .map_err(|e| ClimbRsError::Export(format!("JSON write failed: {}", e)))?;
    writeln!(writer)?;
    Ok(())
}
