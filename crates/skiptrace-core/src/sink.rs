use anyhow::Result;

use crate::compare::AnalysisRow;

/// Destination for analysis records. Implementations must persist a written
/// row on `flush` so a mid-run failure preserves completed pairs.
pub trait ResultSink {
    fn write(&mut self, row: &AnalysisRow) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<AnalysisRow>,
}

impl ResultSink for MemorySink {
    fn write(&mut self, row: &AnalysisRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
