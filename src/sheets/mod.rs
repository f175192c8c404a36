pub mod google;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

/// One worksheet row, cells in column order.
pub type Row = Vec<String>;

/// A spreadsheet whose worksheets are addressed by name.
///
/// Implementations own their own timeouts; callers never wrap them.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Every row of the worksheet, header included, top to bottom.
    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Row>>;

    /// Append one row after the last row of the worksheet.
    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()>;
}
