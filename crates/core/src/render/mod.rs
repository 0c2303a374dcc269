pub mod html;

use crate::errors::CoreError;
use crate::models::performance::ReportSnapshot;

/// Turns a finished snapshot into the published document. The pipeline only
/// sees bytes; markup lives entirely behind this trait.
pub trait ReportRenderer: Send + Sync {
    /// File extension of the produced document (without the dot). The
    /// configured output path must end in it.
    fn extension(&self) -> &str;

    fn render(&self, snapshot: &ReportSnapshot) -> Result<Vec<u8>, CoreError>;
}
