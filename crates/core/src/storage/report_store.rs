use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::format::{self, HISTORY_FILE, LATEST_REPORT_FILE, PURCHASE_PRICES_FILE};
use crate::errors::CoreError;
use crate::models::history::HistoryEntry;
use crate::models::performance::ReportSnapshot;
use crate::models::price::PurchaseCache;

/// Owns the on-disk state between runs: the purchase-price cache, the
/// latest report snapshot and the history log, all JSON under one directory.
///
/// There is no locking. Two concurrent runs would race on `history.json`.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn purchase_prices_path(&self) -> PathBuf {
        self.dir.join(PURCHASE_PRICES_FILE)
    }

    pub fn latest_report_path(&self) -> PathBuf {
        self.dir.join(LATEST_REPORT_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    // ── Purchase-price cache ────────────────────────────────────────

    /// Cached `symbol → {date, price}`, or `None` when nothing was cached yet.
    pub fn load_purchase_prices(&self) -> Result<Option<PurchaseCache>, CoreError> {
        format::read_json(&self.purchase_prices_path())
    }

    pub fn save_purchase_prices(&self, prices: &PurchaseCache) -> Result<(), CoreError> {
        format::write_json(&self.purchase_prices_path(), prices)?;
        debug!(symbols = prices.len(), "purchase-price cache written");
        Ok(())
    }

    // ── Latest snapshot ─────────────────────────────────────────────

    /// Replace the latest-report file. Saving the same snapshot twice leaves
    /// the same file behind.
    pub fn save_snapshot(&self, snapshot: &ReportSnapshot) -> Result<(), CoreError> {
        let path = self.latest_report_path();
        format::write_json(&path, snapshot)?;
        info!(path = %path.display(), "latest report saved");
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<Option<ReportSnapshot>, CoreError> {
        format::read_json(&self.latest_report_path())
    }

    // ── History ─────────────────────────────────────────────────────

    /// All history entries, oldest first. Empty when the log does not exist.
    pub fn load_history(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        Ok(format::read_json(&self.history_path())?.unwrap_or_default())
    }

    /// Append one entry derived from `snapshot` and rewrite the whole log.
    /// Every call grows the log by exactly one entry; existing entries are
    /// written back unchanged. Returns the new length.
    pub fn append_history(&self, snapshot: &ReportSnapshot) -> Result<usize, CoreError> {
        let mut history = self.load_history()?;
        history.push(HistoryEntry::from_snapshot(snapshot));
        format::write_json(&self.history_path(), &history)?;
        info!(entries = history.len(), "history appended");
        Ok(history.len())
    }

    // ── Rendered document ───────────────────────────────────────────

    pub fn write_document(&self, path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
        format::write_bytes(path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "report document written");
        Ok(())
    }
}
