//! Views returned by the read side.

use domain::{CombinedLineItem, Document, Totals, calculate_totals};
use serde::{Deserialize, Serialize};

/// A document header with its flattened lines and recomputed totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub lines: Vec<CombinedLineItem>,
    /// Computed from `lines`; compare with the stored header amounts to spot drift.
    pub totals: Totals,
}

impl DocumentDetail {
    pub fn new(document: Document, lines: Vec<CombinedLineItem>) -> Self {
        let totals = calculate_totals(&lines, document.discount, document.tax_rate).rounded();
        Self {
            document,
            lines,
            totals,
        }
    }

    /// Returns true if the stored total no longer matches the lines.
    pub fn totals_drifted(&self) -> bool {
        self.totals.total != self.document.total_amount
    }

    /// Returns the lines whose catalog rows are gone.
    pub fn orphaned_lines(&self) -> impl Iterator<Item = &CombinedLineItem> {
        self.lines.iter().filter(|line| line.is_orphaned())
    }
}
