use tracing::info;

use crate::config::Layout;
use crate::error::ServiceError;
use crate::models::IngestOutcome;
use crate::store::{self, RollupStore};

/// Merge the roll-up waiting at `source/rollup.html` into the combined log and
/// archive it. A missing source is a no-op, not an error.
pub fn ingest(layout: &Layout) -> Result<IngestOutcome, ServiceError> {
    let source = &layout.source_file;
    if !source.exists() {
        info!(path = %source.display(), "no rollup waiting in source folder");
        return Ok(IngestOutcome::SourceMissing);
    }

    let content = store::read_text(source)?;
    let store = RollupStore::new(layout);
    let created_log = store.append(&content)?;
    if created_log {
        info!(path = %layout.combined_log.display(), "created combined rollup log");
    } else {
        info!(path = %layout.combined_log.display(), bytes = content.len(), "appended rollup to combined log");
    }

    let archived_as = store.archive(source)?;
    info!(path = %archived_as.display(), "archived rollup");

    Ok(IngestOutcome::Ingested {
        archived_as,
        created_log,
    })
}
