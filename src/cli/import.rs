//! Import command for Span.
//!
//! Loads a JSON array of curriculum items into the store. Items without an
//! id get the next free one; items with an id replace the stored item.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{CurriculumItem, ItemId};
use crate::error::{Result, SpanError};
use crate::storage::CurriculumStore;

/// Options for the import command.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the import command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutput {
    /// Whether the import was successful.
    pub success: bool,
    /// Number of items written.
    pub imported: usize,
    /// Ids assigned to the imported items, in file order.
    pub item_ids: Vec<ItemId>,
    /// Error message if import failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutput {
    /// Create a successful output.
    pub fn success(item_ids: Vec<ItemId>) -> Self {
        Self {
            success: true,
            imported: item_ids.len(),
            item_ids,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            imported: 0,
            item_ids: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Parse a curriculum file.
///
/// Every item needs a non-empty term, gloss and topic.
pub fn parse_items(content: &str) -> Result<Vec<CurriculumItem>> {
    let items: Vec<CurriculumItem> = serde_json::from_str(content)
        .map_err(|e| SpanError::import(format!("expected a JSON array of items: {}", e)))?;

    for (index, item) in items.iter().enumerate() {
        if item.term.trim().is_empty() {
            return Err(SpanError::import(format!("item {} has an empty term", index)));
        }
        if item.gloss.trim().is_empty() {
            return Err(SpanError::import(format!(
                "item {} ('{}') has an empty gloss",
                index, item.term
            )));
        }
        if item.topic.trim().is_empty() {
            return Err(SpanError::import(format!(
                "item {} ('{}') has an empty topic",
                index, item.term
            )));
        }
    }
    Ok(items)
}

/// The import command implementation.
pub struct ImportCommand<S: CurriculumStore> {
    store: S,
}

impl<S: CurriculumStore> ImportCommand<S> {
    /// Create a new import command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the import command for a file.
    pub fn run(&self, path: &Path, _options: &ImportOptions) -> ImportOutput {
        match self.import_file(path) {
            Ok(ids) => ImportOutput::success(ids),
            Err(e) => ImportOutput::failure(e.to_string()),
        }
    }

    fn import_file(&self, path: &Path) -> Result<Vec<ItemId>> {
        let content = fs::read_to_string(path).map_err(|e| SpanError::storage(path, e))?;
        let items = parse_items(&content)?;

        // Validate everything before the first write
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(self.store.add_item(item)?);
        }
        tracing::debug!(path = %path.display(), count = ids.len(), "imported items");
        Ok(ids)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ImportOutput, options: &ImportOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ImportOutput) -> String {
        if output.success {
            format!("Imported {} item(s).\n", output.imported)
        } else {
            format!(
                "Import failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
