//! Discovery filter: hides mutating tools from listings.
//!
//! The filter never fails a listing. If it cannot read the entries of a
//! listing or cannot build a filtered copy, the caller gets the original
//! listing back unchanged.

use serde_json::Value;

use super::classifier::{Classification, OperationClassifier};
use super::state::PolicyState;
use crate::protocol::{ListToolsResult, ToolDefinition};

/// A listing of tools whose entries can be read and rebuilt.
///
/// One implementation per listing shape. Each method returns `None` when the
/// value does not have the expected shape; the filter then returns the listing
/// unfiltered.
pub trait ToolListing: Sized {
    type Entry: Clone;

    /// Entries in listing order, or `None` if they cannot be read.
    fn entries(&self) -> Option<&[Self::Entry]>;

    /// Name of one entry, or `None` if it has none.
    fn entry_name(entry: &Self::Entry) -> Option<&str>;

    /// A new listing holding `entries` and every other field of `self`
    /// (pagination cursor included). `self` is left untouched.
    fn with_entries(&self, entries: Vec<Self::Entry>) -> Option<Self>;
}

impl ToolListing for ListToolsResult {
    type Entry = ToolDefinition;

    fn entries(&self) -> Option<&[ToolDefinition]> {
        Some(&self.tools)
    }

    fn entry_name(entry: &ToolDefinition) -> Option<&str> {
        Some(&entry.name)
    }

    fn with_entries(&self, entries: Vec<ToolDefinition>) -> Option<Self> {
        Some(Self {
            tools: entries,
            next_cursor: self.next_cursor.clone(),
        })
    }
}

/// Untyped `{"tools": [...], "nextCursor": ...}` listings.
impl ToolListing for Value {
    type Entry = Value;

    fn entries(&self) -> Option<&[Value]> {
        self.get("tools")?.as_array().map(Vec::as_slice)
    }

    fn entry_name(entry: &Value) -> Option<&str> {
        entry.get("name")?.as_str()
    }

    fn with_entries(&self, entries: Vec<Value>) -> Option<Self> {
        let mut rebuilt = self.as_object()?.clone();
        rebuilt.insert("tools".to_string(), Value::Array(entries));
        Some(Value::Object(rebuilt))
    }
}

/// Filters tool listings down to read-only entries when the policy is enabled.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryFilter {
    state: PolicyState,
    classifier: OperationClassifier,
}

impl DiscoveryFilter {
    pub fn new(state: PolicyState, classifier: OperationClassifier) -> Self {
        Self { state, classifier }
    }

    /// Filter a listing, returning it unchanged when nothing needs hiding or
    /// it cannot be introspected.
    pub fn filter<L: ToolListing>(&self, listing: L) -> L {
        if !self.state.is_enabled() {
            return listing;
        }
        let Some(entries) = listing.entries() else {
            return listing;
        };

        let kept: Vec<L::Entry> = entries
            .iter()
            .filter(|entry| {
                self.classifier.classify(L::entry_name(entry)) == Classification::ReadOnly
            })
            .cloned()
            .collect();

        if kept.len() == entries.len() {
            return listing;
        }

        match listing.with_entries(kept) {
            Some(filtered) => filtered,
            None => listing,
        }
    }

    /// Filter the outcome of a listing call. Errors pass through untouched.
    pub fn filter_result<L: ToolListing, E>(&self, result: Result<L, E>) -> Result<L, E> {
        result.map(|listing| self.filter(listing))
    }
}
