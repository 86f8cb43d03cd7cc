//! # Reference Suggestion Engine
//!
//! Trigger-driven state machine for searching and inserting embeddings:
//! `CLOSED → OPEN → FILTERING → … → COMMITTED/CLOSED`.
//!
//! The local trigger scopes candidates to the current record type's own
//! fields plus all record-type names; the global trigger adds records
//! found by the asynchronous host search. Async responses carry the
//! generation of the request that produced them and are discarded when a
//! newer filter has been issued since — staleness is detected on the
//! receiving side, no cancellation signal ever reaches the host.

use serde::Serialize;

use pubweave_model::{EmbedTarget, RecordSummary, RecordType, RecordTypeTable};

/// The local trigger: fields of the current record, nested structure
pub const LOCAL_TRIGGER: char = '~';
/// The global trigger: existing records anywhere in the installation
pub const GLOBAL_TRIGGER: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Local,
    Global,
}

impl TriggerKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            LOCAL_TRIGGER => Some(TriggerKind::Local),
            GLOBAL_TRIGGER => Some(TriggerKind::Global),
            _ => None,
        }
    }
}

/// One candidate in the menu
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionItem {
    /// A field of the record owning the current document
    Field { slug: String, name: String },
    /// Create-or-insert a record of this type
    RecordType { type_id: String, name: String },
    /// An existing record found by the host search
    Record(RecordSummary),
}

impl SuggestionItem {
    pub fn label(&self) -> &str {
        match self {
            SuggestionItem::Field { name, .. } => name,
            SuggestionItem::RecordType { name, .. } => name,
            SuggestionItem::Record(summary) => {
                if summary.title.is_empty() {
                    &summary.id
                } else {
                    &summary.title
                }
            }
        }
    }

    /// What committing this candidate embeds
    pub fn target(&self) -> EmbedTarget {
        match self {
            SuggestionItem::Field { slug, .. } => EmbedTarget::LocalField { slug: slug.clone() },
            SuggestionItem::RecordType { type_id, .. } => EmbedTarget::NewRecord {
                type_id: type_id.clone(),
            },
            SuggestionItem::Record(summary) => EmbedTarget::ExistingRecord(summary.clone()),
        }
    }
}

/// Snapshot shape handed to the host UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionState {
    pub is_open: bool,
    pub selected_index: usize,
    pub items: Vec<SuggestionItem>,
    pub filter: String,
}

impl SuggestionState {
    pub fn closed() -> Self {
        Self {
            is_open: false,
            selected_index: 0,
            items: Vec::new(),
            filter: String::new(),
        }
    }
}

/// An asynchronous search the host should run for this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub filter: String,
}

/// Candidate sources for the current document
#[derive(Debug, Clone, Copy)]
pub struct CandidateContext<'a> {
    pub record_types: &'a RecordTypeTable,
    /// Type of the record owning the document, when it resolves
    pub current_type: Option<&'a RecordType>,
}

/// One open suggestion session. Ephemeral: rebuilt on every relevant
/// keystroke and discarded on close, never serialized.
#[derive(Debug, Clone)]
pub struct SuggestionSession {
    pub trigger: TriggerKind,
    /// Position of the trigger character in the document
    pub trigger_pos: usize,
    pub filter: String,
    pub items: Vec<SuggestionItem>,
    pub selected_index: usize,
    /// Error from the most recent failed search, surfaced in this menu only
    pub search_error: Option<String>,
    generation: u64,
}

impl SuggestionSession {
    /// CLOSED → OPEN: the trigger character was typed at the caret
    pub fn open(trigger: TriggerKind, trigger_pos: usize, ctx: &CandidateContext<'_>) -> Self {
        let mut session = Self {
            trigger,
            trigger_pos,
            filter: String::new(),
            items: Vec::new(),
            selected_index: 0,
            search_error: None,
            generation: 0,
        };
        session.items = session.sync_candidates(ctx);
        session
    }

    /// OPEN → FILTERING: recompute candidates for a new filter. For the
    /// global trigger the returned request should be handed to the host.
    pub fn set_filter(
        &mut self,
        filter: impl Into<String>,
        ctx: &CandidateContext<'_>,
    ) -> Option<SearchRequest> {
        self.filter = filter.into();
        self.generation += 1;
        self.search_error = None;
        let items = self.sync_candidates(ctx);
        self.refresh_items(items);

        match self.trigger {
            TriggerKind::Global => Some(SearchRequest {
                generation: self.generation,
                filter: self.filter.clone(),
            }),
            TriggerKind::Local => None,
        }
    }

    /// Apply an asynchronous search response. Returns `false` when the
    /// response is stale (a newer filter was issued since) and was
    /// discarded.
    pub fn apply_search_results(&mut self, generation: u64, records: Vec<RecordSummary>) -> bool {
        if generation != self.generation {
            return false;
        }
        let mut items = self.items.clone();
        items.retain(|item| !matches!(item, SuggestionItem::Record(_)));
        items.extend(records.into_iter().map(SuggestionItem::Record));
        self.refresh_items(items);
        true
    }

    /// A search failure for the current generation; stale failures are
    /// ignored like stale results.
    pub fn apply_search_error(&mut self, generation: u64, message: impl Into<String>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.search_error = Some(message.into());
        true
    }

    pub fn arrow_down(&mut self) {
        if !self.items.is_empty() {
            self.selected_index = (self.selected_index + 1) % self.items.len();
        }
    }

    pub fn arrow_up(&mut self) {
        if !self.items.is_empty() {
            self.selected_index =
                (self.selected_index + self.items.len() - 1) % self.items.len();
        }
    }

    pub fn selected(&self) -> Option<&SuggestionItem> {
        self.items.get(self.selected_index)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SuggestionState {
        SuggestionState {
            is_open: true,
            selected_index: self.selected_index,
            items: self.items.clone(),
            filter: self.filter.clone(),
        }
    }

    /// Selection is preserved while the item count is unchanged and reset
    /// to the top when it changes.
    fn refresh_items(&mut self, items: Vec<SuggestionItem>) {
        if items.len() != self.items.len() {
            self.selected_index = 0;
        }
        self.items = items;
    }

    fn sync_candidates(&self, ctx: &CandidateContext<'_>) -> Vec<SuggestionItem> {
        let mut scored: Vec<(u32, SuggestionItem)> = Vec::new();

        if self.trigger == TriggerKind::Local {
            if let Some(current) = ctx.current_type {
                for field in &current.fields {
                    if let Some(score) = fuzzy_match(&self.filter, &field.name) {
                        scored.push((
                            score,
                            SuggestionItem::Field {
                                slug: field.slug.clone(),
                                name: field.name.clone(),
                            },
                        ));
                    }
                }
            }
        }

        for ty in ctx.record_types.iter() {
            if let Some(score) = fuzzy_match(&self.filter, &ty.name) {
                scored.push((
                    score,
                    SuggestionItem::RecordType {
                        type_id: ty.id.clone(),
                        name: ty.name.clone(),
                    },
                ));
            }
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, item)| item).collect()
    }
}

/// Case-insensitive subsequence match with a preference for prefixes and
/// consecutive runs. `None` means the candidate is filtered out.
pub fn fuzzy_match(filter: &str, candidate: &str) -> Option<u32> {
    if filter.is_empty() {
        return Some(0);
    }
    let filter: Vec<char> = filter.to_lowercase().chars().collect();
    let candidate: Vec<char> = candidate.to_lowercase().chars().collect();

    let mut score = 0u32;
    let mut fi = 0usize;
    let mut last_hit: Option<usize> = None;
    for (ci, c) in candidate.iter().enumerate() {
        if fi < filter.len() && *c == filter[fi] {
            score += match last_hit {
                Some(prev) if prev + 1 == ci => 2,
                _ => 1,
            };
            if fi == 0 && ci == 0 {
                score += 8;
            }
            last_hit = Some(ci);
            fi += 1;
        }
    }
    (fi == filter.len()).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubweave_model::{FieldSpec, RecordType, RecordTypeTable};
    use std::collections::BTreeMap;

    fn table() -> RecordTypeTable {
        RecordTypeTable::from_types(vec![RecordType {
            id: "article".into(),
            name: "Article".into(),
            fields: vec![
                field("author", "Author"),
                field("abstract", "Abstract"),
                field("affiliation", "Affiliation"),
            ],
        }])
        .unwrap()
    }

    fn field(slug: &str, name: &str) -> FieldSpec {
        FieldSpec {
            slug: slug.into(),
            name: name.into(),
            schema_kind: "string".into(),
        }
    }

    fn ctx(table: &RecordTypeTable) -> CandidateContext<'_> {
        CandidateContext {
            record_types: table,
            current_type: table.get("article"),
        }
    }

    fn record(id: &str) -> RecordSummary {
        RecordSummary {
            id: id.into(),
            type_id: "article".into(),
            title: id.to_uppercase(),
            values: BTreeMap::new(),
        }
    }

    #[test]
    fn test_filter_narrows_candidates() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Local, 1, &ctx);

        // fields Author/Abstract/Affiliation plus the Article type name
        assert_eq!(session.items.len(), 4);

        session.set_filter("Au", &ctx);
        let labels: Vec<_> = session.items.iter().map(|i| i.label()).collect();
        assert_eq!(labels, vec!["Author"]);
    }

    #[test]
    fn test_arrow_keys_wrap() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Local, 1, &ctx);
        session.set_filter("A", &ctx);
        assert_eq!(session.items.len(), 4);
        assert_eq!(session.selected_index, 0);

        session.arrow_up();
        assert_eq!(session.selected_index, 3);

        session.arrow_down();
        assert_eq!(session.selected_index, 0);
        session.arrow_down();
        assert_eq!(session.selected_index, 1);
    }

    #[test]
    fn test_selected_index_resets_only_when_count_changes() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Local, 1, &ctx);

        session.set_filter("A", &ctx);
        session.arrow_down();
        assert_eq!(session.selected_index, 1);

        // same candidate count -> selection preserved
        session.set_filter("a", &ctx);
        assert_eq!(session.items.len(), 4);
        assert_eq!(session.selected_index, 1);

        // narrower count -> reset to the top
        session.set_filter("Au", &ctx);
        assert_eq!(session.selected_index, 0);
    }

    #[test]
    fn test_global_trigger_issues_requests_with_generations() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Global, 1, &ctx);

        let first = session.set_filter("ad", &ctx).unwrap();
        let second = session.set_filter("ada", &ctx).unwrap();
        assert!(second.generation > first.generation);
        assert_eq!(second.filter, "ada");
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Global, 1, &ctx);

        let stale = session.set_filter("ad", &ctx).unwrap();
        let current = session.set_filter("ada", &ctx).unwrap();

        // the slow response for the superseded filter arrives late
        assert!(!session.apply_search_results(stale.generation, vec![record("old")]));
        assert!(session
            .items
            .iter()
            .all(|i| !matches!(i, SuggestionItem::Record(_))));

        assert!(session.apply_search_results(current.generation, vec![record("ada")]));
        assert!(session
            .items
            .iter()
            .any(|i| matches!(i, SuggestionItem::Record(_))));
    }

    #[test]
    fn test_search_results_replace_previous_records() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Global, 1, &ctx);

        let req = session.set_filter("ad", &ctx).unwrap();
        session.apply_search_results(req.generation, vec![record("ada"), record("adam")]);
        let req = session.set_filter("ada", &ctx).unwrap();
        session.apply_search_results(req.generation, vec![record("ada")]);

        let records: Vec<_> = session
            .items
            .iter()
            .filter(|i| matches!(i, SuggestionItem::Record(_)))
            .collect();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_stale_errors_are_ignored() {
        let table = table();
        let ctx = ctx(&table);
        let mut session = SuggestionSession::open(TriggerKind::Global, 1, &ctx);

        let stale = session.set_filter("ad", &ctx).unwrap();
        session.set_filter("ada", &ctx).unwrap();

        assert!(!session.apply_search_error(stale.generation, "boom"));
        assert!(session.search_error.is_none());
    }

    #[test]
    fn test_fuzzy_match_prefers_prefixes() {
        assert!(fuzzy_match("Au", "Author").is_some());
        assert!(fuzzy_match("Au", "Abstract").is_none());
        assert!(fuzzy_match("au", "AUTHOR").is_some());
        assert!(fuzzy_match("", "anything").is_some());

        let prefix = fuzzy_match("ab", "Abstract").unwrap();
        let scattered = fuzzy_match("ab", "Alphabet").unwrap();
        assert!(prefix > scattered);
    }
}
