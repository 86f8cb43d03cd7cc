//! # Engine Facade
//!
//! One logical owner for the whole editing session: it applies
//! transactions strictly sequentially, recomputes overlays after each
//! one, routes keystrokes through the suggestion machine, and drives the
//! two asynchronous host callbacks. The environment (host, record types,
//! owning record) is explicit engine state threaded through every call,
//! never a global.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use pubweave_model::{
    build_embedding, empty_paragraph, Element, EmbedContext, IdGenerator, Node, RecordType,
    RecordTypeTable, Schema, ATTR_ID,
};
use pubweave_overlay::{compute_overlays, Overlay, OverlayEnv, OverlayIntent};

use crate::errors::{EngineError, TransactionError};
use crate::extract::{extract, FieldUpdates};
use crate::host::Host;
use crate::inspector::{self, ActiveNode, FieldDescriptor, OverlayGeometry, PanelState};
use crate::state::{EditorState, Selection};
use crate::suggest::{
    CandidateContext, SearchRequest, SuggestionSession, SuggestionState, TriggerKind,
};
use crate::transaction::{Step, Transaction};

/// What the host supplies at construction
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Serialized tree; `None` starts from a single empty paragraph
    pub initial_document: Option<Value>,
    pub record_types: Vec<RecordType>,
    /// The record owning the edited document
    pub parent_pub_id: String,
    pub parent_pub_type_id: String,
}

/// Keystrokes the engine interprets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
    Backspace,
    Blur,
}

pub struct Engine<H: Host> {
    schema: Schema,
    record_types: RecordTypeTable,
    parent_pub_id: String,
    parent_pub_type_id: String,
    ids: IdGenerator,
    state: EditorState,
    suggestion: Option<SuggestionSession>,
    panel: PanelState,
    overlays: Vec<Overlay>,
    host: H,
}

impl<H: Host> Engine<H> {
    pub fn new(config: EngineConfig, host: H) -> Result<Self, EngineError> {
        let schema = Schema::default_document_schema()?;
        let record_types = RecordTypeTable::from_types(config.record_types)?;

        let doc: Element = match config.initial_document {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| EngineError::Deserialize(e.to_string()))?,
            None => Element::new("doc").with_child(empty_paragraph()),
        };
        schema.validate_element(&doc)?;

        let selection = EditorState::default_caret(&schema, &doc);
        let mut state = EditorState::new(doc);
        state.selection = selection;

        let ids = IdGenerator::new(&config.parent_pub_id);
        let overlays = compute_overlays(
            &schema,
            &state.doc,
            &OverlayEnv {
                parent_pub_id: &config.parent_pub_id,
                record_types: &record_types,
            },
        );

        Ok(Self {
            schema,
            record_types,
            parent_pub_id: config.parent_pub_id,
            parent_pub_type_id: config.parent_pub_type_id,
            ids,
            state,
            suggestion: None,
            panel: PanelState::default(),
            overlays,
            host,
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn suggestion(&self) -> Option<&SuggestionSession> {
        self.suggestion.as_ref()
    }

    /// Snapshot of the menu for the host UI
    pub fn suggestion_state(&self) -> SuggestionState {
        self.suggestion
            .as_ref()
            .map(SuggestionSession::state)
            .unwrap_or_else(SuggestionState::closed)
    }

    /// Apply one transaction: the new version fully supersedes the
    /// current one, overlays recompute, ephemeral positions are carried
    /// over, and the host is notified.
    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), EngineError> {
        let (next, mapping) = self.state.apply(&self.schema, &tr)?;
        self.state = next;

        if let Some(session) = &mut self.suggestion {
            session.trigger_pos = mapping.map(session.trigger_pos);
        }
        if let Some(active) = &mut self.panel.active {
            active.pos = mapping.map(active.pos);
        }

        self.overlays = compute_overlays(
            &self.schema,
            &self.state.doc,
            &OverlayEnv {
                parent_pub_id: &self.parent_pub_id,
                record_types: &self.record_types,
            },
        );

        debug!(
            version = self.state.version,
            steps = tr.steps.len(),
            "transaction applied"
        );
        self.host.on_change(&self.state);
        Ok(())
    }

    /// Route one keystroke. Returns a search request when the suggestion
    /// machine wants the host to run one.
    pub fn handle_key(&mut self, key: Key) -> Result<Option<SearchRequest>, EngineError> {
        match key {
            Key::Char(c) => self.handle_char(c),
            Key::ArrowDown => {
                if let Some(session) = &mut self.suggestion {
                    session.arrow_down();
                }
                Ok(None)
            }
            Key::ArrowUp => {
                if let Some(session) = &mut self.suggestion {
                    session.arrow_up();
                }
                Ok(None)
            }
            Key::Enter => {
                if self.suggestion.is_some() {
                    self.commit_suggestion()?;
                }
                Ok(None)
            }
            Key::Escape | Key::Blur => {
                self.close_suggestion();
                Ok(None)
            }
            Key::Backspace => self.handle_backspace(),
        }
    }

    fn handle_char(&mut self, c: char) -> Result<Option<SearchRequest>, EngineError> {
        let from = self.state.selection.from();
        let to = self.state.selection.to();
        let tr = Transaction::new()
            .step(Step::Replace {
                from,
                to,
                nodes: vec![Node::text(c.to_string())],
            })
            .with_selection(Selection::caret(from + 1));
        self.dispatch(tr)?;

        let record_types = &self.record_types;
        let current_type = record_types.get(&self.parent_pub_type_id);
        let ctx = CandidateContext {
            record_types,
            current_type,
        };

        if let Some(session) = &mut self.suggestion {
            let filter = format!("{}{}", session.filter, c);
            return Ok(session.set_filter(filter, &ctx));
        }

        if let Some(kind) = TriggerKind::from_char(c) {
            self.suggestion = Some(SuggestionSession::open(kind, from, &ctx));
            debug!(pos = from, "suggestion opened");
        }
        Ok(None)
    }

    fn handle_backspace(&mut self) -> Result<Option<SearchRequest>, EngineError> {
        let sel = self.state.selection;
        let (from, to) = if sel.is_caret() {
            if sel.head == 0 {
                return Ok(None);
            }
            (sel.head - 1, sel.head)
        } else {
            (sel.from(), sel.to())
        };

        let tr = Transaction::delete(from, to).with_selection(Selection::caret(from));
        match self.dispatch(tr) {
            Ok(()) => {}
            // deleting across block boundaries is a join, which the host
            // widget handles; the engine treats it as a no-op
            Err(EngineError::Transaction(TransactionError::RangeNotAligned { .. }))
            | Err(EngineError::Transaction(TransactionError::InvalidStructure(_))) => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let caret = self.state.selection.head;
        let record_types = &self.record_types;
        let current_type = record_types.get(&self.parent_pub_type_id);
        let ctx = CandidateContext {
            record_types,
            current_type,
        };

        let mut closed = false;
        let mut request = None;
        if let Some(session) = &mut self.suggestion {
            if caret <= session.trigger_pos || session.filter.is_empty() {
                closed = true;
            } else {
                let mut filter = session.filter.clone();
                filter.pop();
                request = session.set_filter(filter, &ctx);
            }
        }
        if closed {
            self.close_suggestion();
        }
        Ok(request)
    }

    /// Enter: replace the trigger-to-caret range with one embedding node
    /// built from the selected candidate.
    fn commit_suggestion(&mut self) -> Result<(), EngineError> {
        let Some(session) = self.suggestion.take() else {
            return Ok(());
        };
        let Some(item) = session.selected().cloned() else {
            debug!("suggestion committed with no candidate; closed");
            return Ok(());
        };

        let target = item.target();
        let caret = self.state.selection.head;

        let ids = &mut self.ids;
        let host = &self.host;
        let lookup = move |id: &str| host.get_record(id);
        let element = build_embedding(
            &self.record_types,
            &target,
            EmbedContext {
                parent_pub_id: &self.parent_pub_id,
                parent_pub_type_id: &self.parent_pub_type_id,
            },
            ids,
            &lookup,
        )?;

        let tr = Transaction::replace(session.trigger_pos, caret, vec![Node::Element(element)]);
        self.dispatch(tr)
    }

    /// Insert an embedding node for `target` at a position, outside any
    /// suggestion session. The node's binding attributes and content land
    /// in one transaction; an unresolvable record type aborts with the
    /// tree unchanged.
    pub fn insert_embedding(
        &mut self,
        target: &pubweave_model::EmbedTarget,
        at: usize,
    ) -> Result<(), EngineError> {
        let ids = &mut self.ids;
        let host = &self.host;
        let lookup = move |id: &str| host.get_record(id);
        let element = build_embedding(
            &self.record_types,
            target,
            EmbedContext {
                parent_pub_id: &self.parent_pub_id,
                parent_pub_type_id: &self.parent_pub_type_id,
            },
            ids,
            &lookup,
        )?;
        self.dispatch(Transaction::replace(at, at, vec![Node::Element(element)]))
    }

    /// Escape/blur/commit: all suggestion state goes away; a search still
    /// in flight will fail the staleness check on arrival.
    fn close_suggestion(&mut self) {
        if self.suggestion.take().is_some() {
            debug!("suggestion closed");
        }
    }

    /// Run one host search for the suggestion menu. The response applies
    /// only while it still corresponds to the most recent request.
    pub async fn run_search(&mut self, request: SearchRequest) -> Result<(), EngineError> {
        let future = self.host.search_records(&request.filter);
        let outcome = future.await;

        let Some(session) = &mut self.suggestion else {
            debug!(
                generation = request.generation,
                "search response after session closed; discarded"
            );
            return Ok(());
        };
        match outcome {
            Ok(records) => {
                if !session.apply_search_results(request.generation, records) {
                    warn!(
                        generation = request.generation,
                        current = session.generation(),
                        "stale search response discarded"
                    );
                }
            }
            Err(err) => {
                if session.apply_search_error(request.generation, err.to_string()) {
                    warn!("record search failed: {err}");
                }
            }
        }
        Ok(())
    }

    /// Reducer for overlay click messages
    pub fn apply_intent(&mut self, intent: OverlayIntent) -> Result<(), EngineError> {
        match intent {
            OverlayIntent::Select { pos } => {
                self.dispatch(Transaction::selection_only(Selection::caret(pos)))?;
                let node_id = self
                    .state
                    .doc
                    .node_at(&self.schema, pos)
                    .and_then(Node::as_element)
                    .and_then(|el| el.attr_str(ATTR_ID))
                    .map(str::to_string);
                self.panel.active = Some(ActiveNode {
                    pos,
                    node_id,
                    geometry: None,
                });
                self.panel.upload_error = None;
            }
        }
        Ok(())
    }

    pub fn set_panel_geometry(&mut self, geometry: OverlayGeometry) {
        if let Some(active) = &mut self.panel.active {
            active.geometry = Some(geometry);
        }
    }

    /// Editable descriptors for the active node, empty when nothing is
    /// active any more
    pub fn active_fields(&self) -> Vec<FieldDescriptor> {
        let Some(active) = &self.panel.active else {
            return Vec::new();
        };
        match self.state.doc.node_at(&self.schema, active.pos) {
            Some(node) => inspector::fields_for(&self.schema, node),
            None => Vec::new(),
        }
    }

    /// Commit one attribute of the active node. `Ok(false)` means the
    /// node is gone and the commit was a no-op.
    pub fn commit_attr(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<bool, EngineError> {
        let Some(active) = self.panel.active.clone() else {
            return Ok(false);
        };
        match inspector::commit_attr(
            &self.schema,
            &self.state.doc,
            active.pos,
            active.node_id.as_deref(),
            key,
            value,
        ) {
            Some(tr) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn commit_mark_attr(
        &mut self,
        mark_index: usize,
        key: impl Into<String>,
        value: Value,
    ) -> Result<bool, EngineError> {
        let Some(active) = self.panel.active.clone() else {
            return Ok(false);
        };
        match inspector::commit_mark_attr(
            &self.schema,
            &self.state.doc,
            active.pos,
            mark_index,
            key,
            value,
        ) {
            Some(tr) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn commit_data_attr(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<bool, EngineError> {
        let Some(active) = self.panel.active.clone() else {
            return Ok(false);
        };
        match inspector::commit_data_attr(
            &self.schema,
            &self.state.doc,
            active.pos,
            active.node_id.as_deref(),
            key,
            value,
        ) {
            Some(tr) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Upload a media asset for the active node. Success commits the
    /// `src` attribute through the ordinary attribute contract; failure
    /// is surfaced in the panel and the node stays incomplete for retry.
    pub async fn upload(&mut self, file_name: &str) -> Result<bool, EngineError> {
        let Some(active) = self.panel.active.clone() else {
            return Ok(false);
        };

        let future = self.host.upload(file_name);
        match future.await {
            Ok(url) => {
                self.panel.upload_error = None;
                match inspector::commit_attr(
                    &self.schema,
                    &self.state.doc,
                    active.pos,
                    active.node_id.as_deref(),
                    "src",
                    Value::from(url),
                ) {
                    Some(tr) => {
                        self.dispatch(tr)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            Err(err) => {
                warn!("upload failed: {err}");
                self.panel.upload_error = Some(err.to_string());
                Ok(false)
            }
        }
    }

    /// Walk the tree once and return per-record field updates for the
    /// host to persist
    pub fn extract_updates(&self) -> BTreeMap<String, FieldUpdates> {
        extract(&self.schema, &self.state.doc, &self.parent_pub_id)
    }
}
