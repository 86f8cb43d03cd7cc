//! # Editor State
//!
//! The tree plus the selection, immutable per version. Applying a
//! transaction yields a brand-new state; the previous one stays valid
//! until dropped, so a failed transaction can never leave a torn update.

use serde::{Deserialize, Serialize};

use pubweave_model::{Element, Node, Schema};

use crate::errors::TxResult;
use crate::transaction::{Mapping, Transaction};

/// A single position or range referencing the current tree version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.head
    }

    /// Carry the selection across a transaction
    pub fn map_through(&self, mapping: &Mapping) -> Self {
        Self {
            anchor: mapping.map(self.anchor),
            head: mapping.map(self.head),
        }
    }
}

/// One immutable version of the edited document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorState {
    pub doc: Element,
    pub selection: Selection,
    /// Increments on each applied transaction
    pub version: u64,
}

impl EditorState {
    pub fn new(doc: Element) -> Self {
        Self {
            doc,
            selection: Selection::caret(0),
            version: 0,
        }
    }

    /// Apply a transaction, producing the next version and the mapping
    /// that carries old positions into it.
    ///
    /// Steps run against a cloned tree; any rejection leaves `self` as the
    /// current version with nothing mutated.
    pub fn apply(&self, schema: &Schema, tr: &Transaction) -> TxResult<(EditorState, Mapping)> {
        let mut doc = self.doc.clone();
        let mut maps = Vec::with_capacity(tr.steps.len());
        for step in &tr.steps {
            maps.push(step.apply(schema, &mut doc)?);
        }
        let mapping = Mapping::new(maps);
        let selection = tr
            .selection
            .unwrap_or_else(|| self.selection.map_through(&mapping));

        Ok((
            EditorState {
                doc,
                selection,
                version: self.version + 1,
            },
            mapping,
        ))
    }

    /// Caret position for a fresh document: inside the first text block
    /// when there is one
    pub fn default_caret(schema: &Schema, doc: &Element) -> Selection {
        match doc.content.first() {
            Some(Node::Element(el)) if schema.is_textblock(&el.type_name) => Selection::caret(1),
            _ => Selection::caret(0),
        }
    }
}
