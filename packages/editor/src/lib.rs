//! # Pubweave Editor
//!
//! The interactive core of the embeddable structured-document engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: schema + tree + records + embeds     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: state lifecycle + transactions      │
//! │  - Apply validated steps, version by version│
//! │  - Suggestion machine (trigger → embed)     │
//! │  - Attribute inspector commits              │
//! │  - Extract per-record updates at save time  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ overlay: tree → decoration entries          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is source of truth**: overlays, panels and menus are
//!    derived views, rebuilt from the current version
//! 2. **Strictly sequential**: one owner applies transactions; each new
//!    state fully supersedes the previous one
//! 3. **All-or-nothing**: a rejected step leaves the tree untouched
//! 4. **Implicit cancellation**: late async responses are discarded by a
//!    generation check, the host is never signalled

mod engine;
mod errors;
mod extract;
mod host;
mod inspector;
mod state;
mod suggest;
mod transaction;

pub use engine::{Engine, EngineConfig, Key};
pub use errors::{EngineError, TransactionError, TxResult};
pub use extract::{extract, FieldUpdates};
pub use host::{Host, HostError, HostFuture, SearchFuture, UploadFuture};
pub use inspector::{
    commit_attr, commit_data_attr, commit_mark_attr, fields_for, ActiveNode, FieldDescriptor,
    OverlayGeometry, PanelState,
};
pub use state::{EditorState, Selection};
pub use suggest::{
    fuzzy_match, CandidateContext, SearchRequest, SuggestionItem, SuggestionSession,
    SuggestionState, TriggerKind, GLOBAL_TRIGGER, LOCAL_TRIGGER,
};
pub use transaction::{Mapping, Step, StepMap, Transaction};

// Re-export the model and overlay surfaces hosts touch most
pub use pubweave_model::{
    EmbedTarget, Node, RecordSummary, RecordType, RecordTypeTable, Schema,
};
pub use pubweave_overlay::{compute_overlays, Overlay, OverlayEnv, OverlayIntent, OverlayKind};
