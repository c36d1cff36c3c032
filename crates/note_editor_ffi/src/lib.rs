//! Flutter bridge entry points for the note editor core.

pub mod api;
