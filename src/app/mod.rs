//! The session layer: the operation surface collaborators call into.
//!
//! Every operation is a method on [`Session`], which carries the open
//! collection, its settings and navigation state explicitly.

pub mod collection;
pub mod editor;
pub mod folders;
pub mod notes;
pub mod session;
pub mod state;

pub use editor::{BufferEditor, Editor};
pub use notes::NoteMetadata;
pub use session::Session;
pub use state::NavigationState;
