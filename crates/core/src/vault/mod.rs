//! Filesystem I/O for notes: path safety, atomic writes, and vault-wide walking.

pub mod path;
pub mod store;
pub mod walker;

pub use path::{validate_note_path, PathError};
pub use store::{NoteContent, VaultStore, VaultStoreError};
pub use walker::{VaultWalker, VaultWalkerError, WalkedFile};
