//! LFS pointers, object storage and upstream clients.

pub mod client;
pub mod content_store;
pub mod meta;
pub mod pointer;

pub use client::{FilesystemClient, LfsClient, ObjectCallback};
pub use content_store::{pointer_for_bytes, ContentReader, ContentStore, FsContentStore};
pub use meta::{LfsMetaObject, LfsMetaStore};
pub use pointer::{LfsPointer, PointerBlob};
