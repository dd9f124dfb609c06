//! Read-only access to exFAT filesystem images.
//!
//! Given a random-access byte source holding an exFAT volume (typically a
//! file), this crate parses the on-disk metadata and exposes the directory
//! tree and file contents without a mount or kernel driver:
//!
//! - [`VolumeReader`] parses the boot regions and FATs and reads clusters,
//! - [`Navigator`] assembles and indexes the entry sets of one directory,
//! - [`Tree`] lazily materializes the directory tree and resolves paths,
//! - [`VolumeReader::write_from_cluster_chain`] extracts file contents.
//!
//! The engine is strictly read-only. Filename matching is case-sensitive;
//! the Up-case table and the Allocation Bitmap are parsed as entries but
//! not interpreted.

pub mod boot;
pub mod cluster;
pub mod disk;
pub mod entry;
pub mod error;
pub mod fat;
pub mod navigator;
pub mod tree;
mod unicode;
pub mod volume;

pub use boot::sector::{BootSectorHeader, FileSystemRevision, VolumeFlags};
pub use cluster::{Cluster, Walk};
pub use disk::ReadSeek;
pub use entry::{
    DirectoryEntry, EntryType, FileAttributes, FileEntry, GeneralSecondaryFlags,
    StreamExtensionEntry,
};
pub use error::ExfatError;
pub use fat::{Fat, FatEntry};
pub use navigator::{DirectoryEntryIndex, EntrySet, Navigator};
pub use tree::{Tree, TreeNode, PATH_SEPARATOR};
pub use volume::VolumeReader;
