// Enumerating and indexing the entries of a single directory.

use std::collections::HashMap;

use log::{debug, trace};

use crate::cluster::Walk;
use crate::disk::ReadSeek;
use crate::entry::{
    DirectoryEntry, EntryType, FileEntry, StreamExtensionEntry, DIRECTORY_ENTRY_SIZE,
    FILE_NAME_CAPACITY,
};
use crate::error::ExfatError;
use crate::unicode::utf16_from_bytes;
use crate::volume::VolumeReader;

/// Knows how to enumerate and index the entries of a single directory.
pub struct Navigator<'a, R> {
    er: &'a mut VolumeReader<R>,
    first_cluster: u32,
}

impl<'a, R: ReadSeek> Navigator<'a, R> {
    pub fn new(er: &'a mut VolumeReader<R>, first_cluster: u32) -> Navigator<'a, R> {
        Navigator { er, first_cluster }
    }

    /// Enumerates each primary directory entry along with the secondary
    /// entries it declares.
    ///
    /// The directory's clusters are visited adjacently rather than through
    /// the FAT; a directory is one contiguous series of entries and the
    /// end-of-directory marker terminates the walk. Unused/deleted slots are
    /// skipped. A primary that declares no secondaries is delivered
    /// immediately with an empty slice.
    pub fn enumerate_entries<F>(&mut self, mut cb: F) -> Result<(), ExfatError>
    where
        F: FnMut(&DirectoryEntry, &[DirectoryEntry]) -> Result<(), ExfatError>,
    {
        let mut pending: Option<(DirectoryEntry, usize)> = None;
        let mut secondaries: Vec<DirectoryEntry> = Vec::new();
        let mut done = false;

        self.er
            .enumerate_clusters(self.first_cluster, false, |er, cluster| {
                er.enumerate_sectors(cluster, |_, data| {
                    for slot in data.chunks_exact(DIRECTORY_ENTRY_SIZE) {
                        let entry_type = EntryType(slot[0]);

                        // The terminal record ends the whole traversal.
                        if entry_type.is_end_of_directory() {
                            done = true;
                            return Ok(Walk::Stop);
                        }

                        if entry_type.is_unused_marker() {
                            continue;
                        }

                        let slot: &[u8; DIRECTORY_ENTRY_SIZE] =
                            slot.try_into().map_err(|_| ExfatError::Truncated)?;
                        let de = DirectoryEntry::parse(slot)?;
                        trace!("entry: {de}");

                        if entry_type.is_primary() {
                            secondaries.clear();
                            match de.secondary_count() {
                                Some(count) if count > 0 => {
                                    pending = Some((de, count as usize));
                                }
                                _ => {
                                    pending = None;
                                    cb(&de, &[])?;
                                }
                            }
                        } else {
                            secondaries.push(de);
                            let complete = matches!(
                                &pending,
                                Some((_, count)) if secondaries.len() == *count
                            );
                            if complete {
                                if let Some((primary, _)) = pending.take() {
                                    cb(&primary, &secondaries)?;
                                }
                                secondaries.clear();
                            }
                        }
                    }

                    Ok(Walk::Continue)
                })?;

                Ok(if done { Walk::Stop } else { Walk::Continue })
            })
    }

    /// Builds the index for this directory: every delivered entry set binned
    /// under its primary's kind name, in on-disk order, with each File set's
    /// complete filename precomputed.
    pub fn index(&mut self) -> Result<DirectoryEntryIndex, ExfatError> {
        let mut sets: HashMap<&'static str, Vec<EntrySet>> = HashMap::new();

        self.enumerate_entries(|primary, secondaries| {
            let mut set = EntrySet {
                primary: *primary,
                secondaries: secondaries.to_vec(),
                complete_filename: None,
            };

            if primary.as_file().is_some() {
                let stream = secondaries
                    .iter()
                    .find_map(DirectoryEntry::as_stream_extension);
                if let Some(stream) = stream {
                    set.complete_filename = Some(complete_filename(stream, secondaries));
                }
            }

            sets.entry(primary.kind_name()).or_default().push(set);
            Ok(())
        })?;

        debug!(
            "directory at cluster ({}) indexed: ({}) kinds",
            self.first_cluster,
            sets.len()
        );

        Ok(DirectoryEntryIndex { sets })
    }
}

/// Joins a set's File Name fragments into the complete filename.
///
/// Fragments contribute in encounter order, bounded by the Stream
/// Extension's total code-unit count.
fn complete_filename(stream: &StreamExtensionEntry, secondaries: &[DirectoryEntry]) -> String {
    let mut remaining = stream.name_length() as usize;
    let mut filename = String::with_capacity(remaining);

    for entry in secondaries {
        if remaining == 0 {
            break;
        }
        if let Some(fragment) = entry.as_file_name() {
            let take = remaining.min(FILE_NAME_CAPACITY);
            filename.push_str(&utf16_from_bytes(fragment.file_name(), take));
            remaining -= take;
        }
    }

    filename
}

/// One primary entry together with the secondary entries it declared, plus
/// the precomputed filename for File sets.
#[derive(Clone, Debug)]
pub struct EntrySet {
    pub primary: DirectoryEntry,
    pub secondaries: Vec<DirectoryEntry>,
    pub complete_filename: Option<String>,
}

impl EntrySet {
    /// The set's Stream Extension entry, when it has one.
    pub fn stream_extension(&self) -> Option<&StreamExtensionEntry> {
        self.secondaries
            .iter()
            .find_map(DirectoryEntry::as_stream_extension)
    }
}

/// All indexed entry sets of one directory, keyed by the primary's kind
/// name, each list in on-disk order.
#[derive(Clone, Debug, Default)]
pub struct DirectoryEntryIndex {
    sets: HashMap<&'static str, Vec<EntrySet>>,
}

impl DirectoryEntryIndex {
    /// Number of distinct entry kinds present.
    pub fn kind_count(&self) -> usize {
        self.sets.len()
    }

    /// The kind names present, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.sets.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// The entry sets recorded under `kind`, in on-disk order.
    pub fn sets_of(&self, kind: &str) -> &[EntrySet] {
        self.sets.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All filenames in the directory mapped to whether they are
    /// directories.
    pub fn filenames(&self) -> HashMap<String, bool> {
        self.sets_of("File")
            .iter()
            .filter_map(|set| {
                let filename = set.complete_filename.clone()?;
                let fde = set.primary.as_file()?;
                Some((filename, fde.file_attributes().is_directory()))
            })
            .collect()
    }

    /// Number of File entry sets in the directory.
    pub fn file_count(&self) -> usize {
        self.sets_of("File").len()
    }

    /// The `i`-th file's name and File entry, in on-disk order.
    pub fn get_file(&self, i: usize) -> Option<(&str, &FileEntry)> {
        let set = self.sets_of("File").get(i)?;
        let filename = set.complete_filename.as_deref()?;
        Some((filename, set.primary.as_file()?))
    }

    /// The entry set for the given filename.
    pub fn find_file(&self, filename: &str) -> Option<&EntrySet> {
        self.sets_of("File")
            .iter()
            .find(|set| set.complete_filename.as_deref() == Some(filename))
    }

    /// The `i`-th occurrence of the given kind within the named file's entry
    /// set.
    ///
    /// Kind names never collide between primary and secondary entries, so a
    /// primary kind with a non-zero `i` is a caller mistake.
    pub fn find_entry(&self, filename: &str, kind: &str, i: usize) -> Option<&DirectoryEntry> {
        let set = self.find_file(filename)?;

        if set.primary.kind_name() == kind {
            assert_eq!(
                i, 0,
                "index must be zero when searching for a primary directory-entry type: [{kind}]"
            );
            return Some(&set.primary);
        }

        let mut hits = 0;
        for de in &set.secondaries {
            if de.kind_name() == kind {
                if hits == i {
                    return Some(de);
                }
                hits += 1;
            }
        }

        None
    }

    /// The File entry for the given filename.
    pub fn find_file_entry(&self, filename: &str) -> Option<&FileEntry> {
        self.find_entry(filename, "File", 0)?.as_file()
    }

    /// The Stream Extension entry for the given filename.
    pub fn find_stream_extension(&self, filename: &str) -> Option<&StreamExtensionEntry> {
        self.find_entry(filename, "StreamExtension", 0)?
            .as_stream_extension()
    }

    /// The decoded volume label, when the directory carries one.
    pub fn label(&self) -> Option<String> {
        self.sets_of("VolumeLabel").first().map(|set| {
            let DirectoryEntry::VolumeLabel(label) = &set.primary else {
                return String::new();
            };
            label.label()
        })
    }

    /// Prints the index contents.
    pub fn dump(&self) {
        println!("Directory Entry Index");
        println!("=====================");
        println!();

        for kind in self.kinds() {
            println!("{kind}");
            println!("{}", "-".repeat(kind.len()));
            println!();

            for (i, set) in self.sets_of(kind).iter().enumerate() {
                println!("# {i}");
                println!();
                println!("  Primary: {}", set.primary);

                for (j, secondary) in set.secondaries.iter().enumerate() {
                    println!("  Secondary ({j}): {secondary}");
                }

                if let Some(filename) = &set.complete_filename {
                    println!();
                    println!("  Filename: {filename}");
                }

                println!();
            }
        }
    }
}
