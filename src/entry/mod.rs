// Directory entries: the 32-byte slot records and their type-byte dispatch.
// http://ntfs.com/exfat-directory-structure.htm

use std::fmt;

use bytemuck::AnyBitPattern;

use crate::error::ExfatError;
use crate::unicode::utf16_from_bytes;

pub mod timestamp;

use timestamp::{ExfatTimestamp, Timestamp, Timestamps, UtcOffset};

/// Every directory entry occupies exactly this many bytes.
pub const DIRECTORY_ENTRY_SIZE: usize = 32;

/// UTF-16 code units carried by one File Name fragment.
pub const FILE_NAME_CAPACITY: usize = 15;

/// The first byte of every directory entry.
///
/// Decomposes into a type-code (bits 0-4), importance (bit 5, cleared =
/// critical), category (bit 6, cleared = primary), and the in-use marker
/// (bit 7).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntryType(pub u8);

impl EntryType {
    /// The all-zero byte terminates the directory.
    pub fn is_end_of_directory(self) -> bool {
        self.0 == 0
    }

    /// Unused/deleted slots carry their type byte with the in-use bit cleared.
    pub fn is_unused_marker(self) -> bool {
        (0x01..=0x7f).contains(&self.0)
    }

    /// A normal, in-use directory entry.
    pub fn is_regular(self) -> bool {
        self.0 >= 0x81
    }

    pub fn type_code(self) -> u8 {
        self.0 & 31
    }

    /// Importance bit; set means benign.
    pub fn type_importance(self) -> bool {
        self.0 & 32 > 0
    }

    pub fn is_critical(self) -> bool {
        !self.type_importance()
    }

    pub fn is_benign(self) -> bool {
        self.type_importance()
    }

    /// Category bit; set means secondary.
    pub fn type_category(self) -> bool {
        self.0 & 64 > 0
    }

    pub fn is_primary(self) -> bool {
        !self.type_category()
    }

    pub fn is_secondary(self) -> bool {
        self.type_category()
    }

    pub fn is_in_use(self) -> bool {
        self.0 & 128 > 0
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntryType<TYPE-CODE=({}) IS-CRITICAL=[{}] IS-PRIMARY=[{}] IS-IN-USE=[{}]>",
            self.type_code(),
            self.is_critical(),
            self.is_primary(),
            self.is_in_use()
        )
    }
}

/// The attribute word carried by File entries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FileAttributes(pub u16);

impl FileAttributes {
    pub fn is_read_only(self) -> bool {
        self.0 & 0x0001 != 0
    }

    pub fn is_hidden(self) -> bool {
        self.0 & 0x0002 != 0
    }

    pub fn is_system(self) -> bool {
        self.0 & 0x0004 != 0
    }

    pub fn is_directory(self) -> bool {
        self.0 & 0x0010 != 0
    }

    pub fn is_archive(self) -> bool {
        self.0 & 0x0020 != 0
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileAttributes<IS-READONLY=[{}] IS-HIDDEN=[{}] IS-SYSTEM=[{}] IS-DIRECTORY=[{}] IS-ARCHIVE=[{}]>",
            self.is_read_only(),
            self.is_hidden(),
            self.is_system(),
            self.is_directory(),
            self.is_archive()
        )
    }
}

/// Flags shared by the secondary entry kinds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneralSecondaryFlags(pub u8);

impl GeneralSecondaryFlags {
    /// Whether this entry can point at a cluster allocation.
    pub fn is_allocation_possible(self) -> bool {
        self.0 & 1 != 0
    }

    /// Whether the allocation is one contiguous series of clusters. When
    /// set, the FAT entries for those clusters are invalid and must not be
    /// consulted.
    pub fn no_fat_chain(self) -> bool {
        self.0 & 2 != 0
    }
}

impl fmt::Display for GeneralSecondaryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeneralSecondaryFlags<IsAllocationPossible=[{}] NoFatChain=[{}]>",
            self.is_allocation_possible(),
            self.no_fat_chain()
        )
    }
}

// Critical primary entry kinds.

/// Points to the cluster run holding the allocation bitmap.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct AllocationBitmapEntry {
    pub(crate) entry_type: u8,
    pub(crate) bitmap_flags: u8,
    pub(crate) _reserved: [u8; 18],
    pub(crate) first_cluster: u32,
    pub(crate) data_length: u64,
}

impl AllocationBitmapEntry {
    pub fn bitmap_flags(&self) -> u8 {
        self.bitmap_flags
    }

    pub fn first_cluster(&self) -> u32 {
        u32::from_le(self.first_cluster)
    }

    pub fn data_length(&self) -> u64 {
        u64::from_le(self.data_length)
    }
}

impl fmt::Display for AllocationBitmapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AllocationBitmapDirectoryEntry<BITMAP-FLAGS=[{:08b}] FIRST-CLUSTER=({}) DATA-LENGTH=({})>",
            self.bitmap_flags(),
            self.first_cluster(),
            self.data_length()
        )
    }
}

/// Points to the cluster run holding the up-case table.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct UpcaseTableEntry {
    pub(crate) entry_type: u8,
    pub(crate) _reserved1: [u8; 3],
    pub(crate) table_checksum: u32,
    pub(crate) _reserved2: [u8; 12],
    pub(crate) first_cluster: u32,
    pub(crate) data_length: u64,
}

impl UpcaseTableEntry {
    pub fn table_checksum(&self) -> u32 {
        u32::from_le(self.table_checksum)
    }

    pub fn first_cluster(&self) -> u32 {
        u32::from_le(self.first_cluster)
    }

    pub fn data_length(&self) -> u64 {
        u64::from_le(self.data_length)
    }
}

impl fmt::Display for UpcaseTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UpcaseTableDirectoryEntry<TABLE-CHECKSUM=[0x{:08x}] FIRST-CLUSTER=({}) DATA-LENGTH=({})>",
            self.table_checksum(),
            self.first_cluster(),
            self.data_length()
        )
    }
}

/// Embeds the volume label.
///
/// The specification nominally splits this into a 22-byte label and 8
/// reserved bytes, but tools in the wild use the combined window, so the
/// full 30 bytes are decoded here.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct VolumeLabelEntry {
    pub(crate) entry_type: u8,
    pub(crate) character_count: u8,
    pub(crate) volume_label: [u8; 30],
}

impl VolumeLabelEntry {
    pub fn character_count(&self) -> u8 {
        self.character_count
    }

    /// The decoded Unicode label.
    pub fn label(&self) -> String {
        utf16_from_bytes(
            &self.volume_label,
            (self.character_count as usize).min(FILE_NAME_CAPACITY),
        )
    }
}

impl fmt::Display for VolumeLabelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VolumeLabelDirectoryEntry<CHARACTER-COUNT=({}) LABEL=[{}]>",
            self.character_count(),
            self.label()
        )
    }
}

/// Describes one file or directory. Always followed by its declared
/// secondary entries (a Stream Extension, then File Name fragments).
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct FileEntry {
    pub(crate) entry_type: u8,
    pub(crate) secondary_count: u8,
    pub(crate) set_checksum: u16,
    pub(crate) file_attributes: u16,
    pub(crate) _reserved1: u16,
    pub(crate) create_timestamp: u32,
    pub(crate) last_modified_timestamp: u32,
    pub(crate) last_accessed_timestamp: u32,
    pub(crate) create_10ms_increment: u8,
    pub(crate) last_modified_10ms_increment: u8,
    pub(crate) create_utc_offset: u8,
    pub(crate) last_modified_utc_offset: u8,
    pub(crate) last_accessed_utc_offset: u8,
    pub(crate) _reserved2: [u8; 7],
}

impl FileEntry {
    pub fn secondary_count(&self) -> u8 {
        self.secondary_count
    }

    pub fn set_checksum(&self) -> u16 {
        u16::from_le(self.set_checksum)
    }

    pub fn file_attributes(&self) -> FileAttributes {
        FileAttributes(u16::from_le(self.file_attributes))
    }

    pub fn create_timestamp(&self) -> Timestamp {
        Timestamp::new(
            ExfatTimestamp(u32::from_le(self.create_timestamp)),
            self.create_10ms_increment,
            UtcOffset(self.create_utc_offset),
        )
    }

    pub fn last_modified_timestamp(&self) -> Timestamp {
        Timestamp::new(
            ExfatTimestamp(u32::from_le(self.last_modified_timestamp)),
            self.last_modified_10ms_increment,
            UtcOffset(self.last_modified_utc_offset),
        )
    }

    pub fn last_accessed_timestamp(&self) -> Timestamp {
        Timestamp::new(
            ExfatTimestamp(u32::from_le(self.last_accessed_timestamp)),
            0,
            UtcOffset(self.last_accessed_utc_offset),
        )
    }

    pub fn timestamps(&self) -> Timestamps {
        Timestamps::new(
            self.create_timestamp(),
            self.last_modified_timestamp(),
            self.last_accessed_timestamp(),
        )
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileDirectoryEntry<SECONDARY-COUNT=({}) CTIME=[{}] MTIME=[{}] ATIME=[{}]>",
            self.secondary_count(),
            self.create_timestamp(),
            self.last_modified_timestamp(),
            self.last_accessed_timestamp()
        )
    }
}

// Benign primary entry kinds.

/// Embeds the volume GUID.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct VolumeGuidEntry {
    pub(crate) entry_type: u8,
    pub(crate) secondary_count: u8,
    pub(crate) set_checksum: u16,
    pub(crate) general_primary_flags: u16,
    pub(crate) volume_guid: [u8; 16],
    pub(crate) _reserved: [u8; 10],
}

impl VolumeGuidEntry {
    pub fn secondary_count(&self) -> u8 {
        self.secondary_count
    }

    pub fn set_checksum(&self) -> u16 {
        u16::from_le(self.set_checksum)
    }

    pub fn general_primary_flags(&self) -> u16 {
        u16::from_le(self.general_primary_flags)
    }

    pub fn volume_guid(&self) -> [u8; 16] {
        self.volume_guid
    }
}

impl fmt::Display for VolumeGuidEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guid = self.volume_guid;
        write!(
            f,
            "VolumeGuidDirectoryEntry<SECONDARY-COUNT=({}) SET-CHECKSUM=(0x{:04x}) GUID=[",
            self.secondary_count(),
            self.set_checksum()
        )?;
        for b in guid {
            write!(f, "{b:02x}")?;
        }
        write!(f, "]>")
    }
}

/// TexFAT padding; not described by the exFAT specification itself.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct TexFatPaddingEntry {
    pub(crate) _reserved: [u8; 32],
}

impl fmt::Display for TexFatPaddingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TexFATPaddingDirectoryEntry<>")
    }
}

// Critical secondary entry kinds.

/// Carries a file's data pointer, sizes, flags, and total filename length.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct StreamExtensionEntry {
    pub(crate) entry_type: u8,
    pub(crate) general_secondary_flags: u8,
    pub(crate) _reserved1: u8,
    pub(crate) name_length: u8,
    pub(crate) name_hash: u16,
    pub(crate) _reserved2: u16,
    pub(crate) valid_data_length: u64,
    pub(crate) _reserved3: u32,
    pub(crate) first_cluster: u32,
    pub(crate) data_length: u64,
}

impl StreamExtensionEntry {
    pub fn general_secondary_flags(&self) -> GeneralSecondaryFlags {
        GeneralSecondaryFlags(self.general_secondary_flags)
    }

    /// Total filename length in UTF-16 code units, across all File Name
    /// fragments of the set.
    pub fn name_length(&self) -> u8 {
        self.name_length
    }

    pub fn name_hash(&self) -> u16 {
        u16::from_le(self.name_hash)
    }

    /// How far into the data stream user data has been written. For
    /// directories this always equals `data_length`.
    pub fn valid_data_length(&self) -> u64 {
        u64::from_le(self.valid_data_length)
    }

    pub fn first_cluster(&self) -> u32 {
        u32::from_le(self.first_cluster)
    }

    pub fn data_length(&self) -> u64 {
        u64::from_le(self.data_length)
    }
}

impl fmt::Display for StreamExtensionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StreamExtensionDirectoryEntry<GENERAL-SECONDARY-FLAGS=({:08b}) NAME-LENGTH=({}) NAME-HASH=(0x{:04x}) VALID-DATA-LENGTH=({}) FIRST-CLUSTER=({}) DATA-LENGTH=({})>",
            self.general_secondary_flags,
            self.name_length(),
            self.name_hash(),
            self.valid_data_length(),
            self.first_cluster(),
            self.data_length()
        )
    }
}

/// One fragment of the owner's filename, up to 15 UTF-16 code units.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct FileNameEntry {
    pub(crate) entry_type: u8,
    pub(crate) general_secondary_flags: u8,
    pub(crate) file_name: [u8; 30],
}

impl FileNameEntry {
    pub fn general_secondary_flags(&self) -> GeneralSecondaryFlags {
        GeneralSecondaryFlags(self.general_secondary_flags)
    }

    pub fn file_name(&self) -> &[u8; 30] {
        &self.file_name
    }
}

impl fmt::Display for FileNameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileNameDirectoryEntry<GENERAL-SECONDARY-FLAGS=({:08b}) FILENAME=[{}]>",
            self.general_secondary_flags,
            utf16_from_bytes(&self.file_name, FILE_NAME_CAPACITY)
        )
    }
}

// Benign secondary entry kinds.

/// Arbitrary vendor information embedded in the entry itself.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct VendorExtensionEntry {
    pub(crate) entry_type: u8,
    pub(crate) general_secondary_flags: u8,
    pub(crate) vendor_guid: [u8; 16],
    pub(crate) vendor_defined: [u8; 14],
}

impl VendorExtensionEntry {
    pub fn general_secondary_flags(&self) -> GeneralSecondaryFlags {
        GeneralSecondaryFlags(self.general_secondary_flags)
    }

    pub fn vendor_guid(&self) -> [u8; 16] {
        self.vendor_guid
    }
}

impl fmt::Display for VendorExtensionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guid = self.vendor_guid;
        write!(f, "VendorExtensionDirectoryEntry<GUID=[")?;
        for b in guid {
            write!(f, "{b:02x}")?;
        }
        write!(f, "]>")
    }
}

/// Points to a cluster run with arbitrary vendor information.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AnyBitPattern)]
pub struct VendorAllocationEntry {
    pub(crate) entry_type: u8,
    pub(crate) general_secondary_flags: u8,
    pub(crate) vendor_guid: [u8; 16],
    pub(crate) vendor_defined: [u8; 2],
    pub(crate) first_cluster: u32,
    pub(crate) data_length: u64,
}

impl VendorAllocationEntry {
    pub fn general_secondary_flags(&self) -> GeneralSecondaryFlags {
        GeneralSecondaryFlags(self.general_secondary_flags)
    }

    pub fn vendor_guid(&self) -> [u8; 16] {
        self.vendor_guid
    }

    pub fn first_cluster(&self) -> u32 {
        u32::from_le(self.first_cluster)
    }

    pub fn data_length(&self) -> u64 {
        u64::from_le(self.data_length)
    }
}

impl fmt::Display for VendorAllocationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guid = self.vendor_guid;
        write!(f, "VendorAllocationDirectoryEntry<GUID=[")?;
        for b in guid {
            write!(f, "{b:02x}")?;
        }
        write!(
            f,
            "] FIRST-CLUSTER=({}) DATA-LENGTH=({})>",
            self.first_cluster(),
            self.data_length()
        )
    }
}

/// Any of the directory-entry kinds the specification defines.
#[derive(Copy, Clone, Debug)]
pub enum DirectoryEntry {
    AllocationBitmap(AllocationBitmapEntry),
    UpcaseTable(UpcaseTableEntry),
    VolumeLabel(VolumeLabelEntry),
    File(FileEntry),
    VolumeGuid(VolumeGuidEntry),
    TexFatPadding(TexFatPaddingEntry),
    StreamExtension(StreamExtensionEntry),
    FileName(FileNameEntry),
    VendorExtension(VendorExtensionEntry),
    VendorAllocation(VendorAllocationEntry),
}

impl DirectoryEntry {
    /// Dispatches one 32-byte slot to its typed record.
    ///
    /// Any in-use slot whose `(type-code, critical, primary)` triple is not
    /// one of the ten defined kinds is an error; extension kinds beyond the
    /// specification abort parsing rather than being skipped.
    pub fn parse(raw: &[u8; DIRECTORY_ENTRY_SIZE]) -> Result<DirectoryEntry, ExfatError> {
        let entry_type = EntryType(raw[0]);
        let raw = raw.as_slice();

        let parsed = match (
            entry_type.type_code(),
            entry_type.is_critical(),
            entry_type.is_primary(),
        ) {
            (1, true, true) => DirectoryEntry::AllocationBitmap(bytemuck::pod_read_unaligned(raw)),
            (2, true, true) => DirectoryEntry::UpcaseTable(bytemuck::pod_read_unaligned(raw)),
            (3, true, true) => DirectoryEntry::VolumeLabel(bytemuck::pod_read_unaligned(raw)),
            (5, true, true) => DirectoryEntry::File(bytemuck::pod_read_unaligned(raw)),
            (0, false, true) => DirectoryEntry::VolumeGuid(bytemuck::pod_read_unaligned(raw)),
            (1, false, true) => DirectoryEntry::TexFatPadding(bytemuck::pod_read_unaligned(raw)),
            (0, true, false) => DirectoryEntry::StreamExtension(bytemuck::pod_read_unaligned(raw)),
            (1, true, false) => DirectoryEntry::FileName(bytemuck::pod_read_unaligned(raw)),
            (0, false, false) => DirectoryEntry::VendorExtension(bytemuck::pod_read_unaligned(raw)),
            (1, false, false) => DirectoryEntry::VendorAllocation(bytemuck::pod_read_unaligned(raw)),
            (code, critical, primary) => {
                return Err(ExfatError::UnknownEntryType {
                    code,
                    critical,
                    primary,
                })
            }
        };

        Ok(parsed)
    }

    /// A unique name for the entry kind; index keys use it.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DirectoryEntry::AllocationBitmap(_) => "AllocationBitmap",
            DirectoryEntry::UpcaseTable(_) => "UpcaseTable",
            DirectoryEntry::VolumeLabel(_) => "VolumeLabel",
            DirectoryEntry::File(_) => "File",
            DirectoryEntry::VolumeGuid(_) => "VolumeGuid",
            DirectoryEntry::TexFatPadding(_) => "TexFATPadding",
            DirectoryEntry::StreamExtension(_) => "StreamExtension",
            DirectoryEntry::FileName(_) => "FileName",
            DirectoryEntry::VendorExtension(_) => "VendorExtension",
            DirectoryEntry::VendorAllocation(_) => "VendorAllocation",
        }
    }

    /// The declared count of trailing secondary entries, for the primary
    /// kinds that carry one.
    pub fn secondary_count(&self) -> Option<u8> {
        match self {
            DirectoryEntry::File(e) => Some(e.secondary_count()),
            DirectoryEntry::VolumeGuid(e) => Some(e.secondary_count()),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            DirectoryEntry::File(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_stream_extension(&self) -> Option<&StreamExtensionEntry> {
        match self {
            DirectoryEntry::StreamExtension(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_file_name(&self) -> Option<&FileNameEntry> {
        match self {
            DirectoryEntry::FileName(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryEntry::AllocationBitmap(e) => e.fmt(f),
            DirectoryEntry::UpcaseTable(e) => e.fmt(f),
            DirectoryEntry::VolumeLabel(e) => e.fmt(f),
            DirectoryEntry::File(e) => e.fmt(f),
            DirectoryEntry::VolumeGuid(e) => e.fmt(f),
            DirectoryEntry::TexFatPadding(e) => e.fmt(f),
            DirectoryEntry::StreamExtension(e) => e.fmt(f),
            DirectoryEntry::FileName(e) => e.fmt(f),
            DirectoryEntry::VendorExtension(e) => e.fmt(f),
            DirectoryEntry::VendorAllocation(e) => e.fmt(f),
        }
    }
}
