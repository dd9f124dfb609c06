use std::fmt;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::error::ExfatError;

use super::{
    REQUIRED_BOOT_SIGNATURE, REQUIRED_FILESYSTEM_NAME, REQUIRED_JUMP_BOOT,
};

/// The Main/Backup Boot Sector structure for an exFAT volume.
/// This structure defines the essential parameters required for the file system.
///
/// All multi-byte fields are stored little-endian on disk; the accessors
/// perform the conversion.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BootSectorHeader {
    /// The jump instruction for CPUs to execute bootstrapping instructions in `boot_code`.
    /// - Must be `0xEB 0x76 0x90` in order (low-order byte first).
    pub(crate) jump_boot: [u8; 3],

    /// The name of the file system on the volume.
    /// - Must be `"EXFAT   "` (including three trailing spaces).
    pub(crate) filesystem_name: [u8; 8],

    /// Reserved field corresponding to the FAT12/16/32 BIOS Parameter Block.
    /// - Must be all zeroes to prevent misinterpretation by FAT-based systems.
    pub(crate) must_be_zero: [u8; 53],

    /// The sector offset from the beginning of the media to the partition that contains the exFAT volume.
    /// - A value of `0` indicates that this field should be ignored.
    pub(crate) partition_offset: u64,

    /// The total size of the exFAT volume in sectors.
    pub(crate) volume_length: u64,

    /// The sector offset from the start of the volume to the First FAT.
    /// - Minimum value: `24` (accounts for boot sectors).
    pub(crate) fat_offset: u32,

    /// The number of sectors occupied by each FAT.
    pub(crate) fat_length: u32,

    /// The sector offset from the start of the volume to the Cluster Heap.
    pub(crate) cluster_heap_offset: u32,

    /// The number of clusters in the Cluster Heap.
    pub(crate) cluster_count: u32,

    /// The cluster index of the first cluster of the root directory.
    /// - Must be between `2` (first valid cluster) and `ClusterCount + 1`.
    pub(crate) first_cluster_of_root_directory: u32,

    /// A unique serial number for identifying the volume.
    pub(crate) volume_serial_number: VolumeSerialNumber,

    /// The revision number of the exFAT structures on the volume.
    /// - The low-order byte is the minor version, the high-order byte the major version.
    pub(crate) file_system_revision: FileSystemRevision,

    /// A set of flags that indicate file system status. See [`VolumeFlags`].
    pub(crate) volume_flags: u16,

    /// The sector size in a power-of-two exponent.
    /// - Valid range: `9` (512 bytes) to `12` (4096 bytes).
    pub(crate) bytes_per_sector_shift: u8,

    /// The number of sectors per cluster in a power-of-two exponent.
    /// - Valid range: `0` (1 sector per cluster) to `25 - BytesPerSectorShift`.
    pub(crate) sectors_per_cluster_shift: u8,

    /// The number of File Allocation Tables (FATs) in the volume.
    /// - `1`: Only the First FAT is present.
    /// - `2`: Used in **TexFAT**, which has a Second FAT and a Second Allocation Bitmap.
    pub(crate) number_of_fats: u8,

    /// Extended INT 13h drive number, useful for bootstrapping.
    /// - Typically contains `0x80`.
    pub(crate) drive_select: u8,

    /// The percentage of allocated clusters in the Cluster Heap.
    /// - `0xFF` means the percentage is unknown.
    pub(crate) percent_in_use: u8,

    /// Reserved for future use.
    pub(crate) _reserved: [u8; 7],

    /// The bootstrapping code that is executed if the volume is bootable.
    pub(crate) boot_code: [u8; 390],

    /// Identifies this sector as a boot sector.
    /// - Must be `0xAA55` to be considered valid.
    pub(crate) boot_signature: u16,
}

bitflags! {
    /// A set of flags that indicate file system status.
    #[derive(Copy, Clone, Debug, Default, Ord, PartialOrd, Eq, PartialEq)]
    pub struct VolumeFlags: u16 {
        /// - **Bit 0**: `ActiveFat` (0 = First FAT, 1 = Second FAT used in TexFAT).
        const ACTIVE_FAT = 1 << 0;
        /// - **Bit 1**: `VolumeDirty` (0 = clean, 1 = dirty).
        const VOLUME_DIRTY = 1 << 1;
        /// - **Bit 2**: `MediaFailure` (0 = no failures, 1 = known media failures).
        const MEDIA_FAILURE = 1 << 2;
        /// - **Bit 3**: `ClearToZero` (should be cleared before modifying file system structures).
        const CLEAR_TO_ZERO = 1 << 3;
    }
}

impl VolumeFlags {
    /// Whether the First FAT and First Allocation Bitmap are active.
    pub fn use_first_fat(self) -> bool {
        !self.contains(VolumeFlags::ACTIVE_FAT)
    }

    /// Whether the Second FAT is active. Only valid when `number_of_fats` is 2.
    pub fn use_second_fat(self) -> bool {
        self.contains(VolumeFlags::ACTIVE_FAT)
    }

    /// Whether changes currently need to be flushed.
    pub fn is_dirty(self) -> bool {
        self.contains(VolumeFlags::VOLUME_DIRTY)
    }

    /// Whether media errors have been detected.
    pub fn has_media_failures(self) -> bool {
        self.contains(VolumeFlags::MEDIA_FAILURE)
    }

    /// Whether the clear-to-zero flag is set.
    pub fn clear_to_zero(self) -> bool {
        self.contains(VolumeFlags::CLEAR_TO_ZERO)
    }
}

/// Structure representing the file system revision.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FileSystemRevision {
    /// Minor version of the exFAT file system (low-order byte).
    pub(crate) vermin: u8,
    /// Major version of the exFAT file system (high-order byte).
    pub(crate) vermaj: u8,
}

impl FileSystemRevision {
    pub fn major(self) -> u8 {
        self.vermaj
    }

    pub fn minor(self) -> u8 {
        self.vermin
    }
}

/// Structure representing the unique volume serial number.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct VolumeSerialNumber(pub(crate) u32);

impl VolumeSerialNumber {
    pub fn value(self) -> u32 {
        u32::from_le(self.0)
    }
}

impl BootSectorHeader {
    /// Decodes the fixed 512-byte header layout.
    pub fn decode(raw: &[u8]) -> BootSectorHeader {
        bytemuck::pod_read_unaligned(&raw[..super::BOOT_SECTOR_HEADER_SIZE])
    }

    /// Validates the signature fields and the structure revision.
    ///
    /// Any mismatch is fatal; the caller must not depend on the remaining
    /// fields of a header that fails verification.
    pub fn verify(&self) -> Result<(), ExfatError> {
        if self.jump_boot != REQUIRED_JUMP_BOOT {
            return Err(ExfatError::InvalidJumpBoot(self.jump_boot));
        }
        if self.filesystem_name != REQUIRED_FILESYSTEM_NAME {
            return Err(ExfatError::InvalidFilesystemName(self.filesystem_name));
        }
        if self.must_be_zero.iter().any(|&b| b != 0) {
            return Err(ExfatError::NonZeroMustBeZero);
        }
        if self.boot_signature() != REQUIRED_BOOT_SIGNATURE {
            return Err(ExfatError::InvalidBootSignature(self.boot_signature()));
        }
        if self.file_system_revision.major() != 1 {
            return Err(ExfatError::UnsupportedRevision {
                major: self.file_system_revision.major(),
                minor: self.file_system_revision.minor(),
            });
        }
        if !(9..=12).contains(&self.bytes_per_sector_shift) {
            return Err(ExfatError::InvalidBytesPerSectorShift(
                self.bytes_per_sector_shift,
            ));
        }
        let max_cluster_shift = 25 - self.bytes_per_sector_shift;
        if self.sectors_per_cluster_shift > max_cluster_shift {
            return Err(ExfatError::InvalidSectorsPerClusterShift(
                self.sectors_per_cluster_shift,
                max_cluster_shift,
            ));
        }

        Ok(())
    }

    pub fn partition_offset(&self) -> u64 {
        u64::from_le(self.partition_offset)
    }

    pub fn volume_length(&self) -> u64 {
        u64::from_le(self.volume_length)
    }

    pub fn fat_offset(&self) -> u32 {
        u32::from_le(self.fat_offset)
    }

    pub fn fat_length(&self) -> u32 {
        u32::from_le(self.fat_length)
    }

    pub fn cluster_heap_offset(&self) -> u32 {
        u32::from_le(self.cluster_heap_offset)
    }

    pub fn cluster_count(&self) -> u32 {
        u32::from_le(self.cluster_count)
    }

    pub fn first_cluster_of_root_directory(&self) -> u32 {
        u32::from_le(self.first_cluster_of_root_directory)
    }

    pub fn volume_serial_number(&self) -> u32 {
        self.volume_serial_number.value()
    }

    pub fn file_system_revision(&self) -> FileSystemRevision {
        self.file_system_revision
    }

    pub fn volume_flags(&self) -> VolumeFlags {
        VolumeFlags::from_bits_truncate(u16::from_le(self.volume_flags))
    }

    pub fn bytes_per_sector_shift(&self) -> u8 {
        self.bytes_per_sector_shift
    }

    pub fn sectors_per_cluster_shift(&self) -> u8 {
        self.sectors_per_cluster_shift
    }

    pub fn number_of_fats(&self) -> u8 {
        self.number_of_fats
    }

    pub fn drive_select(&self) -> u8 {
        self.drive_select
    }

    pub fn percent_in_use(&self) -> u8 {
        self.percent_in_use
    }

    pub fn boot_signature(&self) -> u16 {
        u16::from_le(self.boot_signature)
    }

    /// The effective sector size, in bytes.
    pub fn sector_size(&self) -> u32 {
        1 << self.bytes_per_sector_shift
    }

    /// The effective sectors-per-cluster count.
    pub fn sectors_per_cluster(&self) -> u32 {
        1 << self.sectors_per_cluster_shift
    }

    /// The effective cluster size, in bytes.
    pub fn bytes_per_cluster(&self) -> u32 {
        self.sector_size() * self.sectors_per_cluster()
    }

    /// Prints all of the header parameters along with the common calculated
    /// ones.
    pub fn dump(&self) {
        println!("Boot Sector Header");
        println!("==================");
        println!();

        println!("PartitionOffset: ({})", self.partition_offset());
        println!("VolumeLength: ({})", self.volume_length());
        println!("FatOffset: ({})", self.fat_offset());
        println!("FatLength: ({})", self.fat_length());
        println!("ClusterHeapOffset: ({})", self.cluster_heap_offset());
        println!("ClusterCount: ({})", self.cluster_count());
        println!(
            "FirstClusterOfRootDirectory: ({})",
            self.first_cluster_of_root_directory()
        );
        println!("VolumeSerialNumber: (0x{:08x})", self.volume_serial_number());
        println!(
            "FileSystemRevision: (0x{:02x}) (0x{:02x})",
            self.file_system_revision.minor(),
            self.file_system_revision.major()
        );
        println!("BytesPerSectorShift: ({})", self.bytes_per_sector_shift);
        println!(
            "-> Sector-size: 2^({}) -> {}",
            self.bytes_per_sector_shift,
            self.sector_size()
        );
        println!("SectorsPerClusterShift: ({})", self.sectors_per_cluster_shift);
        println!(
            "-> Sectors-per-cluster: 2^({}) -> {}",
            self.sectors_per_cluster_shift,
            self.sectors_per_cluster()
        );
        println!("NumberOfFats: ({})", self.number_of_fats);
        println!("DriveSelect: ({})", self.drive_select);
        println!("PercentInUse: ({})", self.percent_in_use);
        println!();

        let flags = self.volume_flags();
        println!("VolumeFlags: ({})", flags.bits());
        println!("  UseFirstFat: [{}]", flags.use_first_fat());
        println!("  UseSecondFat: [{}]", flags.use_second_fat());
        println!("  IsDirty: [{}]", flags.is_dirty());
        println!("  HasHadMediaFailures: [{}]", flags.has_media_failures());
        println!("  ClearToZero: [{}]", flags.clear_to_zero());
        println!();
    }
}

impl fmt::Display for BootSectorHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BootSector<SN=(0x{:08x}) REVISION=(0x{:02x})-(0x{:02x})>",
            self.volume_serial_number(),
            self.file_system_revision.minor(),
            self.file_system_revision.major()
        )
    }
}
