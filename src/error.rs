use std::io;

/// Errors produced while parsing or traversing an exFAT volume.
#[derive(Debug, thiserror::Error)]
pub enum ExfatError {
    #[error("jump-boot value not correct: {0:02x?}")]
    InvalidJumpBoot([u8; 3]),
    #[error("filesystem name not correct: {0:02x?}")]
    InvalidFilesystemName([u8; 8]),
    #[error("must-be-zero field not all zeros")]
    NonZeroMustBeZero,
    #[error("boot-signature not correct: {0:#06x}")]
    InvalidBootSignature(u16),
    #[error("extended boot-signature not correct: {0:#010x}")]
    InvalidExtendedBootSignature(u32),
    #[error("unsupported filesystem revision: {major}.{minor:02}")]
    UnsupportedRevision { major: u8, minor: u8 },
    #[error("bytes-per-sector shift out of range (9..=12): ({0})")]
    InvalidBytesPerSectorShift(u8),
    #[error("sectors-per-cluster shift out of range (0..={1}): ({0})")]
    InvalidSectorsPerClusterShift(u8, u8),
    #[error("FAT media-type not correct: ({0:#010x}) -> ({1:#04x})")]
    InvalidFatMediaType(u32, u8),
    #[error("second FAT entry has unexpected value: {0:#010x}")]
    InvalidFatSentinel(u32),
    #[error("unknown directory-entry type: code=({code}) critical=[{critical}] primary=[{primary}]")]
    UnknownEntryType {
        code: u8,
        critical: bool,
        primary: bool,
    },
    #[error("boot sectors not loaded yet")]
    BootSectorsNotLoaded,
    #[error("boot-sector header says to use the second FAT but only one FAT is present")]
    SecondFatUnavailable,
    #[error("cluster number can not be less than two: ({0})")]
    ClusterNumberTooLow(u32),
    #[error("cluster number exceeds FAT bounds: ({0}) with cluster-count ({1})")]
    ClusterOutOfBounds(u32, u32),
    #[error("cluster ({0}) is marked bad in the FAT")]
    BadCluster(u32),
    #[error("sector index exceeds the sectors per cluster: ({0}) >= ({1})")]
    SectorIndexOutOfBounds(u32, u32),
    #[error("calculated cluster-heap offset does not match the boot sector: sector ({actual_sector}) offset ({actual_offset}) != ({expected_sector})")]
    ClusterHeapMisaligned {
        actual_sector: u64,
        actual_offset: u64,
        expected_sector: u32,
    },
    #[error("byte offset arithmetic overflowed")]
    OffsetOverflow,
    #[error("byte source ended before the requested read completed")]
    Truncated,
    #[error("written bytes do not equal the data-size: ({written}) != ({expected})")]
    SizeMismatch { written: u64, expected: u64 },
    #[error("found node but the path parts were not exhausted")]
    DanglingPathParts,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExfatError {
    /// Folds a short read into the dedicated [`ExfatError::Truncated`] kind.
    pub(crate) fn from_read(err: io::Error) -> ExfatError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ExfatError::Truncated
        } else {
            ExfatError::Io(err)
        }
    }
}
