// Boot regions: main boot sector, extended boot sectors, OEM parameters.

pub mod sector;

/// The fixed portion of a boot sector, independent of the effective sector
/// size.
pub const BOOT_SECTOR_HEADER_SIZE: usize = 512;

/// Extended boot sectors per boot region.
pub const EXTENDED_BOOT_SECTOR_COUNT: usize = 8;

/// Size of a single OEM parameter record.
pub const OEM_PARAMETER_SIZE: usize = 48;

/// OEM parameter records per boot region.
pub const OEM_PARAMETER_COUNT: usize = 10;

/// Required value of the `jump_boot` field, low-order byte first.
pub const REQUIRED_JUMP_BOOT: [u8; 3] = [0xeb, 0x76, 0x90];

/// Required filesystem name, including three trailing spaces.
pub const REQUIRED_FILESYSTEM_NAME: [u8; 8] = *b"EXFAT   ";

/// Required boot-sector trailing signature.
pub const REQUIRED_BOOT_SIGNATURE: u16 = 0xaa55;

/// Required extended-boot-sector trailing signature.
pub const REQUIRED_EXTENDED_BOOT_SIGNATURE: u32 = 0xaa550000;

/// Index of the first storage-backed cluster.
pub const FIRST_CLUSTER_INDEX: u32 = 2;

/// Boot-strapping instructions carried by one extended boot sector. The body
/// is kept but never interpreted; only the trailing signature is validated.
#[derive(Clone, Debug, Default)]
pub struct ExtendedBootCode(pub Vec<u8>);

/// One OEM parameter record.
#[derive(Clone, Copy, Debug)]
pub struct OemParameter {
    pub parameter: [u8; OEM_PARAMETER_SIZE],
}

impl Default for OemParameter {
    fn default() -> Self {
        Self {
            parameter: [0; OEM_PARAMETER_SIZE],
        }
    }
}

/// The set of OEM parameters in one boot region.
#[derive(Clone, Copy, Debug, Default)]
pub struct OemParameters {
    pub parameters: [OemParameter; OEM_PARAMETER_COUNT],
}
