use std::io::Write;

use log::debug;

use crate::boot::sector::BootSectorHeader;
use crate::boot::{
    ExtendedBootCode, OemParameters, BOOT_SECTOR_HEADER_SIZE, EXTENDED_BOOT_SECTOR_COUNT,
    OEM_PARAMETER_COUNT, OEM_PARAMETER_SIZE, REQUIRED_EXTENDED_BOOT_SIGNATURE,
};
use crate::cluster::Walk;
use crate::disk::ReadSeek;
use crate::error::ExfatError;
use crate::fat::Fat;

/// One parsed boot region (main or backup).
#[derive(Clone, Debug)]
pub struct BootRegion {
    header: BootSectorHeader,
    extended_boot_code: Vec<ExtendedBootCode>,
    oem_parameters: OemParameters,
}

impl BootRegion {
    pub fn header(&self) -> &BootSectorHeader {
        &self.header
    }

    pub fn extended_boot_code(&self) -> &[ExtendedBootCode] {
        &self.extended_boot_code
    }

    pub fn oem_parameters(&self) -> &OemParameters {
        &self.oem_parameters
    }
}

/// Knows where to find all of the statically-located structures of an exFAT
/// volume, how to parse them, and how to reach clusters and cluster chains.
///
/// The byte source is owned here and borrowed transiently by every walker.
/// Nothing is mutated after [`VolumeReader::parse`] returns.
#[derive(Debug)]
pub struct VolumeReader<R> {
    source: R,
    boot_region: Option<BootRegion>,
    fats: Vec<Fat>,
    active_fat: Option<usize>,
}

impl<R: ReadSeek> VolumeReader<R> {
    pub fn new(source: R) -> VolumeReader<R> {
        VolumeReader {
            source,
            boot_region: None,
            fats: Vec::new(),
            active_fat: None,
        }
    }

    pub(crate) fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// The selected boot region's header.
    pub fn boot_header(&self) -> Result<&BootSectorHeader, ExfatError> {
        self.boot_region
            .as_ref()
            .map(BootRegion::header)
            .ok_or(ExfatError::BootSectorsNotLoaded)
    }

    /// The active boot region (whether main or backup).
    pub fn active_boot_region(&self) -> Result<&BootRegion, ExfatError> {
        self.boot_region
            .as_ref()
            .ok_or(ExfatError::BootSectorsNotLoaded)
    }

    /// The FAT selected by the active-FAT volume flag.
    pub fn active_fat(&self) -> Result<&Fat, ExfatError> {
        let index = self.active_fat.ok_or(ExfatError::BootSectorsNotLoaded)?;
        self.fats.get(index).ok_or(ExfatError::BootSectorsNotLoaded)
    }

    /// The effective sector size, in bytes.
    pub fn sector_size(&self) -> Result<u32, ExfatError> {
        Ok(self.boot_header()?.sector_size())
    }

    /// The effective sectors-per-cluster count.
    pub fn sectors_per_cluster(&self) -> Result<u32, ExfatError> {
        Ok(self.boot_header()?.sectors_per_cluster())
    }

    /// The first cluster of the root directory.
    pub fn first_cluster_of_root_directory(&self) -> Result<u32, ExfatError> {
        Ok(self.boot_header()?.first_cluster_of_root_directory())
    }

    /// The volume serial number.
    pub fn volume_serial_number(&self) -> Result<u32, ExfatError> {
        Ok(self.boot_header()?.volume_serial_number())
    }

    /// Loads all of the main filesystem structures. This is always a small
    /// read (does not scale with the volume size).
    pub fn parse(&mut self) -> Result<(), ExfatError> {
        let boot_region_main = self.parse_boot_region()?;
        let boot_region_backup = self.parse_boot_region()?;

        self.select_boot_region(boot_region_main, boot_region_backup);

        self.parse_fats()?;
        self.select_active_fat()?;
        self.check_cluster_heap_offset()?;

        debug!(
            "volume parsed: {}",
            self.boot_header().map(ToString::to_string).unwrap_or_default()
        );

        Ok(())
    }

    fn read_boot_sector_head(&mut self) -> Result<(BootSectorHeader, u32), ExfatError> {
        let mut raw = [0u8; BOOT_SECTOR_HEADER_SIZE];
        self.source.fill(&mut raw)?;

        let header = BootSectorHeader::decode(&raw);
        header.verify()?;

        // Forward through the excess bytes of over-512-byte sectors.
        let sector_size = header.sector_size();
        let excess = sector_size as u64 - BOOT_SECTOR_HEADER_SIZE as u64;
        if excess != 0 {
            self.source.skip(excess)?;
        }

        Ok((header, sector_size))
    }

    fn read_extended_boot_sector(
        &mut self,
        sector_size: u32,
    ) -> Result<ExtendedBootCode, ExfatError> {
        let mut body = vec![0u8; sector_size as usize - 4];
        self.source.fill(&mut body)?;

        let mut raw = [0u8; 4];
        self.source.fill(&mut raw)?;
        let signature = u32::from_le_bytes(raw);

        if signature != REQUIRED_EXTENDED_BOOT_SIGNATURE {
            return Err(ExfatError::InvalidExtendedBootSignature(signature));
        }

        Ok(ExtendedBootCode(body))
    }

    fn read_oem_parameters(&mut self, sector_size: u32) -> Result<OemParameters, ExfatError> {
        let mut oem_parameters = OemParameters::default();

        for parameter in oem_parameters.parameters.iter_mut() {
            self.source.fill(&mut parameter.parameter)?;
        }

        let remainder = sector_size as u64 - (OEM_PARAMETER_SIZE * OEM_PARAMETER_COUNT) as u64;
        self.source.discard(remainder)?;

        Ok(oem_parameters)
    }

    fn parse_boot_region(&mut self) -> Result<BootRegion, ExfatError> {
        let (header, sector_size) = self.read_boot_sector_head()?;

        let mut extended_boot_code = Vec::with_capacity(EXTENDED_BOOT_SECTOR_COUNT);
        for _ in 0..EXTENDED_BOOT_SECTOR_COUNT {
            extended_boot_code.push(self.read_extended_boot_sector(sector_size)?);
        }

        let oem_parameters = self.read_oem_parameters(sector_size)?;

        // Reserved sector: content ignored.
        self.source.discard(sector_size as u64)?;

        // Boot checksum sector: read and discarded, verification is a
        // non-goal.
        self.source.discard(sector_size as u64)?;

        Ok(BootRegion {
            header,
            extended_boot_code,
            oem_parameters,
        })
    }

    fn select_boot_region(&mut self, main: BootRegion, _backup: BootRegion) {
        // The specification designates the main region as authoritative.
        self.boot_region = Some(main);
    }

    /// Parses `number_of_fats` tables from the region following the boot
    /// regions. Requires the boot sectors to have been read first.
    pub fn parse_fats(&mut self) -> Result<(), ExfatError> {
        let (fat_offset, fat_length, sector_size, cluster_count, number_of_fats) = {
            let header = self.boot_header()?;
            (
                header.fat_offset(),
                header.fat_length(),
                header.sector_size(),
                header.cluster_count(),
                header.number_of_fats(),
            )
        };

        // FAT alignment: boot regions occupy the first 24 sectors.
        let alignment_sectors = (fat_offset as u64)
            .checked_sub(24)
            .ok_or(ExfatError::OffsetOverflow)?;
        self.source.discard(alignment_sectors * sector_size as u64)?;

        let mut fats = Vec::with_capacity(number_of_fats as usize);
        for index in 0..number_of_fats {
            let fat = Fat::parse(&mut self.source, fat_length, sector_size, cluster_count)?;
            debug!("FAT ({index}) parsed with ({}) entries", fat.len());
            fats.push(fat);
        }

        self.fats = fats;
        Ok(())
    }

    fn select_active_fat(&mut self) -> Result<(), ExfatError> {
        let flags = self.boot_header()?.volume_flags();

        let index = if flags.use_first_fat() {
            0
        } else {
            if self.fats.len() != 2 {
                return Err(ExfatError::SecondFatUnavailable);
            }
            1
        };

        debug!("active FAT: ({index})");
        self.active_fat = Some(index);
        Ok(())
    }

    fn check_cluster_heap_offset(&mut self) -> Result<(), ExfatError> {
        let header = self.boot_header()?;
        let sector_size = header.sector_size();
        let cluster_heap_offset = header.cluster_heap_offset();

        let fat_end = header.fat_offset() + header.fat_length() * header.number_of_fats() as u32;
        let alignment_sectors = cluster_heap_offset
            .checked_sub(fat_end)
            .ok_or(ExfatError::OffsetOverflow)?;
        self.source
            .discard(alignment_sectors as u64 * sector_size as u64)?;

        let position = self.source.position()?;
        let actual_sector = position / sector_size as u64;
        let actual_offset = position % sector_size as u64;

        if actual_sector != cluster_heap_offset as u64 || actual_offset != 0 {
            return Err(ExfatError::ClusterHeapMisaligned {
                actual_sector,
                actual_offset,
                expected_sector: cluster_heap_offset,
            });
        }

        Ok(())
    }

    /// Streams a cluster chain's data into `sink`, writing exactly
    /// `data_size` bytes.
    ///
    /// `use_fat` selects between following the active FAT and walking
    /// adjacent clusters; callers derive it from the owning stream's
    /// `no_fat_chain` flag. The final sector is truncated so that exactly
    /// `data_size` bytes come out; a chain that ends short of `data_size`
    /// is an error.
    pub fn write_from_cluster_chain<W: Write>(
        &mut self,
        first_cluster: u32,
        data_size: u64,
        use_fat: bool,
        sink: &mut W,
    ) -> Result<u64, ExfatError> {
        let sector_size = self.sector_size()?;
        let tail_fragment_size = data_size % sector_size as u64;

        let mut written: u64 = 0;
        let mut sector_count: u64 = 0;
        let mut done = false;

        self.enumerate_clusters(first_cluster, use_fat, |er, cluster| {
            er.enumerate_sectors(cluster, |_, data| {
                let mut data = data;

                // The last sector of the stream.
                if (sector_count + 1) * sector_size as u64 > data_size {
                    if tail_fragment_size > 0 {
                        data = &data[..tail_fragment_size as usize];
                    }
                    done = true;
                }

                sink.write_all(data)?;

                written += data.len() as u64;
                sector_count += 1;

                Ok(if done { Walk::Stop } else { Walk::Continue })
            })?;

            Ok(if done { Walk::Stop } else { Walk::Continue })
        })?;

        if written != data_size {
            return Err(ExfatError::SizeMismatch {
                written,
                expected: data_size,
            });
        }

        Ok(written)
    }
}
