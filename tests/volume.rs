mod common;

use std::io::Cursor;

use exfat_reader::{ExfatError, VolumeReader, Walk};

use common::*;

#[test]
fn parse_reports_header_fields() {
    let er = parsed_volume();
    let header = er.boot_header().unwrap();

    assert_eq!(header.volume_serial_number(), VOLUME_SERIAL);
    assert_eq!(header.sector_size(), SECTOR_SIZE as u32);
    assert_eq!(header.sectors_per_cluster(), SECTORS_PER_CLUSTER as u32);
    assert_eq!(header.cluster_count(), CLUSTER_COUNT);
    assert_eq!(header.number_of_fats(), 1);
    assert_eq!(header.first_cluster_of_root_directory(), ROOT_CLUSTER);
    assert!(header.volume_flags().use_first_fat());
}

#[test]
fn boot_header_display_line() {
    let er = parsed_volume();
    assert_eq!(
        er.boot_header().unwrap().to_string(),
        "BootSector<SN=(0x3d51a058) REVISION=(0x00)-(0x01)>"
    );
}

#[test]
fn parse_is_deterministic() {
    let first = parsed_volume();
    let second = parsed_volume();

    assert_eq!(
        first.boot_header().unwrap().to_string(),
        second.boot_header().unwrap().to_string()
    );
    assert_eq!(
        first.active_fat().unwrap().len(),
        second.active_fat().unwrap().len()
    );
}

#[test]
fn fat_covers_clusters_from_two() {
    let er = parsed_volume();
    let fat = er.active_fat().unwrap();

    assert_eq!(fat.len(), CLUSTER_COUNT as usize - 1);
    assert_eq!(fat.entry(9).unwrap().value(), 10);
    assert_eq!(fat.entry(10).unwrap().value(), 11);
    assert!(fat.entry(11).unwrap().is_last());
    assert!(fat.entry(0).is_none());
    assert!(fat.entry(1).is_none());
}

#[test]
fn truncated_source_is_fatal() {
    let mut image = build_image();
    image.truncate(1000);

    let mut er = VolumeReader::new(Cursor::new(image));
    let err = er.parse().unwrap_err();
    assert!(matches!(err, ExfatError::Truncated));
}

#[test]
fn truncation_inside_fat_region_is_fatal() {
    let mut image = build_image();
    image.truncate(FAT_OFFSET as usize * SECTOR_SIZE + 100);

    let mut er = VolumeReader::new(Cursor::new(image));
    let err = er.parse().unwrap_err();
    assert!(matches!(err, ExfatError::Truncated));
}

#[test]
fn parse_fats_requires_boot_sectors() {
    let mut er = VolumeReader::new(Cursor::new(build_image()));

    let err = er.parse_fats().unwrap_err();
    assert!(matches!(err, ExfatError::BootSectorsNotLoaded));
    assert_eq!(err.to_string(), "boot sectors not loaded yet");
}

#[test]
fn second_fat_with_one_fat_is_rejected() {
    let result = parsed_volume_with(|image| {
        // Set the active-FAT bit in both boot regions' volume flags.
        image[106] = 1;
        image[12 * SECTOR_SIZE + 106] = 1;
    });

    assert!(matches!(result.unwrap_err(), ExfatError::SecondFatUnavailable));
}

#[test]
fn corrupt_fat_header_slots_are_rejected() {
    let fat_start = FAT_OFFSET as usize * SECTOR_SIZE;

    let err = parsed_volume_with(|image| {
        image[fat_start] = 0xf0;
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::InvalidFatMediaType(_, 0xf0)));

    let err = parsed_volume_with(|image| {
        image[fat_start + 4] = 0x00;
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::InvalidFatSentinel(_)));
}

#[test]
fn corrupt_boot_signatures_are_rejected() {
    let err = parsed_volume_with(|image| {
        image[0] = 0x00;
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::InvalidJumpBoot(_)));

    let err = parsed_volume_with(|image| {
        image[3] = b'N';
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::InvalidFilesystemName(_)));

    let err = parsed_volume_with(|image| {
        image[20] = 0x55;
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::NonZeroMustBeZero));

    // First extended boot sector of the backup region (sector 13).
    let err = parsed_volume_with(|image| {
        image[14 * SECTOR_SIZE - 1] = 0x00;
    })
    .unwrap_err();
    assert!(matches!(err, ExfatError::InvalidExtendedBootSignature(_)));
}

#[test]
fn cluster_walk_from_low_cluster_fails() {
    let mut er = parsed_volume();

    let err = er
        .enumerate_clusters(1, true, |_, _| Ok(Walk::Continue))
        .unwrap_err();
    assert!(matches!(err, ExfatError::ClusterNumberTooLow(1)));

    assert!(matches!(
        er.get_cluster(0).unwrap_err(),
        ExfatError::ClusterNumberTooLow(0)
    ));
}

#[test]
fn fat_walk_yields_in_bounds_clusters() {
    let mut er = parsed_volume();
    let mut visited = Vec::new();

    er.enumerate_clusters(DELAHAYE_FIRST_CLUSTER, true, |_, cluster| {
        visited.push(cluster.number());
        Ok(Walk::Continue)
    })
    .unwrap();

    assert_eq!(visited, vec![9, 10, 11]);
    for &cluster in &visited {
        assert!((2..CLUSTER_COUNT + 2).contains(&cluster));
    }
}

#[test]
fn bad_cluster_in_chain_fails_the_walk() {
    let fat_start = FAT_OFFSET as usize * SECTOR_SIZE;

    let mut er = parsed_volume_with(|image| {
        // Mark cluster 10's slot bad.
        let slot = fat_start + 10 * 4;
        image[slot..slot + 4].copy_from_slice(&0xfffffff7u32.to_le_bytes());
    })
    .unwrap();

    let err = er
        .enumerate_clusters(DELAHAYE_FIRST_CLUSTER, true, |_, _| Ok(Walk::Continue))
        .unwrap_err();
    assert!(matches!(err, ExfatError::BadCluster(10)));
}

#[test]
fn sectors_are_full_sized_and_numbered_monotonically() {
    let mut er = parsed_volume();
    let cluster = er.get_cluster(ROOT_CLUSTER).unwrap();

    let mut numbers = Vec::new();
    er.enumerate_sectors(&cluster, |sector_number, data| {
        assert_eq!(data.len(), SECTOR_SIZE);
        numbers.push(sector_number);
        Ok(Walk::Continue)
    })
    .unwrap();

    let base = CLUSTER_HEAP_OFFSET + (ROOT_CLUSTER - 2) * SECTORS_PER_CLUSTER as u32;
    assert_eq!(numbers, vec![base, base + 1]);
}

#[test]
fn sector_index_is_bounds_checked() {
    let mut er = parsed_volume();
    let cluster = er.get_cluster(ROOT_CLUSTER).unwrap();

    let err = er
        .read_sector(&cluster, SECTORS_PER_CLUSTER as u32)
        .unwrap_err();
    assert!(matches!(err, ExfatError::SectorIndexOutOfBounds(2, 2)));
}

#[test]
fn extract_fat_chained_file() {
    let mut er = parsed_volume();

    let mut sink = Vec::new();
    let written = er
        .write_from_cluster_chain(DELAHAYE_FIRST_CLUSTER, DELAHAYE_SIZE as u64, true, &mut sink)
        .unwrap();

    assert_eq!(written, DELAHAYE_SIZE as u64);
    assert_eq!(sink, delahaye_content());
}

#[test]
fn extract_contiguous_file() {
    let mut er = parsed_volume();

    let mut sink = Vec::new();
    let written = er
        .write_from_cluster_chain(HASH_JPG_FIRST_CLUSTER, HASH_JPG_SIZE as u64, false, &mut sink)
        .unwrap();

    assert_eq!(written, HASH_JPG_SIZE as u64);
    assert_eq!(sink, hash_jpg_content());
}

#[test]
fn extraction_size_mismatch_is_fatal() {
    let mut er = parsed_volume();

    // The chain holds three clusters (3072 bytes); asking for more must
    // fail after the chain ends.
    let mut sink = Vec::new();
    let err = er
        .write_from_cluster_chain(DELAHAYE_FIRST_CLUSTER, 4000, true, &mut sink)
        .unwrap_err();

    assert!(matches!(
        err,
        ExfatError::SizeMismatch {
            written: 3072,
            expected: 4000,
        }
    ));
}
