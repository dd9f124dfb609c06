#![allow(dead_code)]

// Programmatic reference image shared by the integration suites.
//
// Geometry: 512-byte sectors, 2 sectors per cluster, one FAT at sector 24,
// cluster heap at sector 26, 239 clusters. Cluster layout:
//
//   2      allocation bitmap
//   3      up-case table
//   4..=5  root directory (entries fill cluster 4 exactly; cluster 5 opens
//          with the end-of-directory marker)
//   6      testdirectory
//   7      testdirectory2
//   8      testdirectory3
//   9..=11 FAT-chained payload (2-delahaye-...jpg)
//   12..=13 contiguous no-FAT-chain payload (8fd71ab1...jpg)

use std::io::Cursor;

use exfat_reader::VolumeReader;

pub const SECTOR_SIZE: usize = 512;
pub const SECTORS_PER_CLUSTER: usize = 2;
pub const CLUSTER_SIZE: usize = SECTOR_SIZE * SECTORS_PER_CLUSTER;
pub const CLUSTER_COUNT: u32 = 239;
pub const FAT_OFFSET: u32 = 24;
pub const FAT_LENGTH: u32 = 2;
pub const CLUSTER_HEAP_OFFSET: u32 = 26;
pub const ROOT_CLUSTER: u32 = 4;
pub const VOLUME_SERIAL: u32 = 0x3d51a058;
pub const VOLUME_LABEL: &str = "testvolumelabel";

pub const DELAHAYE_JPG: &str = "2-delahaye-type-165-cabriolet-dsc_8025.jpg";
pub const DELAHAYE_FIRST_CLUSTER: u32 = 9;
pub const DELAHAYE_SIZE: usize = 2500;

pub const HASH_JPG: &str = "8fd71ab132c59bf33cd7890c0acebf12.jpg";
pub const HASH_JPG_FIRST_CLUSTER: u32 = 12;
pub const HASH_JPG_SIZE: usize = 1300;

/// Root file names in on-disk order.
pub const ROOT_FILES_ON_DISK: [&str; 7] = [
    "79c6d31a-cca1-11e9-8325-9746d045e868",
    DELAHAYE_JPG,
    "testdirectory",
    HASH_JPG,
    "testdirectory2",
    "064cbfd4-cec3-11e9-926d-c362c80fab7b",
    "testdirectory3",
];

/// Absolute byte offset of a cluster within the image.
pub fn cluster_offset(cluster: u32) -> usize {
    CLUSTER_HEAP_OFFSET as usize * SECTOR_SIZE + (cluster as usize - 2) * CLUSTER_SIZE
}

pub fn delahaye_content() -> Vec<u8> {
    (0..DELAHAYE_SIZE).map(|i| ((i * 7 + 13) % 256) as u8).collect()
}

pub fn hash_jpg_content() -> Vec<u8> {
    (0..HASH_JPG_SIZE).map(|i| ((i * 3 + 1) % 251) as u8).collect()
}

fn utf16_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn packed_timestamp(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> u32 {
    ((year - 1980) << 25) | (month << 21) | (day << 16) | (hour << 11) | (minute << 5) | (second / 2)
}

fn boot_sector() -> [u8; SECTOR_SIZE] {
    let volume_length = CLUSTER_HEAP_OFFSET as u64 + CLUSTER_COUNT as u64 * SECTORS_PER_CLUSTER as u64;

    let mut raw = [0u8; SECTOR_SIZE];
    raw[..3].copy_from_slice(&[0xeb, 0x76, 0x90]);
    raw[3..11].copy_from_slice(b"EXFAT   ");
    raw[64..72].copy_from_slice(&0u64.to_le_bytes()); // partition offset
    raw[72..80].copy_from_slice(&volume_length.to_le_bytes());
    raw[80..84].copy_from_slice(&FAT_OFFSET.to_le_bytes());
    raw[84..88].copy_from_slice(&FAT_LENGTH.to_le_bytes());
    raw[88..92].copy_from_slice(&CLUSTER_HEAP_OFFSET.to_le_bytes());
    raw[92..96].copy_from_slice(&CLUSTER_COUNT.to_le_bytes());
    raw[96..100].copy_from_slice(&ROOT_CLUSTER.to_le_bytes());
    raw[100..104].copy_from_slice(&VOLUME_SERIAL.to_le_bytes());
    raw[104] = 0x00; // minor revision
    raw[105] = 0x01; // major revision
    raw[106..108].copy_from_slice(&0u16.to_le_bytes()); // volume flags
    raw[108] = 9; // bytes-per-sector shift
    raw[109] = 1; // sectors-per-cluster shift
    raw[110] = 1; // number of FATs
    raw[111] = 0x80; // drive select
    raw[112] = 0xff; // percent in use unknown
    raw[510..512].copy_from_slice(&0xaa55u16.to_le_bytes());
    raw
}

fn boot_region() -> Vec<u8> {
    let mut region = Vec::with_capacity(12 * SECTOR_SIZE);

    region.extend_from_slice(&boot_sector());

    // Eight extended boot sectors, each ending in the extended signature.
    for _ in 0..8 {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[SECTOR_SIZE - 4..].copy_from_slice(&0xaa550000u32.to_le_bytes());
        region.extend_from_slice(&sector);
    }

    // OEM parameters, reserved, boot checksum.
    region.extend_from_slice(&[0u8; SECTOR_SIZE]);
    region.extend_from_slice(&[0u8; SECTOR_SIZE]);
    region.extend_from_slice(&[0u8; SECTOR_SIZE]);

    region
}

fn fat() -> Vec<u8> {
    let mut entries = vec![0xffffffffu32; CLUSTER_COUNT as usize + 1];
    entries[0] = 0xfffffff8; // media type
    entries[1] = 0xffffffff; // historical sentinel
    entries[9] = 10;
    entries[10] = 11;
    entries[11] = 0xffffffff;

    let mut raw: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    raw.resize(FAT_LENGTH as usize * SECTOR_SIZE, 0);
    raw
}

fn volume_label_entry() -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[0] = 0x83;
    slot[1] = VOLUME_LABEL.encode_utf16().count() as u8;
    let encoded = utf16_bytes(VOLUME_LABEL);
    slot[2..2 + encoded.len()].copy_from_slice(&encoded);
    slot
}

fn allocation_bitmap_entry() -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[0] = 0x81;
    slot[20..24].copy_from_slice(&2u32.to_le_bytes());
    slot[24..32].copy_from_slice(&(CLUSTER_COUNT as u64).div_ceil(8).to_le_bytes());
    slot
}

fn upcase_table_entry() -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[0] = 0x82;
    slot[4..8].copy_from_slice(&0xe619d30du32.to_le_bytes());
    slot[20..24].copy_from_slice(&3u32.to_le_bytes());
    slot[24..32].copy_from_slice(&5836u64.to_le_bytes());
    slot
}

/// Assembles a File entry set: the File entry, its Stream Extension, and the
/// File Name fragments.
fn file_set(
    name: &str,
    is_directory: bool,
    no_fat_chain: bool,
    first_cluster: u32,
    valid_data_length: u64,
    data_length: u64,
) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let fragments = units.chunks(15).collect::<Vec<_>>();

    let mut set = Vec::with_capacity((2 + fragments.len()) * 32);

    let timestamp = packed_timestamp(2019, 9, 1, 12, 30, 0);
    let utc_offset: u8 = 0x80 | 4; // +01:00

    let mut file = [0u8; 32];
    file[0] = 0x85;
    file[1] = 1 + fragments.len() as u8;
    let attributes: u16 = if is_directory { 0x0010 } else { 0x0020 };
    file[4..6].copy_from_slice(&attributes.to_le_bytes());
    file[8..12].copy_from_slice(&timestamp.to_le_bytes());
    file[12..16].copy_from_slice(&timestamp.to_le_bytes());
    file[16..20].copy_from_slice(&timestamp.to_le_bytes());
    file[22] = utc_offset;
    file[23] = utc_offset;
    file[24] = utc_offset;
    set.extend_from_slice(&file);

    let mut stream = [0u8; 32];
    stream[0] = 0xc0;
    stream[1] = if first_cluster == 0 {
        0
    } else if no_fat_chain {
        0x03
    } else {
        0x01
    };
    stream[3] = units.len() as u8;
    stream[8..16].copy_from_slice(&valid_data_length.to_le_bytes());
    stream[20..24].copy_from_slice(&first_cluster.to_le_bytes());
    stream[24..32].copy_from_slice(&data_length.to_le_bytes());
    set.extend_from_slice(&stream);

    for fragment in fragments {
        let mut slot = [0u8; 32];
        slot[0] = 0xc1;
        let encoded: Vec<u8> = fragment.iter().flat_map(|u| u.to_le_bytes()).collect();
        slot[2..2 + encoded.len()].copy_from_slice(&encoded);
        set.extend_from_slice(&slot);
    }

    set
}

fn empty_file_set(name: &str) -> Vec<u8> {
    file_set(name, false, false, 0, 0, 0)
}

fn directory_set(name: &str, first_cluster: u32) -> Vec<u8> {
    file_set(name, true, true, first_cluster, CLUSTER_SIZE as u64, CLUSTER_SIZE as u64)
}

fn root_directory() -> Vec<u8> {
    let mut entries = Vec::new();

    entries.extend_from_slice(&volume_label_entry());
    entries.extend_from_slice(&allocation_bitmap_entry());
    entries.extend_from_slice(&upcase_table_entry());

    entries.extend(empty_file_set("79c6d31a-cca1-11e9-8325-9746d045e868"));
    entries.extend(file_set(
        DELAHAYE_JPG,
        false,
        false,
        DELAHAYE_FIRST_CLUSTER,
        DELAHAYE_SIZE as u64,
        DELAHAYE_SIZE as u64,
    ));
    entries.extend(directory_set("testdirectory", 6));
    entries.extend(file_set(
        HASH_JPG,
        false,
        true,
        HASH_JPG_FIRST_CLUSTER,
        HASH_JPG_SIZE as u64,
        HASH_JPG_SIZE as u64,
    ));
    entries.extend(directory_set("testdirectory2", 7));
    entries.extend(empty_file_set("064cbfd4-cec3-11e9-926d-c362c80fab7b"));
    entries.extend(directory_set("testdirectory3", 8));

    entries
}

pub fn build_image() -> Vec<u8> {
    let total = CLUSTER_HEAP_OFFSET as usize * SECTOR_SIZE + CLUSTER_COUNT as usize * CLUSTER_SIZE;
    let mut image = vec![0u8; total];

    let region = boot_region();
    image[..region.len()].copy_from_slice(&region);
    image[region.len()..2 * region.len()].copy_from_slice(&region);

    let fat = fat();
    let fat_start = FAT_OFFSET as usize * SECTOR_SIZE;
    image[fat_start..fat_start + fat.len()].copy_from_slice(&fat);

    fn write_cluster(image: &mut [u8], cluster: u32, data: &[u8]) {
        let start = cluster_offset(cluster);
        image[start..start + data.len()].copy_from_slice(data);
    }

    // The root directory fills cluster 4 exactly; the zeroed cluster 5
    // provides the end-of-directory marker to the contiguous walk.
    let root = root_directory();
    assert_eq!(root.len(), CLUSTER_SIZE);
    write_cluster(&mut image, ROOT_CLUSTER, &root);

    write_cluster(
        &mut image,
        6,
        &empty_file_set("300daec8-cec3-11e9-bfa2-0f240e41d1d8"),
    );

    let mut testdirectory2 = Vec::new();
    testdirectory2.extend(empty_file_set("file1"));
    testdirectory2.extend(empty_file_set("ff7b94be-cec2-11e9-b7b1-6b2e61bd775c"));
    testdirectory2.extend(empty_file_set("00c57ab0-cec3-11e9-b750-bbed8d2244c8"));
    testdirectory2.extend(empty_file_set("file2"));
    write_cluster(&mut image, 7, &testdirectory2);

    write_cluster(
        &mut image,
        8,
        &empty_file_set("10422c86-cec3-11e9-953f-4f501efd2640"),
    );

    write_cluster(&mut image, DELAHAYE_FIRST_CLUSTER, &delahaye_content());
    write_cluster(&mut image, HASH_JPG_FIRST_CLUSTER, &hash_jpg_content());

    image
}

/// A reader over the reference image with all structures parsed.
pub fn parsed_volume() -> VolumeReader<Cursor<Vec<u8>>> {
    let mut er = VolumeReader::new(Cursor::new(build_image()));
    er.parse().expect("reference image must parse");
    er
}

/// A reader over a caller-modified copy of the reference image.
pub fn parsed_volume_with<F>(mutate: F) -> Result<VolumeReader<Cursor<Vec<u8>>>, exfat_reader::ExfatError>
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut image = build_image();
    mutate(&mut image);

    let mut er = VolumeReader::new(Cursor::new(image));
    er.parse()?;
    Ok(er)
}
