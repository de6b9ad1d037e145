//! On-disk layout: fixed-size header and metadata records, encoded
//! little-endian so a store file is portable across host architectures.

use crate::error::{ErrorKind, Result};

pub const CAT_TXT: &str = "EPFL ImgFS 2024";
pub const MAX_IMGFS_NAME: usize = 31;
pub const MAX_IMG_ID: usize = 127;
pub const SHA_LEN: usize = 32;
pub const NB_RES: usize = 3;

pub const THUMB_RES: usize = 0;
pub const SMALL_RES: usize = 1;
pub const ORIG_RES: usize = 2;

pub const EMPTY: u16 = 0;
pub const NON_EMPTY: u16 = 1;

/// Size in bytes of an encoded [`StoreHeader`].
pub const HEADER_SIZE: usize = (MAX_IMGFS_NAME + 1) + 4 + 4 + 4 + (4 * 2) + 4 + 8;
/// Size in bytes of an encoded [`ImgMetadata`].
pub const METADATA_SIZE: usize =
    (MAX_IMG_ID + 1) + SHA_LEN + (2 * 4) + (NB_RES * 4) + (NB_RES * 8) + 2 + 2;

/// Resolution selector: one of thumbnail, small, or original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Thumb,
    Small,
    Orig,
}

impl Resolution {
    pub fn index(self) -> usize {
        match self {
            Resolution::Thumb => THUMB_RES,
            Resolution::Small => SMALL_RES,
            Resolution::Orig => ORIG_RES,
        }
    }

    pub fn from_index(i: usize) -> Result<Self> {
        match i {
            THUMB_RES => Ok(Resolution::Thumb),
            SMALL_RES => Ok(Resolution::Small),
            ORIG_RES => Ok(Resolution::Orig),
            _ => Err(ErrorKind::InvalidArgument.into()),
        }
    }

    /// Maps the CLI/HTTP resolution names to a [`Resolution`], `None` if unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "thumb" | "thumbnail" => Some(Resolution::Thumb),
            "small" => Some(Resolution::Small),
            "orig" | "original" => Some(Resolution::Orig),
            _ => None,
        }
    }
}

/// The header of the image filesystem: name, version, file counts, and the
/// fixed resolutions used for lazily-materialized thumbnails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub name: [u8; MAX_IMGFS_NAME + 1],
    pub version: u32,
    pub nb_files: u32,
    pub max_files: u32,
    /// `[thumb_w, thumb_h, small_w, small_h]`.
    pub resized_res: [u16; 4],
}

impl StoreHeader {
    pub fn new(max_files: u32, resized_res: [u16; 4]) -> Self {
        let mut name = [0u8; MAX_IMGFS_NAME + 1];
        name[..CAT_TXT.len()].copy_from_slice(CAT_TXT.as_bytes());
        StoreHeader { name, version: 0, nb_files: 0, max_files, resized_res }
    }

    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn thumb_res(&self) -> (u16, u16) {
        (self.resized_res[0], self.resized_res[1])
    }

    pub fn small_res(&self) -> (u16, u16) {
        (self.resized_res[2], self.resized_res[3])
    }

    pub fn res_for(&self, r: Resolution) -> (u16, u16) {
        match r {
            Resolution::Thumb => self.thumb_res(),
            Resolution::Small => self.small_res(),
            Resolution::Orig => (0, 0),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut off = 0;
        buf[off..off + self.name.len()].copy_from_slice(&self.name);
        off += self.name.len();
        buf[off..off + 4].copy_from_slice(&self.version.to_le_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.nb_files.to_le_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.max_files.to_le_bytes());
        off += 4;
        for v in &self.resized_res {
            buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
            off += 2;
        }
        // reserved 32-bit + 64-bit words stay zero
        debug_assert_eq!(off + 4 + 8, HEADER_SIZE);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ErrorKind::Io.into());
        }
        let mut name = [0u8; MAX_IMGFS_NAME + 1];
        name.copy_from_slice(&buf[0..MAX_IMGFS_NAME + 1]);
        let mut off = MAX_IMGFS_NAME + 1;
        let version = read_u32(buf, &mut off);
        let nb_files = read_u32(buf, &mut off);
        let max_files = read_u32(buf, &mut off);
        let mut resized_res = [0u16; 4];
        for v in &mut resized_res {
            *v = read_u16(buf, &mut off);
        }
        Ok(StoreHeader { name, version, nb_files, max_files, resized_res })
    }
}

/// Per-image metadata: identity, content hash, and per-resolution placement
/// within the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgMetadata {
    pub img_id: [u8; MAX_IMG_ID + 1],
    pub sha: [u8; SHA_LEN],
    pub orig_res: [u32; 2],
    pub size: [u32; NB_RES],
    pub offset: [u64; NB_RES],
    pub is_valid: u16,
}

impl ImgMetadata {
    pub fn empty() -> Self {
        ImgMetadata {
            img_id: [0u8; MAX_IMG_ID + 1],
            sha: [0u8; SHA_LEN],
            orig_res: [0; 2],
            size: [0; NB_RES],
            offset: [0; NB_RES],
            is_valid: EMPTY,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid == NON_EMPTY
    }

    pub fn img_id_str(&self) -> String {
        let end = self.img_id.iter().position(|&b| b == 0).unwrap_or(self.img_id.len());
        String::from_utf8_lossy(&self.img_id[..end]).into_owned()
    }

    pub fn set_img_id(&mut self, name: &str) -> Result<()> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_IMG_ID {
            return Err(ErrorKind::InvalidImgId.into());
        }
        self.img_id = [0u8; MAX_IMG_ID + 1];
        self.img_id[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut buf = [0u8; METADATA_SIZE];
        let mut off = 0;
        buf[off..off + self.img_id.len()].copy_from_slice(&self.img_id);
        off += self.img_id.len();
        buf[off..off + SHA_LEN].copy_from_slice(&self.sha);
        off += SHA_LEN;
        for v in &self.orig_res {
            buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
            off += 4;
        }
        for v in &self.size {
            buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
            off += 4;
        }
        for v in &self.offset {
            buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
            off += 8;
        }
        buf[off..off + 2].copy_from_slice(&self.is_valid.to_le_bytes());
        off += 2;
        debug_assert_eq!(off + 2, METADATA_SIZE);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < METADATA_SIZE {
            return Err(ErrorKind::Io.into());
        }
        let mut img_id = [0u8; MAX_IMG_ID + 1];
        img_id.copy_from_slice(&buf[0..MAX_IMG_ID + 1]);
        let mut off = MAX_IMG_ID + 1;
        let mut sha = [0u8; SHA_LEN];
        sha.copy_from_slice(&buf[off..off + SHA_LEN]);
        off += SHA_LEN;
        let mut orig_res = [0u32; 2];
        for v in &mut orig_res {
            *v = read_u32(buf, &mut off);
        }
        let mut size = [0u32; NB_RES];
        for v in &mut size {
            *v = read_u32(buf, &mut off);
        }
        let mut offset = [0u64; NB_RES];
        for v in &mut offset {
            *v = read_u64(buf, &mut off);
        }
        let is_valid = read_u16(buf, &mut off);
        Ok(ImgMetadata { img_id, sha, orig_res, size, offset, is_valid })
    }
}

fn read_u16(buf: &[u8], off: &mut usize) -> u16 {
    let v = u16::from_le_bytes(buf[*off..*off + 2].try_into().unwrap());
    *off += 2;
    v
}

fn read_u32(buf: &[u8], off: &mut usize) -> u32 {
    let v = u32::from_le_bytes(buf[*off..*off + 4].try_into().unwrap());
    *off += 4;
    v
}

fn read_u64(buf: &[u8], off: &mut usize) -> u64 {
    let v = u64::from_le_bytes(buf[*off..*off + 8].try_into().unwrap());
    *off += 8;
    v
}
