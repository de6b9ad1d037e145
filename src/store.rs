//! The image store: the fixed header + metadata table + append-only heap,
//! and the operations (create/open/insert/delete/read/list) that preserve
//! its invariants.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec::{resolution, sha256, thumbnail_jpeg};
use crate::error::{ErrorKind, Result};
use crate::format::{
    ImgMetadata, Resolution, StoreHeader, EMPTY, HEADER_SIZE, METADATA_SIZE, NON_EMPTY, ORIG_RES,
};

/// An open imgFS: the file handle plus an in-memory mirror of the header
/// and metadata table, kept synchronized with what is on disk.
pub struct StoreFile {
    file: File,
    pub header: StoreHeader,
    pub metadata: Vec<ImgMetadata>,
}

impl StoreFile {
    /// Creates a fresh imgFS at `path`, writing the header and a
    /// zero-initialized metadata table of `max_files` entries.
    pub fn create(path: impl AsRef<Path>, max_files: u32, resized_res: [u16; 4]) -> Result<Self> {
        if max_files == 0 {
            return Err(ErrorKind::MaxFiles.into());
        }
        let header = StoreHeader::new(max_files, resized_res);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&header.to_bytes())?;
        let empty_bytes = ImgMetadata::empty().to_bytes();
        for _ in 0..max_files {
            file.write_all(&empty_bytes)?;
        }

        let metadata = vec![ImgMetadata::empty(); max_files as usize];
        Ok(StoreFile { file, header, metadata })
    }

    /// Opens an existing imgFS at `path` for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)?;
        let header = StoreHeader::from_bytes(&header_buf)?;

        if header.max_files == 0 || header.nb_files > header.max_files {
            return Err(ErrorKind::MaxFiles.into());
        }

        let mut metadata = Vec::with_capacity(header.max_files as usize);
        let mut meta_buf = vec![0u8; METADATA_SIZE];
        for _ in 0..header.max_files {
            file.read_exact(&mut meta_buf)?;
            metadata.push(ImgMetadata::from_bytes(&meta_buf)?);
        }

        Ok(StoreFile { file, header, metadata })
    }

    /// Consumes the handle, closing the underlying file. A plain `drop`
    /// would do the same; this exists so callers can name the lifecycle
    /// step the way the rest of the core API does.
    pub fn close(self) {}

    /// Inserts `bytes` under `name`, deduplicating by name and content.
    pub fn insert(&mut self, bytes: &[u8], name: &str) -> Result<()> {
        if self.header.nb_files >= self.header.max_files {
            return Err(ErrorKind::ImgfsFull.into());
        }
        let i = self
            .metadata
            .iter()
            .position(|m| !m.is_valid())
            .ok_or(ErrorKind::ImgfsFull)?;
        let backup = self.metadata[i].clone();

        let mut new_meta = ImgMetadata::empty();
        new_meta.set_img_id(name)?;
        new_meta.sha = sha256(bytes);
        new_meta.size[ORIG_RES] = bytes.len() as u32;
        let (width, height) = resolution(bytes)?;
        new_meta.orig_res = [width, height];
        new_meta.is_valid = NON_EMPTY;
        self.metadata[i] = new_meta;

        if let Err(e) = self.dedup(i) {
            self.metadata[i] = backup;
            return Err(e);
        }

        if let Err(e) = self.finish_insert(i, bytes) {
            self.metadata[i] = backup;
            return Err(e);
        }

        Ok(())
    }

    fn finish_insert(&mut self, i: usize, bytes: &[u8]) -> Result<()> {
        if self.metadata[i].offset[ORIG_RES] == 0 {
            let offset = self.file.seek(SeekFrom::End(0))?;
            self.file.write_all(bytes)?;
            self.metadata[i].offset[ORIG_RES] = offset;
        }

        self.header.version += 1;
        self.header.nb_files += 1;

        if let Err(e) = self.write_metadata_slot(i).and_then(|_| self.write_header()) {
            self.header.version -= 1;
            self.header.nb_files -= 1;
            return Err(e);
        }
        Ok(())
    }

    /// Checks slot `i` against every other valid slot for a name collision
    /// (fatal) or a content collision (aliases the existing payload).
    fn dedup(&mut self, i: usize) -> Result<()> {
        let target_img_id = self.metadata[i].img_id;
        let target_sha = self.metadata[i].sha;
        let mut found_content_dup = false;

        for j in 0..self.metadata.len() {
            if j == i || !self.metadata[j].is_valid() {
                continue;
            }
            if self.metadata[j].img_id == target_img_id {
                return Err(ErrorKind::DuplicateId.into());
            }
            if self.metadata[j].sha == target_sha {
                self.metadata[i].offset = self.metadata[j].offset;
                self.metadata[i].size = self.metadata[j].size;
                found_content_dup = true;
            }
        }

        if !found_content_dup {
            self.metadata[i].offset[ORIG_RES] = 0;
        }
        Ok(())
    }

    /// Deletes the entry named `name`. The heap is left untouched.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let i = self.find_slot(name).ok_or(ErrorKind::ImageNotFound)?;
        self.metadata[i].is_valid = EMPTY;
        self.write_metadata_slot(i)?;
        self.header.version += 1;
        self.header.nb_files -= 1;
        self.write_header()?;
        Ok(())
    }

    /// Reads the image named `name` at resolution `r`, lazily materializing
    /// it first if needed.
    pub fn read(&mut self, name: &str, r: Resolution) -> Result<Vec<u8>> {
        let i = self.find_slot(name).ok_or(ErrorKind::ImageNotFound)?;
        self.resize(r, i)?;

        let idx = r.index();
        let size = self.metadata[i].size[idx] as usize;
        let offset = self.metadata[i].offset[idx];

        let mut buf = vec![0u8; size];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Materializes resolution `r` for slot `i` if it is not already
    /// present, by thumbnailing the original and appending the result.
    fn resize(&mut self, r: Resolution, i: usize) -> Result<()> {
        if r == Resolution::Orig {
            return Ok(());
        }
        let meta = self.metadata.get(i).ok_or(ErrorKind::InvalidImgId)?;
        if !meta.is_valid() {
            return Err(ErrorKind::InvalidImgId.into());
        }

        let idx = r.index();
        if meta.offset[idx] != 0 && meta.size[idx] != 0 {
            return Ok(());
        }

        let orig_offset = meta.offset[ORIG_RES];
        let orig_size = meta.size[ORIG_RES] as usize;
        let mut orig_bytes = vec![0u8; orig_size];
        self.file.seek(SeekFrom::Start(orig_offset))?;
        self.file.read_exact(&mut orig_bytes)?;

        let (w, h) = self.header.res_for(r);
        let resized_bytes = thumbnail_jpeg(&orig_bytes, w, h)?;

        let new_offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&resized_bytes)?;

        self.metadata[i].offset[idx] = new_offset;
        self.metadata[i].size[idx] = resized_bytes.len() as u32;
        self.write_metadata_slot(i)?;
        Ok(())
    }

    /// Human-readable dump of the header and every valid entry, matching
    /// the original CLI's text report.
    pub fn list_text(&self) -> String {
        let mut out = String::new();
        out.push_str("*****************************************\n");
        out.push_str("********** IMGFS HEADER START ***********\n");
        out.push_str(&format!(
            "TYPE: {}\nVERSION: {}\nIMAGE COUNT: {}\t\tMAX IMAGES: {}\n\
             THUMBNAIL: {} x {}\tSMALL: {} x {}\n",
            self.header.name_str(),
            self.header.version,
            self.header.nb_files,
            self.header.max_files,
            self.header.resized_res[0],
            self.header.resized_res[1],
            self.header.resized_res[2],
            self.header.resized_res[3],
        ));
        out.push_str("*********** IMGFS HEADER END ************\n");
        out.push_str("*****************************************\n");

        if self.header.nb_files == 0 {
            out.push_str("<< empty imgFS >>\n");
            return out;
        }

        for m in self.metadata.iter().filter(|m| m.is_valid()) {
            out.push_str(&format!(
                "IMAGE ID: {}\nSHA: {}\nVALID: {}\n\
                 OFFSET ORIG.: {}\t\tSIZE ORIG.: {}\n\
                 OFFSET THUMB.: {}\t\tSIZE THUMB.: {}\n\
                 OFFSET SMALL: {}\t\tSIZE SMALL: {}\n\
                 ORIGINAL: {} x {}\n*****************************************\n",
                m.img_id_str(),
                hex(&m.sha),
                m.is_valid,
                m.offset[ORIG_RES],
                m.size[ORIG_RES],
                m.offset[crate::format::THUMB_RES],
                m.size[crate::format::THUMB_RES],
                m.offset[crate::format::SMALL_RES],
                m.size[crate::format::SMALL_RES],
                m.orig_res[0],
                m.orig_res[1],
            ));
        }
        out
    }

    /// JSON object `{"Images": [img_id, ...]}` listing every valid entry.
    pub fn list_json(&self) -> String {
        let ids: Vec<String> = self
            .metadata
            .iter()
            .filter(|m| m.is_valid())
            .map(|m| m.img_id_str())
            .collect();
        serde_json::json!({ "Images": ids }).to_string()
    }

    fn find_slot(&self, name: &str) -> Option<usize> {
        self.metadata
            .iter()
            .position(|m| m.is_valid() && m.img_id_str() == name)
    }

    fn write_metadata_slot(&mut self, i: usize) -> Result<()> {
        let offset = HEADER_SIZE as u64 + (i as u64) * (METADATA_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.metadata[i].to_bytes())?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.header.to_bytes())?;
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
