//! ## AMSDOS file system module
//!
//! AMSDOS is the disk system of the Amstrad CPC.  On disk it is CP/M 2.2: a directory
//! of 32-byte extents, blocks of 1K, and no DPB stored on the disk.  The DPB is
//! chosen from the sector ids of the first track, see `bios::dpb::CpcFormat`.
//!
//! Files other than ASCII text usually start with a 128-byte AMSDOS header, giving
//! the file type, load address, and exact length.  CP/M only knows the length in
//! records, so the header is needed to trim the file.

pub mod types;
pub mod directory;

use std::collections::BTreeMap;
use std::fmt::Write;
use log::{debug,info,trace,warn};
use types::*;
use directory::*;
use crate::bios::dpb::CpcFormat;
use crate::img;
use crate::img::dsk::Dsk;
use crate::DYNERR;

/// The primary interface for disk operations.
pub struct Disk {
    fmt: CpcFormat,
    img: Dsk
}

/// Pick the format from the lowest sector id on the first track
fn detect_format(img: &Dsk) -> Result<CpcFormat,DYNERR> {
    let layout = img.read_track_info(0,0)?;
    let id = match layout.lowest_id() {
        Some(id) => id,
        None => return Err(Box::new(img::Error::Unformatted { track: 0, head: 0 }))
    };
    match CpcFormat::from_first_sector(id) {
        Some(fmt) => Ok(fmt),
        None => Err(Box::new(img::Error::UnknownFormat(id)))
    }
}

impl Disk {
    /// Create a disk file system using the given image as storage.
    /// The format is detected from the image.
    pub fn from_img(img: Dsk) -> Result<Self,DYNERR> {
        let fmt = detect_format(&img)?;
        if !fmt.dpb.verify() {
            return Err(Box::new(Error::BadFormat));
        }
        info!("{}",fmt);
        Ok(Self {
            fmt,
            img
        })
    }
    /// Test an image for the AMSDOS file system.
    pub fn test_img(img: &Dsk) -> bool {
        match detect_format(img) {
            Ok(fmt) => {
                debug!("image looks like {}",fmt.name);
                true
            },
            Err(e) => {
                debug!("not AMSDOS: {}",e);
                false
            }
        }
    }
    pub fn format(&self) -> &CpcFormat {
        &self.fmt
    }
    /// Read a block, logical tracks are split into cylinder and head
    fn read_block(&self,iblock: usize) -> Result<Vec<u8>,DYNERR> {
        if iblock >= self.fmt.dpb.user_blocks() {
            return Err(Box::new(Error::BlockRange(iblock)));
        }
        let heads = usize::max(self.img.header().heads,1);
        let mut ans = Vec::new();
        for (track,id) in self.fmt.block_sectors(iblock) {
            trace!("block {} reads track {} sector {:02X}",iblock,track,id);
            let mut sec = self.img.read_sector(track / heads,track % heads,id)?;
            sec.resize(self.fmt.sector_size,DELETED);
            ans.append(&mut sec);
        }
        Ok(ans)
    }
    /// Raw bytes of the directory blocks
    fn get_directory(&self) -> Result<Vec<u8>,DYNERR> {
        let mut ans = Vec::new();
        for iblock in 0..self.fmt.dpb.dir_blocks() {
            ans.append(&mut self.read_block(iblock)?);
        }
        ans.truncate(self.fmt.dpb.dir_entries()*DIR_ENTRY_SIZE);
        Ok(ans)
    }
    /// Map of display names to extents, sorted by extent index.
    /// Names are `NAME.EXT`, prefixed with `u:` when the user is not 0.
    pub fn read_directory(&self) -> Result<BTreeMap<String,Vec<Extent>>,DYNERR> {
        build_files(&self.get_directory()?)
    }
    /// Gather the data of the file from its extents.
    /// Only the records in use are kept, if there is an AMSDOS header the data
    /// is further trimmed to the header's length.
    pub fn read_file(&self,extents: &[Extent]) -> Result<Vec<u8>,DYNERR> {
        let dpb = &self.fmt.dpb;
        let mut ans = Vec::new();
        for fx in extents {
            let mut remaining = fx.records(dpb) * RECORD_SIZE;
            for iblock in fx.get_block_list(dpb) {
                if remaining==0 {
                    break;
                }
                if iblock==0 {
                    debug!("extent {} ends early",fx.index());
                    break;
                }
                let buf = self.read_block(iblock)?;
                let n = usize::min(remaining,buf.len());
                ans.extend_from_slice(&buf[0..n]);
                remaining -= n;
            }
            if remaining > 0 {
                warn!("extent {} is missing {} bytes",fx.index(),remaining);
            }
        }
        if let Some(hdr) = parse_amsdos_header(&ans) {
            let end = HEADER_SIZE + hdr.length();
            if end <= ans.len() {
                ans.truncate(end);
            } else {
                warn!("header claims {} bytes, found {}",hdr.length(),ans.len()-HEADER_SIZE);
            }
        }
        Ok(ans)
    }
    /// Read a file by its display name, the name is not case sensitive
    pub fn get(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        let files = self.read_directory()?;
        let upper = name.to_uppercase();
        let key = match upper.strip_prefix("0:") {
            Some(n) => n.to_string(),
            None => upper
        };
        match files.get(&key) {
            Some(extents) => self.read_file(extents),
            None => Err(Box::new(Error::FileNotFound))
        }
    }
    /// List the files in the manner of CAT, sizes in K rounded up
    pub fn catalog_to_string(&self) -> Result<String,DYNERR> {
        let files = self.read_directory()?;
        let block_size = self.fmt.dpb.block_size();
        let mut ans = String::new();
        let mut used = 0;
        for (name,extents) in &files {
            let blocks: usize = extents.iter().map(|x| x.get_block_list(&self.fmt.dpb).iter().filter(|b| **b>0).count()).sum();
            used += blocks;
            writeln!(ans,"{:14} {:4}K",name,blocks*block_size/1024)?;
        }
        let free = self.fmt.dpb.user_blocks() - self.fmt.dpb.dir_blocks() - usize::min(used,self.fmt.dpb.user_blocks() - self.fmt.dpb.dir_blocks());
        writeln!(ans)?;
        write!(ans,"{}K free",free*block_size/1024)?;
        Ok(ans)
    }
}
