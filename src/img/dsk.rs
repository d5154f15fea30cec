//! ## Support for CPC DSK images
//!
//! The image starts with a 256 byte disk header, followed by each track in order
//! (cylinder major, head minor).  Each track is a 256 byte track header followed
//! by the sector data, in the order the sectors are listed in the header.
//! In the standard form every track has the same size.  In the extended form there
//! is a table of track sizes in the disk header, and each sector carries its own length.
//! The `binrw` crate is used to unflatten the headers.

use std::collections::HashMap;
use binrw::BinRead;
use binrw::io::Cursor;
use log::{debug,trace,warn,error};
use crate::img;
use crate::DYNERR;

pub const STD_IDENT: &[u8;8] = b"MV - CPC";
pub const EXT_IDENT: &[u8;8] = b"EXTENDED";
pub const TRACK_IDENT: &[u8;10] = b"Track-Info";
pub const HEADER_SIZE: usize = 0x100;
const MAX_SECTORS: usize = 29;

#[derive(BinRead,Debug)]
#[br(little)]
pub struct DiskInfo {
    pub ident: [u8;34],
    pub creator: [u8;14],
    pub tracks: u8,
    pub heads: u8,
    /// standard form only
    pub track_size: u16,
    /// extended form only, high byte of each track size
    pub track_size_table: [u8;204]
}

#[derive(BinRead,Debug)]
#[br(little)]
pub struct TrackInfo {
    pub ident: [u8;12],
    pub unused1: [u8;4],
    pub track: u8,
    pub head: u8,
    pub unused2: [u8;2],
    pub size_code: u8,
    pub sectors: u8,
    pub gap3: u8,
    pub filler: u8,
    pub sector_info: [u8;232]
}

/// Sector entry in the track header, the IDs are those found in the address field
#[derive(BinRead,Debug)]
#[br(little)]
pub struct SectorInfo {
    pub cylinder: u8,
    pub head: u8,
    pub id: u8,
    pub size_code: u8,
    pub status1: u8,
    pub status2: u8,
    /// extended form only
    pub data_len: u16
}

/// Summary of the disk header
#[derive(Clone,Debug)]
pub struct DiskHeader {
    pub creator: String,
    pub tracks: usize,
    pub heads: usize,
    /// track size including the track header, standard form
    pub track_size: usize,
    pub extended: bool,
    /// track sizes including the track header, indexed by `track*heads+head`
    pub track_sizes: Vec<usize>
}

#[derive(Clone,Debug)]
pub struct SectorLayout {
    pub id: u8,
    pub size_code: u8,
    /// offset of the sector data into the image
    pub offset: usize,
    pub len: usize
}

/// Summary of a track header, with absolute offsets to the sector data
#[derive(Clone,Debug)]
pub struct TrackLayout {
    pub track: u8,
    pub head: u8,
    pub size_code: u8,
    pub gap3: u8,
    pub filler: u8,
    pub sectors: Vec<SectorLayout>,
    sector_map: HashMap<u8,usize>
}

impl TrackLayout {
    /// find sector by its id
    pub fn find(&self,id: u8) -> Option<&SectorLayout> {
        match self.sector_map.get(&id) {
            Some(idx) => self.sectors.get(*idx),
            None => None
        }
    }
    pub fn lowest_id(&self) -> Option<u8> {
        self.sectors.iter().map(|s| s.id).min()
    }
}

/// Does the buffer start with either DSK signature
pub fn test_ident(bytes: &[u8]) -> bool {
    match bytes.get(0..8) {
        Some(ident) => ident==STD_IDENT || ident==EXT_IDENT,
        None => false
    }
}

pub struct Dsk {
    data: Vec<u8>,
    header: DiskHeader
}

impl Dsk {
    /// Take a copy of the buffer and parse the disk header
    pub fn from_bytes(data: &[u8]) -> Result<Self,DYNERR> {
        let header = Self::read_disk_info(data)?;
        debug!("DSK with {} tracks, {} heads, extended {}",header.tracks,header.heads,header.extended);
        Ok(Self {
            data: data.to_vec(),
            header
        })
    }
    /// Parse the 256 byte disk header
    pub fn read_disk_info(data: &[u8]) -> Result<DiskHeader,DYNERR> {
        if data.len() < HEADER_SIZE {
            error!("image too small for a disk header");
            return Err(Box::new(img::Error::Truncated { offset: 0, needed: HEADER_SIZE }));
        }
        if !test_ident(data) {
            return Err(Box::new(img::Error::IdentNotFound {
                offset: 0,
                expected: "MV - CPC".to_string(),
                found: img::printable(&data[0..8])
            }));
        }
        let info = DiskInfo::read(&mut Cursor::new(&data[0..HEADER_SIZE]))?;
        let extended = &info.ident[0..8]==EXT_IDENT;
        let tracks = info.tracks as usize;
        let heads = info.heads as usize;
        let track_size = info.track_size as usize;
        let track_sizes = match extended {
            true => info.track_size_table.iter().take(tracks*heads).map(|x| *x as usize * 256).collect(),
            false => vec![track_size;tracks*heads]
        };
        if tracks*heads > info.track_size_table.len() {
            warn!("track table holds {} entries, header wants {}",info.track_size_table.len(),tracks*heads);
        }
        Ok(DiskHeader {
            creator: img::printable(&info.creator).trim_end().to_string(),
            tracks,
            heads,
            track_size,
            extended,
            track_sizes
        })
    }
    pub fn header(&self) -> &DiskHeader {
        &self.header
    }
    /// Offset of the track header into the image
    pub fn track_offset(&self,track: usize,head: usize) -> Result<usize,DYNERR> {
        if track >= self.header.tracks || head >= self.header.heads || track*self.header.heads+head >= self.header.track_sizes.len() {
            return Err(Box::new(img::Error::TrackAccess { track, head }));
        }
        let idx = track*self.header.heads + head;
        let ans = match self.header.extended {
            true => HEADER_SIZE + self.header.track_sizes[0..idx].iter().sum::<usize>(),
            false => HEADER_SIZE + idx*self.header.track_size
        };
        Ok(ans)
    }
    /// Parse the track header, sector data offsets are resolved to absolute offsets
    pub fn read_track_info(&self,track: usize,head: usize) -> Result<TrackLayout,DYNERR> {
        let offset = self.track_offset(track,head)?;
        if self.header.track_sizes[track*self.header.heads + head]==0 {
            return Err(Box::new(img::Error::Unformatted { track, head }));
        }
        let hdr = match self.data.get(offset..offset+HEADER_SIZE) {
            Some(h) => h,
            None => return Err(Box::new(img::Error::Truncated { offset, needed: HEADER_SIZE }))
        };
        if &hdr[0..10]!=TRACK_IDENT {
            return Err(Box::new(img::Error::IdentNotFound {
                offset,
                expected: "Track-Info".to_string(),
                found: img::printable(&hdr[0..10])
            }));
        }
        let info = TrackInfo::read(&mut Cursor::new(hdr))?;
        let mut count = info.sectors as usize;
        if count > MAX_SECTORS {
            warn!("track {} head {} claims {} sectors",track,head,count);
            count = MAX_SECTORS;
        }
        let mut ans = TrackLayout {
            track: info.track,
            head: info.head,
            size_code: info.size_code,
            gap3: info.gap3,
            filler: info.filler,
            sectors: Vec::new(),
            sector_map: HashMap::new()
        };
        let mut data_offset = offset + HEADER_SIZE;
        for i in 0..count {
            let sec = SectorInfo::read(&mut Cursor::new(&info.sector_info[i*8..i*8+8]))?;
            let len = match self.header.extended {
                true => sec.data_len as usize,
                false => 128 << usize::min(info.size_code as usize,6)
            };
            trace!("sector {:02X} at {:X}, {} bytes",sec.id,data_offset,len);
            if ans.sector_map.contains_key(&sec.id) {
                debug!("duplicate sector id {:02X} on track {}, keeping first",sec.id,track);
            } else {
                ans.sector_map.insert(sec.id,ans.sectors.len());
            }
            ans.sectors.push(SectorLayout { id: sec.id, size_code: sec.size_code, offset: data_offset, len });
            data_offset += len;
        }
        Ok(ans)
    }
    /// Read sector data by the sector id as found in the track header
    pub fn read_sector(&self,track: usize,head: usize,id: u8) -> Result<Vec<u8>,DYNERR> {
        let layout = self.read_track_info(track,head)?;
        let sec = match layout.find(id) {
            Some(s) => s,
            None => return Err(Box::new(img::Error::SectorNotFound { track, head, id }))
        };
        match self.data.get(sec.offset..sec.offset+sec.len) {
            Some(dat) => Ok(dat.to_vec()),
            None => Err(Box::new(img::Error::Truncated { offset: sec.offset, needed: sec.len }))
        }
    }
    /// Report the geometry as a JSON string
    pub fn export_geometry(&self,indent: Option<u16>) -> Result<String,DYNERR> {
        let mut root = json::JsonValue::new_object();
        root["package"] = json::JsonValue::String(match self.header.extended {
            true => "extended dsk".to_string(),
            false => "dsk".to_string()
        });
        root["creator"] = json::JsonValue::String(self.header.creator.clone());
        root["tracks"] = json::JsonValue::Number(self.header.tracks.into());
        root["heads"] = json::JsonValue::Number(self.header.heads.into());
        let mut trk_ary = json::JsonValue::new_array();
        for track in 0..self.header.tracks {
            for head in 0..self.header.heads {
                let mut trk_obj = json::JsonValue::new_object();
                trk_obj["cylinder"] = json::JsonValue::Number(track.into());
                trk_obj["head"] = json::JsonValue::Number(head.into());
                match self.read_track_info(track,head) {
                    Ok(layout) => {
                        trk_obj["gap3"] = json::JsonValue::Number(layout.gap3.into());
                        trk_obj["filler"] = json::JsonValue::Number(layout.filler.into());
                        trk_obj["addr_map"] = json::JsonValue::new_array();
                        trk_obj["size_map"] = json::JsonValue::new_array();
                        for sec in layout.sectors {
                            trk_obj["addr_map"].push(json::JsonValue::String(hex::encode_upper(&[sec.id])))?;
                            trk_obj["size_map"].push(sec.len)?;
                        }
                    },
                    Err(e) => {
                        warn!("{}",e);
                        trk_obj["addr_map"] = json::JsonValue::Null;
                    }
                }
                trk_ary.push(trk_obj)?;
            }
        }
        root["track_list"] = trk_ary;
        if let Some(spaces) = indent {
            Ok(json::stringify_pretty(root,spaces))
        } else {
            Ok(json::stringify(root))
        }
    }
}
