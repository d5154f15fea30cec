//! # Disk Image Module
//!
//! Disk images are byte streams that encode a disk's geometry along with the sector data.
//! At present the only image type is the CPC `DSK`, in both its standard and extended forms,
//! handled by `dsk::Dsk`.
//!
//! ## Relation to File Systems
//!
//! The image serves as the underlying storage for `fs` modules.
//! The `fs` modules work by reading sectors from the disk image, the task of mapping
//! blocks to sectors happens with the aid of `bios::dpb`, never inside `img`.
//!
//! ## Error Reporting
//!
//! Errors locate the problem by byte offset into the image, so that a damaged image
//! can be inspected with a hex editor.

pub mod dsk;

/// Enumerates disk image errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("Ident not found at offset {offset}: expected \"{expected}\", found \"{found}\"")]
    IdentNotFound {
        offset: usize,
        expected: String,
        found: String
    },
    #[error("image truncated, {needed} bytes needed at offset {offset}")]
    Truncated {
        offset: usize,
        needed: usize
    },
    #[error("track {track} head {head} is out of range")]
    TrackAccess {
        track: usize,
        head: usize
    },
    #[error("track {track} head {head} is not formatted")]
    Unformatted {
        track: usize,
        head: usize
    },
    #[error("sector {id:02X} not found on track {track} head {head}")]
    SectorNotFound {
        track: usize,
        head: usize,
        id: u8
    },
    #[error("unknown disk format, first sector id {0:02X}")]
    UnknownFormat(u8)
}

/// Show bytes as text for error messages, anything unprintable becomes `.`
pub fn printable(bytes: &[u8]) -> String {
    bytes.iter().map(|b| match *b {
        x if x>=0x20 && x<0x7f => x as char,
        _ => '.'
    }).collect()
}
