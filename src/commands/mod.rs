//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.

pub mod get;
pub mod langx;
pub mod load;
pub mod completions;

use std::str::FromStr;
use crate::{fs,img,zip,DYNERR};

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Item type is unknown")]
    UnknownItemType,
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("Input source is not supported")]
    UnsupportedFormat,
    #[error("Nothing could be decoded")]
    NothingDecoded,
    #[error("File not found")]
    FileNotFound
}

/// Ways of getting a file out of a container
#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ItemType {
    Raw,
    Auto
}

impl FromStr for ItemType {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "auto" => Ok(Self::Auto),
            _ => Err(CommandError::UnknownItemType)
        }
    }
}

/// Containers the subcommands can be pointed at
pub enum Container {
    Disk(fs::amsdos::Disk),
    Archive(zip::ZipFile)
}

/// Open a DSK image or ZIP archive, the extension is not consulted
pub fn open_container(path: &str) -> Result<Container,DYNERR> {
    let dat = std::fs::read(path)?;
    if zip::test_ident(&dat) {
        return Ok(Container::Archive(zip::ZipFile::from_bytes(&dat)?));
    }
    if img::dsk::test_ident(&dat) {
        return Ok(Container::Disk(crate::create_fs_from_bytestream(&dat)?));
    }
    log::error!("{} is neither a DSK image nor a ZIP archive",path);
    Err(Box::new(CommandError::UnsupportedFormat))
}

#[test]
fn item_types() {
    assert_eq!(ItemType::from_str("raw").expect("parse failed"),ItemType::Raw);
    assert_eq!(ItemType::from_str("auto").expect("parse failed"),ItemType::Auto);
    assert!(ItemType::from_str("atok").is_err());
}
