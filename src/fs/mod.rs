//! # File System Module
//!
//! File system modules handle interactions with directories and files.  The CPC
//! disk system, AMSDOS, is the only one supported.  It takes ownership of a disk
//! image, which it uses as storage.
//!
//! Sector ids and the order of sectors within a block are not handled here.
//! The transformation of a block to a physical disk address is kept in the `bios` module.

pub mod amsdos;
