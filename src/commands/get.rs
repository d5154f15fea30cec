use clap;
use std::io::Write;
use std::str::FromStr;
use log::{debug,error};
use super::{ItemType,CommandError,Container};
use crate::load;
use crate::{STDRESULT,DYNERR};

const RCH: &str = "unreachable was reached";

/// Find the file in an archive, descending into a disk image if the name
/// has the form `<entry>/<file>` and `<entry>` is not itself in the archive.
fn get_from_archive(archive: &crate::zip::ZipFile,name: &str) -> Result<Vec<u8>,DYNERR> {
    if archive.entries().contains_key(name) {
        return archive.read_data(name);
    }
    for entry in archive.names() {
        if let Some(inner) = name.strip_prefix(&[entry.as_str(),"/"].concat()) {
            debug!("looking for {} in {}",inner,entry);
            let disk = crate::create_fs_from_bytestream(&archive.read_data(&entry)?)?;
            return disk.get(inner);
        }
    }
    error!("{} is not in the archive",name);
    Err(Box::new(CommandError::FileNotFound))
}

fn output_raw(object: &[u8],console: bool) -> STDRESULT {
    if atty::is(atty::Stream::Stdout) || console {
        crate::display_block(0,object);
    } else {
        std::io::stdout().write_all(object)?;
    }
    Ok(())
}

fn output_auto(name: &str,object: &[u8],console: bool) -> STDRESULT {
    match load::sniff(object) {
        load::Format::Zip | load::Format::Dsk => {
            debug!("{} is a container, copying it as is",name);
            return output_raw(object,console);
        },
        _ => {}
    }
    let report = load::load_bytes(name,object);
    if let Some(err) = report.errors.first() {
        error!("{}",err.message);
        return Err(Box::new(CommandError::UnsupportedFormat));
    }
    for item in &report.items {
        match &item.text {
            Some(txt) => {
                for line in txt.lines() {
                    println!("{}",line);
                }
                super::langx::eprint_diagnostics(&item.name,&item.diagnostics);
            },
            None => output_raw(&item.data,console)?
        }
    }
    Ok(())
}

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let src_name = cmd.get_one::<String>("file").expect(RCH);
    let img_path = cmd.get_one::<String>("dimg").expect(RCH);
    let typ = ItemType::from_str(cmd.get_one::<String>("type").expect(RCH))?;
    let console = cmd.get_flag("console");
    let object = match super::open_container(img_path)? {
        Container::Disk(disk) => disk.get(src_name)?,
        Container::Archive(archive) => get_from_archive(&archive,src_name)?
    };
    match typ {
        ItemType::Raw => output_raw(&object,console),
        ItemType::Auto => output_auto(src_name,&object,console)
    }
}
