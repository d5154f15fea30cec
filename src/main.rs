//! # Command Line Interface
//!
//! Simple subcommands are directly in `main.rs`.
//! More elaborate subcommands are in the `commands` module.

mod cli;

use env_logger;
#[cfg(windows)]
use colored;
use cpckit::commands;
use cpckit::commands::Container;

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);
    let main_cmd = cli::build_cli();
    let matches = main_cmd.clone().get_matches();

    // Catalog a disk image or archive
    if let Some(cmd) = matches.subcommand_matches("catalog") {
        let path = cmd.get_one::<String>("dimg").expect(RCH);
        return match commands::open_container(path)? {
            Container::Disk(disk) => {
                println!("{}",disk.catalog_to_string()?);
                Ok(())
            },
            Container::Archive(archive) => {
                println!("{}",archive.catalog_to_string()?);
                Ok(())
            }
        };
    }

    // Disk geometry
    if let Some(cmd) = matches.subcommand_matches("geometry") {
        let path = cmd.get_one::<String>("dimg").expect(RCH);
        let indent = cmd.get_one::<u16>("indent").copied();
        let img = cpckit::img::dsk::Dsk::from_bytes(&std::fs::read(path)?)?;
        println!("{}",img.export_geometry(indent)?);
        return Ok(());
    }

    if let Some(cmd) = matches.subcommand_matches("get") {
        return commands::get::get(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("load") {
        return commands::load::load(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("tokenize") {
        return commands::langx::tokenize(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("detokenize") {
        return commands::langx::detokenize(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(main_cmd,cmd);
    }

    log::error!("No subcommand was found, try `cpckit --help`");
    return Err(Box::new(commands::CommandError::InvalidCommand));
}
