//! ## Load Everything
//!
//! Runs the loader over a file and lists what came out.  Each item gets a banner
//! line on stdout, failures go to stderr.

use clap;
use colored::Colorize;
use super::CommandError;
use crate::load;
use crate::STDRESULT;

const RCH: &str = "unreachable was reached";

pub fn load(cmd: &clap::ArgMatches) -> STDRESULT {
    let path = cmd.get_one::<String>("dimg").expect(RCH);
    let dat = std::fs::read(path)?;
    let name = match std::path::Path::new(path).file_name() {
        Some(n) => n.to_string_lossy().to_string(),
        None => path.to_string()
    };
    let report = load::load_bytes(&name,&dat);
    for item in &report.items {
        println!("=== {} ({}) ===",item.name,item.kind);
        match &item.text {
            Some(txt) => {
                for line in txt.lines() {
                    println!("{}",line);
                }
            },
            None => println!("{} bytes of binary data",item.data.len())
        }
        super::langx::eprint_diagnostics(&item.name,&item.diagnostics);
    }
    for err in &report.errors {
        eprintln!("{} {}: {}","\u{2717}".red(),err.name,err.message);
    }
    if report.items.len()==0 {
        log::error!("nothing in {} could be decoded",name);
        return Err(Box::new(CommandError::NothingDecoded));
    }
    Ok(())
}
