use clap::{value_parser, crate_version, Arg, ArgAction, Command, ValueHint};

const IN_HELP: &str = "the container can be a DSK image, or a ZIP archive holding DSK images or files";
const T_LONG_HELP: &str = "The `raw` type copies the file bytes, AMSDOS header included.
The `auto` type uses the AMSDOS header and content to pick a decoding,
BASIC programs are detokenized and ASCII files are converted to UTF8.";
const HDR_LONG_HELP: &str = "Prepend a 128 byte AMSDOS header so that the output can be
put on a disk as is.  The name should be in 8.3 form, e.g., HELLO.BAS";

fn file_arg(help: &'static str, req: bool) -> Arg {
    Arg::new("file").short('f').long("file").value_name("NAME").required(req).help(help)
}

fn console_arg() -> Arg {
    Arg::new("console").long("console").help("format for console unconditionally")
        .required(false)
        .action(ArgAction::SetTrue)
        .long_help("even if the output context is a file or pipe, format it for the console")
}

fn indent_arg() -> Arg {
    Arg::new("indent").long("indent").help("JSON indentation, omit to minify")
        .value_name("SPACES")
        .value_parser(value_parser!(u16).range(0..16))
        .required(false)
}

fn dimg_arg(req: bool) -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image or archive")
        .value_name("PATH")
        .value_hint(ValueHint::FilePath)
        .required(req)
}

pub fn build_cli() -> Command {
    let long_help = "cpckit is always invoked with exactly one of several subcommands.
The subcommands are generally designed to function as nodes in a pipeline.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
list a disk image:     `cpckit catalog -d mydisk.dsk`
list an archive:       `cpckit catalog -d games.zip`
listing from image:    `cpckit get -f hello.bas -d mydisk.dsk`
detokenize from image: `cpckit get -f hello.bas -t raw -d mydisk.dsk | cpckit detokenize`
tokenize to file:      `cpckit tokenize --header HELLO.BAS < hello.txt > hello.bas`
everything at once:    `cpckit load -d games.zip`";

    let get_types = ["raw", "auto"];

    let mut main_cmd = Command::new("cpckit")
        .about("Amstrad CPC BASIC programs, disk images, and archives.")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("get")
            .arg(file_arg("name of the file inside the container",true))
            .arg(Arg::new("type").long("type").short('t').help("type of the item")
                .value_name("TYPE").required(false).value_parser(get_types).default_value("auto")
                .long_help(T_LONG_HELP)
            )
            .arg(dimg_arg(true))
            .arg(console_arg())
            .about("read a file from a disk image or archive, write to stdout")
            .after_help("inside an archive use <entry>/<file> to reach a file on a disk image\n\n".to_string() + IN_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("catalog")
            .arg(dimg_arg(true))
            .visible_alias("cat")
            .visible_alias("dir")
            .visible_alias("ls")
            .about("write disk image or archive catalog to stdout")
            .after_help(IN_HELP),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("load")
            .arg(dimg_arg(true))
            .about("decode everything that can be found, write to stdout")
            .after_help("Containers are opened one level deep, e.g., the disk images in an archive.
Items that cannot be decoded are reported on stderr, the rest are still listed."),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("geometry")
            .arg(dimg_arg(true))
            .arg(indent_arg())
            .about("write disk format information as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("tokenize")
            .arg(
                Arg::new("header").long("header").help("prepend AMSDOS header with this file name").value_name("NAME")
                    .required(false)
                    .long_help(HDR_LONG_HELP),
            )
            .arg(console_arg())
            .visible_alias("tok")
            .about("read from stdin, tokenize, write to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("detokenize")
            .arg(
                Arg::new("protected").long("protected").help("the program is protected").action(ArgAction::SetTrue)
                    .long_help("unprotect before detokenizing, only needed if there is no AMSDOS header"),
            )
            .visible_alias("dtok")
            .about("read from stdin, detokenize, write to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("completions")
            .arg(
                Arg::new("shell").short('s').long("shell").help("shell target").value_name("NAME")
                    .required(true)
                    .value_parser(["bash","elv","fish","ps1","zsh"])
            )
            .about("write completions script to stdout for the specified shell")
    );
    return main_cmd;
}
