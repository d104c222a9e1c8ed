#[macro_use]
extern crate clap;

use clap::{Arg, SubCommand};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use zasm::assembler::parse_literal;
use zasm::Assembler;
use zdis::{Config, OutputFormatter};

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Asm(zasm::Error),
    Dis(zdis::Error),
    Io(std::io::Error, IOErrorContext, PathBuf),
    BadSize(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "Reading input",
                    IOErrorContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => write!(f, "Assembling input failed: {}", err),
            Error::Dis(err) => write!(f, "Disassembling input failed: {}", err),
            Error::BadSize(s) => write!(f, "\"{}\" is not a valid size (decimal or 0x... hex)", s),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .subcommand(
            SubCommand::with_name("asm")
                .about("Assembles Z80 source into a flat binary image")
                .arg(Arg::with_name("src").short("f").long("file").takes_value(true).value_name("SRC").required(true).help("Assembly source file"))
                .arg(Arg::with_name("out").short("o").long("output").takes_value(true).value_name("BIN").required(true).help("Output binary file"))
                .arg(Arg::with_name("size").short("s").long("size").takes_value(true).value_name("SIZE").help("Zero-fill the output to this size, placing each region at its true address")),
        )
        .subcommand(
            SubCommand::with_name("disasm")
                .about("Disassembles one or more raw images into Z80 assembly text")
                .arg(Arg::with_name("img").short("i").long("image").takes_value(true).multiple(true).number_of_values(1).value_name("IMG").required(true).help("Raw image file(s), concatenated in order"))
                .arg(Arg::with_name("config").short("c").long("config").takes_value(true).value_name("CONFIG").help("Config file with [data]/[chr] sections"))
                .arg(Arg::with_name("start").short("s").long("start").takes_value(true).value_name("START").help("Address the first byte is loaded at (default 0)"))
                .arg(Arg::with_name("no_dump").short("n").long("no-dump").help("Suppress the address/byte-dump columns"))
                .arg(Arg::with_name("out").short("o").long("output").takes_value(true).value_name("OUT").help("Output text file (default stdout)")),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("asm", Some(sub)) => run_asm(sub),
        ("disasm", Some(sub)) => run_disasm(sub),
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run_asm(matches: &clap::ArgMatches) -> Result<(), Error> {
    let src_path = Path::new(matches.value_of("src").unwrap());
    let out_path = PathBuf::from(matches.value_of("out").unwrap());
    let size = matches.value_of("size").map(parse_size).transpose()?;

    let mut input = String::new();
    File::open(src_path)
        .and_then(|f| BufReader::new(f).read_to_string(&mut input))
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, src_path.to_owned()))?;

    let assembler = Assembler::new();
    let lines = assembler.assemble(&input).map_err(Error::Asm)?;

    let image = match size {
        Some(size) => zasm::emit::to_binary_sized(&lines, size),
        None => zasm::emit::to_binary(&lines),
    };

    let mut writer = BufWriter::new(File::create(&out_path).map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, out_path.clone()))?);
    writer.write_all(&image).map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, out_path.clone()))?;
    Ok(())
}

fn run_disasm(matches: &clap::ArgMatches) -> Result<(), Error> {
    let mut buf = Vec::new();
    for img_path in matches.values_of("img").unwrap() {
        let path = Path::new(img_path);
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|f| BufReader::new(f).read_to_end(&mut bytes))
            .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
        buf.extend(bytes);
    }
    if buf.len() > 0x10000 {
        return Err(Error::Dis(zdis::Error(zdis::ErrorKind::BufferTooLarge(buf.len()))));
    }

    let config = match matches.value_of("config") {
        Some(config_path) => {
            let path = Path::new(config_path);
            let mut text = String::new();
            File::open(path)
                .and_then(|f| BufReader::new(f).read_to_string(&mut text))
                .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
            Config::parse(&text).map_err(Error::Dis)?
        }
        None => Config::empty(),
    };

    let start = matches.value_of("start").map(parse_size).transpose()?.unwrap_or(0) as u16;
    let lines = zdis::disassemble_lines(&buf, start, &config);

    let text = if matches.is_present("no_dump") {
        zdis::compact_formatter().format(&lines)
    } else {
        zdis::default_formatter().format(&lines)
    };

    match matches.value_of("out") {
        Some(out_path) => {
            let path = PathBuf::from(out_path);
            let mut writer = BufWriter::new(File::create(&path).map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.clone()))?);
            writer.write_all(text.as_bytes()).map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path))?;
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn parse_size(token: &str) -> Result<usize, Error> {
    parse_literal(token).map(|v| v as usize).ok_or_else(|| Error::BadSize(token.to_string()))
}
