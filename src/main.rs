use log::info;
use reasm64::code_buffer::CodeBuffer;
use reasm64::persist;
use reasm64::reassembler::Reassembler;
use reasm64::writer::write_listing;
use std::env;
use std::fs;

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    no_listing: bool,
    passes: Option<usize>,
    save_path: Option<String>,
    load_path: Option<String>,
    filename: Option<String>,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" => options.no_listing = true,
            "--passes" => {
                i += 1;
                let value = args.get(i).ok_or("--passes needs a number".to_string())?;
                options.passes = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("invalid pass count: {}", value))?,
                );
            }
            "--save" => {
                i += 1;
                options.save_path = Some(
                    args.get(i)
                        .ok_or("--save needs a file name".to_string())?
                        .clone(),
                );
            }
            "--load" => {
                i += 1;
                options.load_path = Some(
                    args.get(i)
                        .ok_or("--load needs a file name".to_string())?
                        .clone(),
                );
            }
            "-h" | "--help" => options.help = true,
            arg if !arg.starts_with('-') => options.filename = Some(arg.to_string()),
            arg => return Err(format!("unknown option: {}", arg)),
        }
        i += 1;
    }

    if options.load_path.is_some() && options.filename.is_some() {
        return Err("--load restores a session, a program file cannot be given as well".to_string());
    }

    Ok(options)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            usage(&args[0]);
            std::process::exit(1);
        }
    };
    if options.help {
        usage(&args[0]);
        return Ok(());
    }

    let reassembler = match (&options.load_path, &options.filename) {
        (Some(path), None) => {
            let document = fs::read_to_string(path)?;
            let mut reassembler = persist::load(&document)?;
            if let Some(passes) = options.passes {
                reassembler.set_max_passes(passes);
            }
            info!("restored session from {}", path);
            // continue the analysis on the restored classification
            reassembler.run();
            reassembler
        }
        (None, Some(filename)) => {
            let program = fs::read(filename)?;
            let code = CodeBuffer::from_program(&program)?;
            info!(
                "loaded {} code bytes at {}",
                code.len(),
                reasm64::util::hex_word(code.start_address())
            );
            let mut reassembler = Reassembler::new();
            if let Some(passes) = options.passes {
                reassembler.set_max_passes(passes);
            }
            reassembler.reassemble(code);
            reassembler
        }
        _ => {
            usage(&args[0]);
            std::process::exit(1);
        }
    };

    if let Some(path) = options.save_path {
        fs::write(&path, persist::save(&reassembler)?)?;
        info!("saved session to {}", path);
    }

    if !options.no_listing {
        let mut listing = String::new();
        write_listing(reassembler.commands(), &mut listing)?;
        print!("{}", listing);
    }

    Ok(())
}

fn usage(program: &str) {
    eprintln!("Usage: {} [options] <program.prg>", program);
    eprintln!("\nOptions:");
    eprintln!("  -n                Do not print the listing");
    eprintln!("  --passes <n>      Bound on detector passes (default 10)");
    eprintln!("  --save <file>     Save the analysis state as TOML");
    eprintln!("  --load <file>     Restore an analysis state instead of loading a program");
    eprintln!("  -h                Show this help message");
}
