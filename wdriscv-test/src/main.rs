use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::fs::File;
use std::io::{self, Write};
use stderrlog::LogLevelNum;
use wdriscv_core::core::{Config, Core};
use wdriscv_core::Xlen;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Signature file to output signature to
    #[arg(long, short)]
    signature: Option<String>,
    /// Width of the `x` registers.
    #[arg(long, value_enum, default_value_t = Width::Rv32)]
    xlen: Width,
    /// Give up after this many steps.
    #[arg(long, default_value_t = 10_000_000)]
    max_steps: u64,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Elf file to run
    elf: String,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
enum Width {
    #[value(name = "32")]
    Rv32,
    #[value(name = "64")]
    Rv64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    stderrlog::new()
        .verbosity(LogLevelNum::from(args.verbose as usize + 1))
        .modules([module_path!(), "wdriscv_core"])
        .init()
        .map_err(io::Error::other)?;

    match args.xlen {
        Width::Rv32 => run_test::<u32>(&args),
        Width::Rv64 => run_test::<u64>(&args),
    }
}

fn run_test<X: Xlen>(args: &Args) -> io::Result<()> {
    // Compliance tests are linked at 0x8000_0000, so memory has to extend past that.
    let config = Config {
        memory_size: 0x8040_0000,
        ..Config::default()
    };
    let mut core = Core::<X>::new(config)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let elf = core
        .load_elf_file(&args.elf)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    core.set_pc(X::from_u64(elf.entry()));

    let tohost = elf.symbol("tohost").ok_or_else(|| missing_symbol("tohost"))?;

    // Run until the test writes its result to `tohost`.
    let mut steps = 0;
    let result = loop {
        if steps == args.max_steps {
            warn!("Test did not finish within {steps} steps");
            break None;
        }
        core.step();
        steps += 1;
        match core.memory().read_word(tohost) {
            Ok(0) => {}
            Ok(value) => break Some(value),
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "`tohost` lies outside of memory",
                ))
            }
        }
    };
    match result {
        Some(1) => info!("Test passed after {steps} steps"),
        Some(value) => warn!("Test failed: test case {} (after {steps} steps)", value >> 1),
        None => {}
    }

    if let Some(path) = &args.signature {
        let signature_start = elf
            .symbol("begin_signature")
            .ok_or_else(|| missing_symbol("begin_signature"))?;
        let signature_end = elf
            .symbol("end_signature")
            .ok_or_else(|| missing_symbol("end_signature"))?;

        if signature_start % 4 != 0 || signature_end % 4 != 0 || signature_start > signature_end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid signature region",
            ));
        }

        let mut file = File::create(path)?;
        for address in (signature_start..signature_end).step_by(4) {
            let word = core.memory().read_word(address).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("failed to read signature at {address:#x}: {err}"),
                )
            })?;
            writeln!(file, "{word:08x}")?;
        }
    }

    Ok(())
}

fn missing_symbol(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("missing symbol `{name}`"),
    )
}
