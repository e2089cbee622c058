use std::io;

use clap::{Parser, ValueEnum};
use log::{info, warn};
use stderrlog::LogLevelNum;
use wdriscv_core::core::{Config, Core, StepResult, TrapCause};
use wdriscv_core::cs_registers::TrapMode;
use wdriscv_core::Xlen;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Program file to execute, an ELF executable unless `--hex` is given.
    #[arg(required_unless_present = "self_test")]
    program: Option<String>,
    /// Treat the program as a hex file (`@address` lines followed by byte lines).
    #[arg(long)]
    hex: bool,
    /// Width of the `x` registers.
    #[arg(long, value_enum, default_value_t = Width::Rv32)]
    xlen: Width,
    /// Size of memory in bytes.
    #[arg(long, default_value = "0x100000", value_parser = parse_number)]
    memory_size: u64,
    /// Number of `x` registers (16 for an embedded register file).
    #[arg(long, default_value_t = 32)]
    register_count: usize,
    /// Disable the C extension.
    #[arg(long)]
    no_compressed: bool,
    /// Allow misaligned loads and stores instead of trapping.
    #[arg(long)]
    misaligned: bool,
    /// Address to start executing at, overriding the ELF entry point.
    #[arg(long, value_parser = parse_number)]
    start: Option<u64>,
    /// Stop before executing the instruction at this address.
    #[arg(long, value_parser = parse_number)]
    until: Option<u64>,
    /// Stop after this many steps.
    #[arg(long)]
    max_steps: Option<u64>,
    /// Stop after the first trap.
    #[arg(long)]
    stop_on_trap: bool,
    /// Run the built-in self test before loading the program.
    #[arg(long)]
    self_test: bool,
    /// Increase logging verbosity, `-vvv` traces every instruction.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
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
        Width::Rv32 => run_sim::<u32>(&args),
        Width::Rv64 => run_sim::<u64>(&args),
    }
}

fn run_sim<X: Xlen>(args: &Args) -> io::Result<()> {
    let memory_size = usize::try_from(args.memory_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "memory size too large"))?;
    let config = Config {
        memory_size,
        register_count: args.register_count,
        reset_vector: 0,
        compressed: !args.no_compressed,
        support_misaligned_memory_access: args.misaligned,
    };
    let mut core = Core::<X>::new(config)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    if args.self_test {
        if !core.self_test() {
            return Err(io::Error::other("self test failed"));
        }
        println!("Self test passed");
    }
    let Some(program) = &args.program else {
        return Ok(());
    };

    let entry = if args.hex {
        core.load_hex_file(program).map_err(invalid_data)?;
        None
    } else {
        let elf = core.load_elf_file(program).map_err(invalid_data)?;
        Some(elf.entry())
    };
    if let Some(start) = args.start.or(entry) {
        let pc = X::from_u64(start);
        if pc.to_u64() != start {
            warn!("Start address {start:#x} does not fit in {} bits", X::BITS);
        }
        core.set_pc(pc);
    }
    info!("Starting execution at {:#x}", core.pc());

    let until = args.until.map(X::from_u64);
    let mut steps: u64 = 0;
    loop {
        if Some(core.pc()) == until {
            info!("Reached {:#x}", core.pc());
            break;
        }
        if args.max_steps.is_some_and(|max_steps| steps >= max_steps) {
            info!("Step limit of {steps} reached");
            break;
        }
        let result = core.step();
        steps += 1;
        if let StepResult::Trap { cause, epc, tval } = result {
            info!("Trap at {epc:#x}: {cause} (tval {tval:#x})");
            if args.stop_on_trap {
                break;
            }
        }
    }

    print_state(&core, steps);
    Ok(())
}

fn print_state<X: Xlen>(core: &Core<X>, steps: u64) {
    let width = X::BITS as usize / 4 + 2;
    println!("steps: {steps}");
    println!("pc:    {:#0width$x}", core.pc());
    println!("mode:  {}", core.privilege_mode());
    let cs_registers = core.cs_registers();
    let mcause = cs_registers.cause(TrapMode::Machine);
    match TrapCause::from_xcause(mcause) {
        Some(cause) => println!("mcause {mcause:#0width$x} ({cause})"),
        None => println!("mcause {mcause:#0width$x} (reserved)"),
    }
    println!("mepc   {:#0width$x}", cs_registers.epc(TrapMode::Machine));
    println!("mtval  {:#0width$x}", cs_registers.tval(TrapMode::Machine));
    let registers = (0..core.registers().len()).filter_map(|index| {
        core.peek_int_reg(index)
            .map(|value| format!("x{index:<2} {value:#0width$x}"))
    });
    let registers: Vec<String> = registers.collect();
    for row in registers.chunks(4) {
        println!("{}", row.join("  "));
    }
}

fn invalid_data(err: wdriscv_core::loader::LoadError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Parses a decimal number, or a hexadecimal one when prefixed with `0x`.
fn parse_number(s: &str) -> Result<u64, String> {
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    result.map_err(|err| format!("invalid number `{s}`: {err}"))
}
