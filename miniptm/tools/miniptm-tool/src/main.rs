use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, Args, ArgEnum};
use env_logger::Env;
use log::{error, info, warn};

use board::bar::{parse_size, MappedBar, Sdp, SoftwarePins};
use board::bus::BusTransaction;
use board::device::{Board, Result};
use board::dump::{gpio_dump, registers_dump_page, sfp_dump};
use board::eeprom::Image;
use board::gpio::Direction;
use board::i2cdev::find_buses;
use board::sfp::SFP_SLOTS;

mod board;

const ADAPTER_NAME: &str = "MiniPTM I2C Adapter";

fn parse_number(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("'{s}': {e}"))
}

fn parse_page(s: &str) -> std::result::Result<u8, String> {
    u8::try_from(parse_number(s)?).map_err(|_| format!("'{s}': pages are 0x00-0xff"))
}

fn parse_address(s: &str) -> std::result::Result<u16, String> {
    u16::try_from(parse_number(s)?).map_err(|_| format!("'{s}': addresses are 0x0000-0xffff"))
}

fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    u8::try_from(parse_number(s)?).map_err(|_| format!("'{s}': not a byte"))
}

fn parse_eeprom_address(s: &str) -> std::result::Result<u32, String> {
    u32::try_from(parse_number(s)?)
        .ok()
        .filter(|&a| a < 0x20000)
        .ok_or_else(|| format!("'{s}': beyond the end of the EEPROM"))
}

#[derive(Parser)]
#[clap(author, version, about, long_about=None)]
pub(crate) struct Cli {
    /// I2C bus number; by default every bus of a MiniPTM adapter is used.
    #[clap(long)]
    pub bus: Option<u32>,

    /// I2C adapter name to search for.
    #[clap(long, default_value=ADAPTER_NAME, conflicts_with="bus")]
    pub adapter: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(ArgEnum, Clone, Copy)]
pub(crate) enum GpioDirection {
    Input,
    Output,
}

#[derive(Subcommand)]
pub(crate) enum GpioCommand {
    #[clap(name="status")]
    Status {
        pin: Option<usize>,
    },

    #[clap(name="set")]
    Set {
        pin: usize,

        #[clap(arg_enum)]
        direction: GpioDirection,

        /// Drive the output high.
        #[clap(long)]
        high: bool,
    },
}

#[derive(Args)]
pub(crate) struct GpioArgs {
    #[clap(subcommand)]
    command: GpioCommand,
}

#[derive(Args)]
pub(crate) struct SfpArgs {
    /// 1-4; all slots if omitted.
    slot: Option<u8>,
}

#[derive(Args)]
pub(crate) struct DumpArgs {
    #[clap(parse(try_from_str=parse_page))]
    page: u8,
}

#[derive(Args)]
pub(crate) struct WriteArgs {
    /// DPLL register address, e.g. 0xc160.
    #[clap(parse(try_from_str=parse_address))]
    address: u16,

    /// Values for consecutive registers, within one page.
    #[clap(required=true, parse(try_from_str=parse_byte))]
    values: Vec<u8>,
}

#[derive(Args)]
pub(crate) struct EepromArgs {
    /// Raw binary image.
    file: PathBuf,

    #[clap(long, default_value="0", parse(try_from_str=parse_eeprom_address))]
    offset: u32,
}

#[derive(ArgEnum, Clone, Copy)]
pub(crate) enum SdpPin {
    Sdp2,
    Sdp3,
}

#[derive(ArgEnum, Clone, Copy)]
pub(crate) enum SdpAction {
    Get,
    Input,
    High,
    Low,
    LedsOff,
}

#[derive(Args)]
pub(crate) struct SdpArgs {
    /// Physical address of the Ethernet controller's BAR0.
    #[clap(long, parse(try_from_str=parse_number))]
    bar: u64,

    /// BAR size, e.g. 128K.
    #[clap(long)]
    size: String,

    #[clap(arg_enum)]
    pin: SdpPin,

    #[clap(arg_enum)]
    action: SdpAction,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    #[clap(name="gpio")]
    Gpio(GpioArgs),

    #[clap(name="sfp")]
    Sfp(SfpArgs),

    #[clap(name="dump")]
    Dump(DumpArgs),

    #[clap(name="write")]
    Write(WriteArgs),

    #[clap(name="eeprom")]
    Eeprom(EepromArgs),

    #[clap(name="sdp")]
    Sdp(SdpArgs),
}

fn run<B: BusTransaction>(board: &mut Board<B>, command: &Commands) -> Result<()> {
    match command {
        Commands::Gpio(a) => {
            match a.command {
                GpioCommand::Status { pin } => {
                    gpio_dump(board, pin)?;
                },
                GpioCommand::Set { pin, direction, high } => {
                    let direction = match direction {
                        GpioDirection::Input => Direction::Input,
                        GpioDirection::Output => Direction::Output,
                    };
                    board.gpios().configure(pin, direction, high)?;
                },
            }
        },
        Commands::Sfp(a) => {
            let slots = match a.slot {
                Some(slot) => slot..=slot,
                None => 1..=SFP_SLOTS,
            };
            let mut failed = None;
            for slot in slots {
                match board.sfp().poll(slot) {
                    Ok(module) => sfp_dump(&module),
                    Err(e) => {
                        warn!("sfp{slot}: {e}");
                        board.invalidate();
                        failed = Some(e);
                    },
                }
            }
            if let Some(e) = failed {
                return Err(e);
            }
        },
        Commands::Dump(a) => {
            registers_dump_page(board, a.page)?;
        },
        Commands::Write(a) => {
            board.dpll().write_block(a.address, &a.values)?;
        },
        Commands::Eeprom(a) => {
            let mut image = Image::new();
            image.insert(a.offset, fs::read(&a.file)?);
            board.eeprom().program(&image)?;
        },
        Commands::Sdp(a) => {
            run_sdp(a)?;
        },
    }

    Ok(())
}

fn run_sdp(a: &SdpArgs) -> Result<()> {
    let size = parse_size(&a.size)?;
    let mut pins = SoftwarePins::new(MappedBar::open(a.bar, size)?);

    let pin = match a.pin {
        SdpPin::Sdp2 => Sdp::Sdp2,
        SdpPin::Sdp3 => Sdp::Sdp3,
    };

    match a.action {
        SdpAction::Get => println!("{:?}={}", pin, u8::from(pins.get(pin)?)),
        SdpAction::Input => pins.direction_input(pin)?,
        SdpAction::High => pins.direction_output(pin, true)?,
        SdpAction::Low => pins.direction_output(pin, false)?,
        SdpAction::LedsOff => pins.leds_off()?,
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    if let Commands::Sdp(a) = &args.command {
        return run_sdp(a);
    }

    let buses = match args.bus {
        Some(bus) => vec![bus],
        None => find_buses(&args.adapter)?,
    };
    if buses.is_empty() {
        warn!("no I2C adapter named \"{}\" found", args.adapter);
    }

    let mut failed = None;
    for bus in buses {
        info!("board on i2c-{bus}");
        let result = Board::open(bus).and_then(|mut board| run(&mut board, &args.command));
        if let Err(e) = result {
            error!("i2c-{bus}: {e}");
            failed = Some(e);
        }
    }

    match failed {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
