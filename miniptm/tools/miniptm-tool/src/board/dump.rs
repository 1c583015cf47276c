use renesas_cm_pac::device::GPIOS_COUNT;

use super::bus::BusTransaction;
use super::device::{Board, Result};
use super::sfp::SfpModule;

const LINE: u16 = 16;

pub fn registers_dump_page<B: BusTransaction>(board: &mut Board<B>, page: u8) -> Result<()> {
    let base = u16::from(page) << 8;
    let mut dpll = board.dpll();

    for line in 0..(0x100 / LINE) {
        let address = base + line * LINE;
        let mut values = [0u8; LINE as usize];
        dpll.read_block(address, &mut values)?;

        print!("{address:04x}:");
        for value in values {
            print!(" {value:02x}");
        }
        println!();
    }

    Ok(())
}

pub fn gpio_dump<B: BusTransaction>(board: &mut Board<B>, pin: Option<usize>) -> Result<()> {
    let pins = match pin {
        Some(pin) => pin..pin + 1,
        None => 0..GPIOS_COUNT,
    };

    let mut gpios = board.gpios();
    for pin in pins {
        match gpios.read_mode(pin)? {
            Some(state) => println!("GPIO{pin} mode={} value={}", state.mode, u8::from(state.level)),
            None => println!("GPIO{pin} not present"),
        }
    }

    Ok(())
}

pub fn sfp_dump(module: &SfpModule) {
    if !module.present() {
        println!("SFP{}\tempty", module.slot);
        return;
    }

    if let Some(vendor) = &module.vendor {
        println!("SFP{}\ttype=0x{:02x} vendor=\"{}\" part=\"{}\" serial=\"{}\"",
            module.slot, vendor.module_type, vendor.vendor_name, vendor.part_number, vendor.serial_number,
        );
    }

    match &module.diagnostics {
        Some(d) => {
            let tx = match d.tx_power_dbm {
                Some(dbm) => format!("{dbm:.2}dBm"),
                None => "off".to_string(),
            };
            println!("\ttemperature={:.2}C tx={} rx={:.2}dBm", d.temperature_c, tx, d.rx_power_dbm);
        },
        None => println!("\tno diagnostics"),
    }

    if let Some(status) = module.status_control() {
        println!("\t{:?}", status);
    }
}
