#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use modular_bitfield_msb::prelude::*;

/// SFP Status/Control Register (STATUS_CONTROL) - A2h byte 110
///
/// SFF-8472 optional status/control bits.
///
/// * TX_Disable_State: state of the TX_DISABLE pin.
/// * Soft_TX_Disable_Select: writable, disables the transmitter.
/// * RS1_State / RS0_State: state of the rate select pins.
/// * Soft_RS0_Select: writable, rate select.
/// * TX_Fault_State: state of the TX_FAULT pin.
/// * Rx_LOS_State: receiver loss of signal.
/// * Data_Ready_Bar_State: 0 once the transceiver is powered up and A2h data is valid.
///
#[bitfield(bits=8)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct STATUS_CONTROL {
    pub TX_Disable_State: B1,
    pub Soft_TX_Disable_Select: B1,
    pub RS1_State: B1,
    pub RS0_State: B1,
    pub Soft_RS0_Select: B1,
    pub TX_Fault_State: B1,
    pub Rx_LOS_State: B1,
    pub Data_Ready_Bar_State: B1,
}
