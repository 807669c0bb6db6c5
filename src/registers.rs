//! Register layouts for the angle sensor command words and the I2C bus controller.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

/// Angle sensor register holding the filter time constant.
pub const REG_FILTER: u8 = 0x0E;

/// Largest block the I2C controller can move in one transfer (`NBYTES` width).
pub const MAX_TRANSFER_LEN: usize = 255;

/// Operation encoded in the top bits of an angle sensor command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum Opcode {
    /// Plain angle read; the sensor shifts out the current angle.
    Angle = 0b000,
    /// Register read; the value comes back on the following transfer.
    ReadRegister = 0b010,
    /// Register write; the sensor echoes the stored value on the following transfer.
    WriteRegister = 0b100,
}

/// 16-bit command word shifted into the angle sensor.
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderCommand {
    // Register payload for writes (bits 7:0).
    pub value: B8,
    // Register address (bits 12:8).
    pub register: B5,
    // Operation selector (bits 15:13).
    pub opcode: Opcode,
}

impl EncoderCommand {
    /// Word that samples the angle without side effects.
    pub fn angle() -> Self {
        Self::new().with_opcode(Opcode::Angle)
    }

    /// Word requesting a register read.
    pub fn read(register: u8) -> Self {
        Self::new()
            .with_opcode(Opcode::ReadRegister)
            .with_register(register & 0x1F)
    }

    /// Word writing `value` into `register`.
    pub fn write(register: u8, value: u8) -> Self {
        Self::new()
            .with_opcode(Opcode::WriteRegister)
            .with_register(register & 0x1F)
            .with_value(value)
    }
}

impl From<u16> for EncoderCommand {
    fn from(value: u16) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<EncoderCommand> for u16 {
    fn from(value: EncoderCommand) -> Self {
        u16::from_le_bytes(value.into_bytes())
    }
}

/// Word shifted out by the angle sensor after a register access.
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterResponse {
    #[skip]
    __: B8,
    // Register contents (bits 15:8).
    pub value: B8,
}

impl From<u16> for RegisterResponse {
    fn from(value: u16) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

/// Bitfield representation of the I2C controller `CR2` register.
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cr2 {
    // Slave address, 7-bit addresses live in bits 7:1 (bits 9:0).
    pub sadd: B10,
    // Transfer direction, set for reads (bit 10).
    pub rd_wrn: bool,
    // 10-bit addressing mode (bit 11).
    pub add10: bool,
    // 10-bit header only read direction (bit 12).
    pub head10r: bool,
    // Start generation, cleared by hardware once sent (bit 13).
    pub start: bool,
    // Stop generation (bit 14).
    pub stop: bool,
    // NACK generation in slave mode (bit 15).
    pub nack: bool,
    // Number of bytes in the transfer (bits 23:16).
    pub nbytes: B8,
    // NBYTES reload mode (bit 24).
    pub reload: bool,
    // Automatic stop after NBYTES (bit 25).
    pub autoend: bool,
    // Packet error checking byte (bit 26).
    pub pecbyte: bool,
    #[skip]
    __: B5,
}

impl Cr2 {
    /// Start condition sending one register-address byte, no stop afterwards.
    pub fn register_write(slave_address: u8) -> Self {
        Self::new()
            .with_start(true)
            .with_nbytes(1)
            .with_sadd(u16::from(slave_address & 0x7F) << 1)
    }

    /// Repeated start reading `len` bytes, stopping automatically at the end.
    pub fn block_read(slave_address: u8, len: u8) -> Self {
        Self::new()
            .with_start(true)
            .with_rd_wrn(true)
            .with_autoend(true)
            .with_nbytes(len)
            .with_sadd(u16::from(slave_address & 0x7F) << 1)
    }
}

impl From<u32> for Cr2 {
    fn from(value: u32) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<Cr2> for u32 {
    fn from(value: Cr2) -> Self {
        u32::from_le_bytes(value.into_bytes())
    }
}

/// Bitfield representation of the I2C controller `ISR` register.
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Isr {
    // Transmit data register empty (bit 0).
    pub txe: bool,
    // Transmit interrupt status (bit 1).
    pub txis: bool,
    // Receive data register not empty (bit 2).
    pub rxne: bool,
    // Address matched in slave mode (bit 3).
    pub addr: bool,
    // NACK received (bit 4).
    pub nackf: bool,
    // Stop detected (bit 5).
    pub stopf: bool,
    // Transfer complete, NBYTES moved without AUTOEND (bit 6).
    pub tc: bool,
    // Transfer complete in reload mode (bit 7).
    pub tcr: bool,
    // Bus error (bit 8).
    pub berr: bool,
    // Arbitration lost (bit 9).
    pub arlo: bool,
    // Overrun or underrun (bit 10).
    pub ovr: bool,
    // PEC error (bit 11).
    pub pecerr: bool,
    // SCL timeout (bit 12).
    pub timeout: bool,
    // SMBus alert (bit 13).
    pub alert: bool,
    #[skip]
    __: B1,
    // Bus busy (bit 15).
    pub busy: bool,
    // Transfer direction in slave mode (bit 16).
    pub dir: bool,
    // Matched address code in slave mode (bits 23:17).
    pub addcode: B7,
    #[skip]
    __: B8,
}

impl From<u32> for Isr {
    fn from(value: u32) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<Isr> for u32 {
    fn from(value: Isr) -> Self {
        u32::from_le_bytes(value.into_bytes())
    }
}

/// Bitfield representation of the I2C controller `ICR` register (write-one-to-clear).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Icr {
    #[skip]
    __: B3,
    // Address matched flag clear (bit 3).
    pub addrcf: bool,
    // NACK flag clear (bit 4).
    pub nackcf: bool,
    // Stop detection flag clear (bit 5).
    pub stopcf: bool,
    #[skip]
    __: B2,
    // Bus error flag clear (bit 8).
    pub berrcf: bool,
    // Arbitration lost flag clear (bit 9).
    pub arlocf: bool,
    // Overrun/underrun flag clear (bit 10).
    pub ovrcf: bool,
    // PEC error flag clear (bit 11).
    pub peccf: bool,
    // Timeout flag clear (bit 12).
    pub timoutcf: bool,
    // Alert flag clear (bit 13).
    pub alertcf: bool,
    #[skip]
    __: B18,
}

impl Icr {
    /// Value clearing only the NACK flag.
    pub fn clear_nack() -> Self {
        Self::new().with_nackcf(true)
    }
}

impl From<Icr> for u32 {
    fn from(value: Icr) -> Self {
        u32::from_le_bytes(value.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_command_words_match_wire_format() {
        assert_eq!(u16::from(EncoderCommand::angle()), 0x0000);
        assert_eq!(u16::from(EncoderCommand::read(REG_FILTER)), 0x4E00);
        assert_eq!(u16::from(EncoderCommand::write(REG_FILTER, 0x77)), 0x8E77);
    }

    #[test]
    fn encoder_command_decodes_fields() {
        let command = EncoderCommand::from(0x8E33);
        assert_eq!(command.opcode(), Opcode::WriteRegister);
        assert_eq!(command.register(), REG_FILTER);
        assert_eq!(command.value(), 0x33);
    }

    #[test]
    fn register_response_takes_upper_byte() {
        assert_eq!(RegisterResponse::from(0x7712).value(), 0x77);
    }

    /// Validates CR2 field positions against the controller reference manual.
    #[test]
    fn cr2_layout_matches_reference_manual() {
        let write = Cr2::register_write(0x40);
        assert_eq!(u32::from(write), (1 << 13) | (1 << 16) | (0x40 << 1));

        let read = Cr2::block_read(0x40, 6);
        assert_eq!(
            u32::from(read),
            (1 << 25) | (6 << 16) | (1 << 13) | (1 << 10) | (0x40 << 1)
        );
    }

    #[test]
    fn cr2_masks_slave_address_to_seven_bits() {
        assert_eq!(Cr2::register_write(0xC0).sadd(), 0x40 << 1);
    }

    #[test]
    fn isr_flag_positions() {
        let isr = Isr::from((1 << 2) | (1 << 4) | (1 << 6) | (1 << 15));
        assert!(isr.rxne());
        assert!(isr.nackf());
        assert!(isr.tc());
        assert!(isr.busy());
        assert!(!isr.txe());
        assert!(!isr.stopf());
    }

    #[test]
    fn icr_clear_nack_sets_bit_four() {
        assert_eq!(u32::from(Icr::clear_nack()), 1 << 4);
    }
}
