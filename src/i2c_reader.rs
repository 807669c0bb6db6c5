//! Non-blocking register block reads from an I2C slave.
//!
//! A read is "write one register address, repeated start, read N bytes". It is split
//! into [`I2cReader::start_read`], [`I2cReader::poll`] and [`I2cReader::check_read`] so
//! the control loop can interleave the slow bus cycles with its own work. `poll`
//! advances at most one step per call and never waits on the hardware.
//!
//! The destination buffer is lent to the reader for the whole transaction and handed
//! back by `check_read` once the transaction is complete or has failed.

use crate::config::{Config, ConfigError};
use crate::interface::I2cController;
use crate::registers::{Cr2, Icr, Isr, MAX_TRANSFER_LEN};

/// Position of the reader in the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction; ready for [`I2cReader::start_read`].
    Idle,
    /// Register address queued, waiting for transfer-complete.
    SentRegister,
    /// Repeated start issued; `offset` bytes received so far.
    ReadingData {
        /// Next buffer index to fill.
        offset: usize,
    },
    /// Every byte received; waiting for [`I2cReader::check_read`].
    Complete,
    /// Transaction failed; waiting for [`I2cReader::check_read`].
    Error,
}

impl Phase {
    /// Returns `true` once the transaction has finished, successfully or not.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    const fn in_flight(self) -> bool {
        matches!(self, Self::SentRegister | Self::ReadingData { .. })
    }

    const fn holds_buffer(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Hardware side effect selected by [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Nothing to do this poll.
    None,
    /// Issue the repeated start that reads the whole buffer.
    RepeatedStart,
    /// Move the received byte into `buffer[index]`; `last` also clears NACK.
    StoreByte {
        /// Buffer index receiving the byte.
        index: usize,
        /// Whether this byte completes the transfer.
        last: bool,
    },
    /// Acknowledge the NACK flag.
    ClearNack,
}

/// Computes one transition of the read state machine.
///
/// `len` is the destination buffer length. A NACK observed while a transaction is held,
/// including one already complete, always wins over any other flag in the same
/// snapshot. Idle has no transaction to fail and ignores it.
pub fn step(phase: Phase, flags: Isr, len: usize) -> (Phase, Action) {
    if phase.holds_buffer() && flags.nackf() {
        return (Phase::Error, Action::ClearNack);
    }

    match phase {
        Phase::SentRegister if flags.tc() => {
            (Phase::ReadingData { offset: 0 }, Action::RepeatedStart)
        }
        Phase::ReadingData { offset } if flags.rxne() => {
            let next = offset + 1;
            if next >= len {
                (Phase::Complete, Action::StoreByte { index: offset, last: true })
            } else {
                (
                    Phase::ReadingData { offset: next },
                    Action::StoreByte { index: offset, last: false },
                )
            }
        }
        _ => (phase, Action::None),
    }
}

/// Terminal outcome reported by [`I2cReader::check_read`].
#[derive(Debug, PartialEq, Eq)]
pub enum ReadStatus<'b> {
    /// The transaction is still running, or none was started.
    NoStatus,
    /// Every byte arrived; the filled buffer is handed back.
    Complete(&'b mut [u8]),
    /// The slave NACKed, the bus was busy, the request was invalid or the transfer
    /// stalled. The buffer is handed back with unspecified contents.
    Error(&'b mut [u8]),
}

impl ReadStatus<'_> {
    /// Returns `true` for [`ReadStatus::Complete`] and [`ReadStatus::Error`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NoStatus)
    }
}

enum State<'b> {
    Idle,
    Active {
        phase: Phase,
        slave_address: u8,
        buffer: &'b mut [u8],
    },
}

/// Polled reader for one I2C bus controller.
pub struct I2cReader<'b, C> {
    controller: C,
    config: Config,
    state: State<'b>,
    stalled_polls: u32,
}

impl<'b, C> I2cReader<'b, C> {
    /// Returns the current phase of the transaction.
    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Idle => Phase::Idle,
            State::Active { phase, .. } => *phase,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Provides mutable access to the underlying controller.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Consumes the reader and returns the owned controller.
    pub fn release(self) -> C {
        self.controller
    }
}

impl<'b, C> I2cReader<'b, C>
where
    C: I2cController,
{
    /// Creates the reader and programs the controller timing.
    pub fn new(mut controller: C, config: Config) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        controller.set_timing(config.timing);

        Ok(Self {
            controller,
            config,
            state: State::Idle,
            stalled_polls: 0,
        })
    }

    /// Begins reading `buffer.len()` bytes starting at `register` of `slave_address`.
    ///
    /// If a transaction is already running the call changes nothing and the untouched
    /// buffer comes back as `Err`. Otherwise the request is accepted and its outcome is
    /// reported by [`check_read`](Self::check_read); a controller that still has a start
    /// condition pending, an empty buffer, or one longer than 255 bytes fails the
    /// transaction immediately without touching the bus or the buffer.
    pub fn start_read(
        &mut self,
        slave_address: u8,
        register: u8,
        buffer: &'b mut [u8],
    ) -> core::result::Result<(), &'b mut [u8]> {
        if !matches!(self.state, State::Idle) {
            return Err(buffer);
        }

        self.stalled_polls = 0;
        let slave_address = slave_address & 0x7F;

        let phase = if self.controller.read_cr2().start() {
            warn!("i2c start still pending, read from {:#x} rejected", slave_address);
            Phase::Error
        } else if buffer.is_empty() || buffer.len() > MAX_TRANSFER_LEN {
            warn!("i2c read of {} bytes is not supported", buffer.len());
            Phase::Error
        } else {
            self.controller.write_cr2(Cr2::register_write(slave_address));
            self.controller.write_txdr(register);
            trace!("i2c read {:#x} reg {:#x} len {}", slave_address, register, buffer.len());
            Phase::SentRegister
        };

        self.state = State::Active {
            phase,
            slave_address,
            buffer,
        };
        Ok(())
    }

    /// Advances the transaction by at most one hardware step.
    ///
    /// Call on every control-loop iteration until [`check_read`](Self::check_read)
    /// reports a terminal status. Once terminal only a NACK changes anything: it turns
    /// the outcome into an error and clears the flag. Does nothing while idle.
    pub fn poll(&mut self) {
        let State::Active {
            phase,
            slave_address,
            buffer,
        } = &mut self.state
        else {
            return;
        };
        let flags = self.controller.read_isr();
        let (next, action) = step(*phase, flags, buffer.len());

        match action {
            Action::None => {}
            Action::RepeatedStart => {
                // `start_read` bounds the length to NBYTES.
                let len = buffer.len() as u8;
                self.controller
                    .write_cr2(Cr2::block_read(*slave_address, len));
            }
            Action::StoreByte { index, last } => {
                let byte = self.controller.read_rxdr();
                if let Some(slot) = buffer.get_mut(index) {
                    *slot = byte;
                }
                if last {
                    self.controller.write_icr(Icr::clear_nack());
                }
            }
            Action::ClearNack => {
                debug!("i2c nack from {:#x}", *slave_address);
                self.controller.write_icr(Icr::clear_nack());
            }
        }

        if next != *phase || !phase.in_flight() {
            self.stalled_polls = 0;
            *phase = next;
            return;
        }

        self.stalled_polls = self.stalled_polls.saturating_add(1);
        if let Some(limit) = self.config.poll_timeout {
            if self.stalled_polls >= limit {
                warn!("i2c read from {:#x} stalled in {}", *slave_address, *phase);
                *phase = Phase::Error;
            }
        }
    }

    /// Reports and consumes a terminal outcome.
    ///
    /// On [`ReadStatus::Complete`] or [`ReadStatus::Error`] the reader returns to idle and
    /// hands the buffer back. Before that it returns [`ReadStatus::NoStatus`] and leaves
    /// the transaction running.
    pub fn check_read(&mut self) -> ReadStatus<'b> {
        match core::mem::replace(&mut self.state, State::Idle) {
            State::Active {
                phase: Phase::Complete,
                buffer,
                ..
            } => ReadStatus::Complete(buffer),
            State::Active {
                phase: Phase::Error,
                buffer,
                ..
            } => ReadStatus::Error(buffer),
            state => {
                self.state = state;
                ReadStatus::NoStatus
            }
        }
    }
}
