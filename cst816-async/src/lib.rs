//! CST816 Capacitive Touchscreen Controller

#![no_std]

use core::fmt::{self, Debug};

use bondrewd::Bitfields;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::{delay::DelayNs, digital::Wait, i2c::I2c};

/// Default I²C address for the CST816
pub const DEFAULT_ADDR: u8 = 0x15;

// Registers
const REG_TOUCH_REPORT: u8 = 0x01;
const REG_FW_VERSION: u8 = 0x15;
const REG_STANDBY: u8 = 0xA5;
const REG_VERSION_INFO: u8 = 0xA7;

const STANDBY: u8 = 0x03;

const REPORT_LEN: usize = 6;

// Reset timing, in milliseconds
const RESET_SETTLE_MS: u32 = 50;
const RESET_PULSE_MS: u32 = 5;
const VERSION_QUERY_GAP_MS: u32 = 5;

const SECTOR_HEIGHT: u16 = 255;
const RADIAL_BUTTON_Y: u16 = 104;

/// Any type of error which may occur while interacting with the device
#[derive(Debug)]
pub enum Error<E> {
    /// Some error originating from the communication bus
    BusError(E),
    /// Reading or driving a GPIO pin resulted in an error
    IOError,
}

/// Edge (or level) of the interrupt line which announces a new report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
    /// Either edge
    Change,
    Low,
    High,
}

impl Default for Edge {
    fn default() -> Self {
        Self::Rising
    }
}

/// Gesture recognised by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    None,
    SwipeDown,
    SwipeUp,
    SwipeLeft,
    SwipeRight,
    SingleClick,
    DoubleClick,
    LongPress,
    Unknown(u8),
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::None => "NONE",
            Gesture::SwipeDown => "SWIPE DOWN",
            Gesture::SwipeUp => "SWIPE UP",
            Gesture::SwipeLeft => "SWIPE LEFT",
            Gesture::SwipeRight => "SWIPE RIGHT",
            Gesture::SingleClick => "SINGLE CLICK",
            Gesture::DoubleClick => "DOUBLE CLICK",
            Gesture::LongPress => "LONG PRESS",
            Gesture::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for Gesture {
    fn from(id: u8) -> Self {
        match id {
            0x00 => Gesture::None,
            0x01 => Gesture::SwipeDown,
            0x02 => Gesture::SwipeUp,
            0x03 => Gesture::SwipeLeft,
            0x04 => Gesture::SwipeRight,
            0x05 => Gesture::SingleClick,
            0x0B => Gesture::DoubleClick,
            0x0C => Gesture::LongPress,
            n => Gesture::Unknown(n),
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Touch event reported alongside the coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Down,
    Up,
    Contact,
}

/// Raw touch report, registers 0x01 through 0x06
#[derive(Debug, Clone, Copy, PartialEq, Eq, Bitfields)]
#[bondrewd(default_endianness = "le")]
pub struct TouchReport {
    pub gesture_id: u8,
    pub points: u8,
    #[bondrewd(bit_length = 2)]
    pub event: u8,
    #[bondrewd(bit_length = 6)]
    padding0: u8,
    pub x: u8,
    pub sector: u8,
    pub y: u8,
}

/// The most recent touch reading, plus the identification read at start-up
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchReading {
    pub gesture_id: u8,
    pub points: u8,
    pub event: u8,
    pub x: u16,
    pub y: u16,
    pub sector: u16,
    /// `y + sector * 255`
    pub full_y: u16,
    pub radial_button: bool,
    pub version: u8,
    pub version_info: [u8; 3],
}

impl TouchReading {
    pub fn decode(&self, raw: [u8; REPORT_LEN]) -> Self {
        let report = TouchReport::from_bytes(raw);

        let y = u16::from(report.y);
        let sector = u16::from(report.sector);

        Self {
            gesture_id: report.gesture_id,
            points: report.points,
            event: report.event,
            x: u16::from(report.x),
            y,
            sector,
            full_y: y + sector * SECTOR_HEIGHT,
            radial_button: y == RADIAL_BUTTON_Y,
            ..*self
        }
    }

    pub fn gesture(&self) -> Gesture {
        Gesture::from(self.gesture_id)
    }

    pub fn event_kind(&self) -> Option<EventKind> {
        match self.event {
            0 => Some(EventKind::Down),
            1 => Some(EventKind::Up),
            2 => Some(EventKind::Contact),
            _ => None,
        }
    }
}

/// CST816 driver
pub struct Cst816<I2C, RST, IRQ> {
    /// Underlying I²C peripheral
    i2c: I2C,
    /// Reset pin
    rst: RST,
    /// Interrupt pin
    irq: IRQ,
    address: u8,
    edge: Edge,
    data: TouchReading,
}

impl<I2C, RST, IRQ, E> Cst816<I2C, RST, IRQ>
where
    I2C: I2c<Error = E>,
    RST: OutputPin,
    IRQ: Wait,
    E: Debug,
{
    /// Create a new instance of the driver; no I/O is performed
    pub fn new(i2c: I2C, rst: RST, irq: IRQ) -> Self {
        Self::new_with_address(i2c, rst, irq, DEFAULT_ADDR)
    }

    pub fn new_with_address(i2c: I2C, rst: RST, irq: IRQ, address: u8) -> Self {
        Self {
            i2c,
            rst,
            irq,
            address,
            edge: Edge::default(),
            data: TouchReading::default(),
        }
    }

    /// Reset the device and read its identification
    ///
    /// `edge` is the interrupt line transition awaited by
    /// [Cst816::wait_for_touch].
    pub async fn initialize<D>(&mut self, delay: &mut D, edge: Edge) -> Result<(), Error<E>>
    where
        D: DelayNs,
    {
        self.reset(delay).await?;

        let mut version = [0u8; 1];
        self.read_register(REG_FW_VERSION, &mut version).await?;
        delay.delay_ms(VERSION_QUERY_GAP_MS).await;
        let mut version_info = [0u8; 3];
        self.read_register(REG_VERSION_INFO, &mut version_info).await?;

        self.data.version = version[0];
        self.data.version_info = version_info;
        self.edge = edge;
        log::debug!(
            "CST816 firmware {:#04x}, version info {:02x?}",
            version[0],
            version_info
        );

        Ok(())
    }

    /// Pulse the reset line: high, low, high
    pub async fn reset<D>(&mut self, delay: &mut D) -> Result<(), Error<E>>
    where
        D: DelayNs,
    {
        self.rst.set_high().map_err(|_| Error::IOError)?;
        delay.delay_ms(RESET_SETTLE_MS).await;
        self.pulse_reset(delay).await?;
        log::debug!("CST816 reset");

        Ok(())
    }

    /// Wait for the interrupt line, then read the new report
    pub async fn wait_for_touch(&mut self) -> Result<&TouchReading, Error<E>> {
        let edge = match self.edge {
            Edge::Rising => self.irq.wait_for_rising_edge().await,
            Edge::Falling => self.irq.wait_for_falling_edge().await,
            Edge::Change => self.irq.wait_for_any_edge().await,
            Edge::Low => self.irq.wait_for_low().await,
            Edge::High => self.irq.wait_for_high().await,
        };
        edge.map_err(|_| Error::IOError)?;

        self.read_touch().await
    }

    /// Read the current report without waiting for the interrupt line
    pub async fn read_touch(&mut self) -> Result<&TouchReading, Error<E>> {
        let mut raw = [0u8; REPORT_LEN];
        self.read_register(REG_TOUCH_REPORT, &mut raw).await?;
        self.data = self.data.decode(raw);

        Ok(&self.data)
    }

    /// Put the device into standby
    pub async fn sleep<D>(&mut self, delay: &mut D) -> Result<(), Error<E>>
    where
        D: DelayNs,
    {
        self.pulse_reset(delay).await?;
        self.write_register(REG_STANDBY, STANDBY).await?;
        log::debug!("CST816 entering standby");

        Ok(())
    }

    /// Name of the most recently reported gesture
    pub fn gesture(&self) -> &'static str {
        self.data.gesture().name()
    }

    pub fn data(&self) -> &TouchReading {
        &self.data
    }

    pub fn version(&self) -> u8 {
        self.data.version
    }

    pub fn version_info(&self) -> [u8; 3] {
        self.data.version_info
    }

    /// Destroy the driver, returning the bus and pins
    pub fn release(self) -> (I2C, RST, IRQ) {
        (self.i2c, self.rst, self.irq)
    }

    // -----------------------------------------------------------------------
    // PRIVATE

    async fn pulse_reset<D>(&mut self, delay: &mut D) -> Result<(), Error<E>>
    where
        D: DelayNs,
    {
        self.rst.set_low().map_err(|_| Error::IOError)?;
        delay.delay_ms(RESET_PULSE_MS).await;
        self.rst.set_high().map_err(|_| Error::IOError)?;
        delay.delay_ms(RESET_SETTLE_MS).await;

        Ok(())
    }

    async fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .await
            .map_err(|e| {
                log::warn!("CST816 read of register {:#04x} failed: {:?}", register, e);
                Error::BusError(e)
            })
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|e| {
                log::warn!("CST816 write of register {:#04x} failed: {:?}", register, e);
                Error::BusError(e)
            })
    }
}
