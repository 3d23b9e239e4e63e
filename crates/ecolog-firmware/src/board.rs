//! Board bring-up for the ecolog node
//!
//! Pin map (M5Stack CoreS3 carrier):
//!
//! | function        | peripheral | pins                                  |
//! |-----------------|------------|---------------------------------------|
//! | sensors, RTC, PMU | I2C0     | SDA GPIO12, SCL GPIO11                |
//! | SD card         | SPI2       | SCK GPIO36, MOSI GPIO37, MISO GPIO35, CS GPIO4 |
//! | modem           | UART1      | TX GPIO17, RX GPIO18                  |
//! | modem power     | GPIO       | GPIO9                                 |

use axp2101_embedded::AsyncAxp2101;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{
    GPIO4, GPIO9, GPIO11, GPIO12, GPIO17, GPIO18, GPIO35, GPIO36, GPIO37, I2C0, SPI2, UART1,
};
use esp_hal::spi::Mode as SpiMode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::uart::Uart;
use esp_hal::{Async, Blocking};
use log::{info, warn};
use static_cell::StaticCell;
use thiserror_no_std::Error;

use crate::async_i2c_bus::{I2cBus, SharedI2c};
use crate::modem_link::{ModemLink, modem_uart_config};

/// SD cards must be initialised at 100-400 kHz.
const SD_SPI_KHZ: u32 = 400;
const I2C_KHZ: u32 = 400;
/// AXP2101 ALDO4 feeds the SD card slot.
const SD_RAIL_MV: u16 = 3_300;

pub type SharedBusDevice = SharedI2c<'static, I2c<'static, Async>>;
pub type SdSpiDevice = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type BoardSdCard = SdCard<SdSpiDevice, Delay>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("Failed to configure {peripheral}")]
    Config { peripheral: &'static str },
    #[error("SD card chip-select could not be driven")]
    ChipSelect,
}

/// Create I2C0 at 400 kHz and park it behind the shared-bus mutex.
pub fn init_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO12<'static>,
    scl: GPIO11<'static>,
) -> Result<&'static I2cBus, BoardError> {
    static I2C0_BUS: StaticCell<I2cBus> = StaticCell::new();

    let i2c = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(I2C_KHZ)))
        .map_err(|_| BoardError::Config { peripheral: "I2C0" })?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();

    Ok(I2C0_BUS.init(I2cBus::new(i2c)))
}

/// Switch on the LDO rails the peripherals hang off.
///
/// Failures are logged and otherwise ignored.
pub async fn enable_power_rails(i2c: SharedBusDevice) {
    info!("Configuring power management");
    let mut pmu = AsyncAxp2101::new(i2c);

    if let Err(e) = pmu.init().await {
        warn!("Power management init failed: {:?}", e);
        return;
    }

    let rails = [
        ("ALDO1", pmu.enable_aldo1().await),
        ("ALDO2", pmu.enable_aldo2().await),
        ("ALDO3", pmu.enable_aldo3().await),
        ("ALDO4", pmu.enable_aldo4().await),
    ];
    for (rail, result) in rails {
        if let Err(e) = result {
            warn!("Failed to enable {}: {:?}", rail, e);
        }
    }

    if let Err(e) = pmu.set_aldo4_voltage(SD_RAIL_MV).await {
        warn!("Failed to set SD rail voltage: {:?}", e);
    }
    info!("Power rails ready");
}

pub fn init_sd_card(
    spi2: SPI2<'static>,
    sck: GPIO36<'static>,
    mosi: GPIO37<'static>,
    miso: GPIO35<'static>,
    cs: GPIO4<'static>,
) -> Result<BoardSdCard, BoardError> {
    let config = SpiConfig::default()
        .with_frequency(Rate::from_khz(SD_SPI_KHZ))
        .with_mode(SpiMode::_0);
    let spi = Spi::new(spi2, config)
        .map_err(|_| BoardError::Config { peripheral: "SPI2" })?
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso);

    let cs = Output::new(cs, Level::High, OutputConfig::default());
    let device = ExclusiveDevice::new(spi, cs, Delay).map_err(|_| BoardError::ChipSelect)?;

    Ok(SdCard::new(device, Delay))
}

pub fn init_modem(
    uart1: UART1<'static>,
    tx: GPIO17<'static>,
    rx: GPIO18<'static>,
    power: GPIO9<'static>,
) -> Result<(ModemLink, Output<'static>), BoardError> {
    let uart = Uart::new(uart1, modem_uart_config())
        .map_err(|_| BoardError::Config { peripheral: "UART1" })?
        .with_tx(tx)
        .with_rx(rx)
        .into_async();

    // Off until the radio session powers it up.
    let power = Output::new(power, Level::Low, OutputConfig::default());

    Ok((ModemLink::new(uart), power))
}
