#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::fmt::Display;

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

use ecolog_core::app_state::{RunState, bring_up};
use ecolog_core::clock::{Clock, Ds3231, ElapsedMillis, FixedTimeSource, Timestamp};
use ecolog_core::config::NodeConfig;
use ecolog_core::radio::RadioSession;
use ecolog_core::sensors::{BH1750Sensor, BME280Sensor, SensorHub};
use ecolog_core::storage::SdCardStore;
use ecolog_firmware::async_i2c_bus::SharedI2c;
use ecolog_firmware::board;

/// Idle time between scheduler passes.
const PASS_INTERVAL: Duration = Duration::from_millis(100);
/// How often the halted node repeats its failure.
const HALTED_REPORT_INTERVAL: Duration = Duration::from_secs(10);

const RADIO_KEY: &str = env!("ECOLOG_RADIO_KEY");
const BUILD_EPOCH: &str = env!("ECOLOG_BUILD_EPOCH");

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn uptime() -> ElapsedMillis {
    // The scheduler works on a wrapping 32-bit counter.
    ElapsedMillis::from_millis(Instant::now().as_millis() as u32)
}

fn build_time() -> Option<Timestamp> {
    let secs = BUILD_EPOCH.parse().ok()?;
    Timestamp::from_unix_secs(secs).ok()
}

/// Terminal state after a failed startup.
async fn halt(cause: impl Display) -> ! {
    info!("Run state: {:?}", RunState::Halted);
    loop {
        error!("Node halted: {}", cause);
        Timer::after(HALTED_REPORT_INTERVAL).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("ecolog starting");

    let i2c_bus = match board::init_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11) {
        Ok(bus) => bus,
        Err(e) => halt(e).await,
    };
    board::enable_power_rails(SharedI2c::new(i2c_bus)).await;

    let mut rtc = Ds3231::new(SharedI2c::new(i2c_bus));
    match rtc.lost_power().await {
        Ok(true) => match build_time() {
            Some(at) => {
                warn!("RTC lost power, setting it to build time {}", at);
                if let Err(e) = rtc.set(&at).await {
                    warn!("RTC could not be set: {}", e);
                }
            }
            None => warn!("RTC lost power and no build time is available"),
        },
        Ok(false) => {}
        Err(e) => warn!("RTC status unreadable: {}", e),
    }

    // File timestamps are fixed at boot; the CSV rows carry the live RTC time.
    let boot_time = match rtc.now().await {
        Ok(now) => Some(now),
        Err(_) => build_time(),
    };
    let Some(boot_time) = boot_time else {
        halt("no usable time for the SD card filesystem").await
    };

    let sd_card = match board::init_sd_card(
        peripherals.SPI2,
        peripherals.GPIO36,
        peripherals.GPIO37,
        peripherals.GPIO35,
        peripherals.GPIO4,
    ) {
        Ok(card) => card,
        Err(e) => halt(e).await,
    };
    let store = SdCardStore::new(sd_card, FixedTimeSource::new(boot_time));

    let (link, modem_power) = match board::init_modem(
        peripherals.UART1,
        peripherals.GPIO17,
        peripherals.GPIO18,
        peripherals.GPIO9,
    ) {
        Ok(modem) => modem,
        Err(e) => halt(e).await,
    };

    let mut node_config = NodeConfig::default();
    node_config.radio.network_key = RADIO_KEY.into();

    let radio = RadioSession::new(link, modem_power, Delay, node_config.radio.clone());
    let hub = SensorHub::new(
        BME280Sensor::new(SharedI2c::new(i2c_bus), Delay),
        BH1750Sensor::new(SharedI2c::new(i2c_bus), Delay),
        rtc,
    );

    let mut node = match bring_up(&node_config, hub, store, radio, uptime).await {
        Ok(node) => node,
        Err(e) => halt(e).await,
    };

    loop {
        let outcome = node.run_pass(uptime()).await;
        if let Some(payload) = outcome.sent {
            info!("Send window closed, payload {}", payload);
        }
        Timer::after(PASS_INTERVAL).await;
    }
}
