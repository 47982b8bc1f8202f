// bin/esp32smarty.rs

#![warn(clippy::large_futures)]

use esp_idf_hal::{
    delay::{FreeRtos, NON_BLOCK},
    gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, InputPin, Output, PinDriver},
    peripherals::Peripherals,
    uart,
    units::Hertz,
};
use esp_idf_sys::esp;
use esp32smarty::*;

const CONFIG_RESET_COUNT: i32 = 9;

/// Meter side of the P1 port, receive only.
struct UartPort<'d> {
    uart: uart::UartDriver<'d>,
}

impl ByteSource for UartPort<'_> {
    fn bytes_available(&mut self) -> usize {
        self.uart.remaining_read().unwrap_or(0)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.uart.read(&mut buf, NON_BLOCK) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // tokio needs eventfd on esp-idf
    #[allow(clippy::needless_update)]
    let vfs_config = esp_idf_sys::esp_vfs_eventfd_config_t {
        max_fds: 1,
        ..Default::default()
    };
    esp! { unsafe { esp_idf_sys::esp_vfs_eventfd_register(&vfs_config) } }?;

    info!("Hello.");
    info!("Starting up, firmware version {FW_VERSION}");

    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let ns = env!("CARGO_BIN_NAME");
    let mut nvs = match nvs::EspNvs::new(nvs_default_partition, ns, true) {
        Ok(nvs) => {
            info!("Got namespace {ns:?} from default partition");
            nvs
        }
        Err(e) => panic!("Could not get namespace {ns}: {e:?}"),
    };

    let config = match MyConfig::from_nvs(&mut nvs) {
        None => {
            error!("Could not read nvs config, using defaults");
            let c = MyConfig::default();
            c.to_nvs(&mut nvs)?;
            info!("Successfully saved default config to nvs.");
            c
        }
        Some(c) => c,
    };
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let button = PinDriver::input(pins.gpio9.downgrade_input())?;

    // UART1: GPIO20=RX from meter, GPIO21=TX (unused)
    let uart_cfg = uart::config::Config::new()
        .baudrate(Hertz(config.uart_baudrate))
        .rx_fifo_size(MAX_TELEGRAM_LEN);
    let uart = uart::UartDriver::new(
        peripherals.uart1,
        pins.gpio21,
        pins.gpio20,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_cfg,
    )?;

    // SAFETY: the request pin number comes from config and is not used elsewhere
    let request_pin = unsafe { AnyOutputPin::new(i32::from(config.data_request_pin)) };
    let mut request_pin: PinDriver<'_, AnyOutputPin, Output> = PinDriver::output(request_pin)?;
    // idle: no data requested
    request_pin.set_high()?;

    let meter = SmartyMeter::from_config(&config, UartPort { uart }, request_pin)?;

    let state = Box::pin(MyState::new(config).with_nvs(nvs));
    let shared_state = Arc::new(state);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(async move {
            info!("Entering main loop...");
            tokio::select! {
                _ = Box::pin(poll_reset(shared_state.clone(), button)) => { error!("poll_reset() ended."); }
                res = Box::pin(read_meter(shared_state.clone(), meter)) => { error!("read_meter() ended: {res:?}"); }
            };
        }));

    info!("main() finished, reboot.");
    FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

async fn poll_reset(state: Arc<Pin<Box<MyState>>>, button: PinDriver<'_, AnyInputPin, Input>) -> AppResult<()> {
    let mut uptime: usize = 0;
    loop {
        sleep(Duration::from_secs(2)).await;

        uptime += 2;
        *(state.uptime.write().await) = uptime;

        if button.is_low() {
            Box::pin(reset_button(&state, &button)).await?;
        }
    }
}

async fn reset_button<'a>(
    state: &Arc<Pin<Box<MyState>>>,
    button: &PinDriver<'a, AnyInputPin, Input>,
) -> AppResult<()> {
    let mut reset_cnt = CONFIG_RESET_COUNT;

    while button.is_low() {
        error!("Reset? {reset_cnt}");

        if reset_cnt == 0 {
            error!("Factory resetting...");

            match state.nvs.write().await.as_mut() {
                Some(nvs) => MyConfig::default().to_nvs(nvs)?,
                None => error!("No nvs handle, cannot save default config"),
            }
            sleep(Duration::from_millis(2000)).await;
            esp_idf_hal::reset::restart();
        }

        reset_cnt -= 1;
        sleep(Duration::from_millis(500)).await;
    }
    Ok(())
}
// EOF
