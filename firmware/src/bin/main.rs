#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{Async, Config as UartConfig, Uart, UartRx, UartTx};
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;
use ventlink_firmware::ventlink_core::{
    CircularBuffer, Clock, Comms, Consumer, FrameDetector, Producer,
};
use ventlink_firmware::ventlink_proto::{ControllerStatus, GuiStatus};
use ventlink_firmware::{
    EmbassyClock, LedAlarm, LinkConfig, TxChannel, UartTransport, RX_BUFFER_SIZE,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

/// Receive ring buffer between the RX task and the frame detector.
static RX_BUFFER: StaticCell<CircularBuffer<RX_BUFFER_SIZE>> = StaticCell::new();

/// Outbound frame hand-off between `Comms` and the TX task.
static TX_CHANNEL: TxChannel = TxChannel::new();

type LinkComms = Comms<
    Consumer<'static, RX_BUFFER_SIZE>,
    UartTransport<'static>,
    EmbassyClock,
    LedAlarm<'static>,
>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ventlink controller starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = LinkConfig::BAUD_RATE;

    #[cfg(not(feature = "uart-flow-control"))]
    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    #[cfg(feature = "uart-flow-control")]
    let uart = Uart::new_with_rtscts(
        p.UART1,
        p.PIN_8,  // TX
        p.PIN_9,  // RX
        p.PIN_11, // RTS
        p.PIN_10, // CTS
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    let (tx, rx) = uart.split();

    // --- Link Setup ---
    let (producer, consumer) = RX_BUFFER.init(CircularBuffer::new()).split();

    // On-board LED for link fault indication
    let led = Output::new(p.PIN_25, Level::Low);

    let mut comms = Comms::new(
        FrameDetector::new(consumer),
        UartTransport::new(&TX_CHANNEL),
        EmbassyClock,
        LinkConfig::COMMS,
        LedAlarm::new(led),
    );
    if !comms.init() {
        error!("receive path failed to start");
    }

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(rx_task(rx, producer).unwrap());
    spawner.spawn(tx_task(tx, &TX_CHANNEL).unwrap());
    spawner.spawn(control_task(comms).unwrap());

    info!("ventlink initialized, {} baud", LinkConfig::BAUD_RATE);
}

/// RX task - moves UART bytes into the receive ring buffer.
#[embassy_executor::task]
async fn rx_task(mut rx: UartRx<'static, Async>, mut producer: Producer<'static, RX_BUFFER_SIZE>) {
    let mut byte = [0u8; 1];
    let mut dropped: u32 = 0;

    loop {
        match rx.read(&mut byte).await {
            Ok(()) => {
                if producer.put(byte[0]) {
                    if dropped > 0 {
                        warn!("receive buffer overrun, {} bytes dropped", dropped);
                        dropped = 0;
                    }
                } else {
                    dropped = dropped.wrapping_add(1);
                }
            }
            Err(e) => warn!("UART read error: {:?}", e),
        }
    }
}

/// TX task - writes each queued frame and reports completion.
#[embassy_executor::task]
async fn tx_task(mut tx: UartTx<'static, Async>, channel: &'static TxChannel) {
    loop {
        let frame = channel.next_frame().await;
        let result = tx.write(&frame).await;
        channel.finish(result);
    }
}

/// Control task - drives the link on a fixed tick.
///
/// Until the control loop is attached, the active parameters mirror what the
/// GUI last requested.
#[embassy_executor::task]
async fn control_task(mut comms: LinkComms) {
    let mut ticker = Ticker::every(Duration::from_millis(LinkConfig::CONTROL_TICK_MS));
    let mut controller_status = ControllerStatus::default();
    let mut gui_status = GuiStatus::default();

    loop {
        controller_status.uptime_ms = EmbassyClock.uptime_ms();
        comms.handler(&controller_status, &mut gui_status);

        if gui_status.desired_params != controller_status.active_params {
            info!(
                "GUI requested {:?}",
                gui_status.desired_params
            );
            controller_status.active_params = gui_status.desired_params;
        }

        ticker.next().await;
    }
}
