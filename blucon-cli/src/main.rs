use std::error::Error;
use std::time::Duration;

use blucon_lib::PatchReader;
use blucon_lib::command::BlockIndexMode;
use blucon_lib::decoder::GlucoseScale;
use blucon_lib::device::DeviceEvent;
use blucon_lib::protocol::{ProtocolEvent, SessionConfig};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Connect to a BluCon patch reader and print decoded glucose events.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Give up scanning after this many seconds.
    #[arg(long, default_value_t = 60)]
    scan_timeout: u64,

    /// Read the sensor-active-time block before the glucose read.
    #[arg(long)]
    sensor_time: bool,

    /// Fetch and decode the minute-granularity trend series.
    #[arg(long)]
    trend: bool,

    /// Fetch and decode the 15-minute history series.
    #[arg(long)]
    history: bool,

    /// Use the original block-index algorithm without the decrement/wrap step.
    #[arg(long)]
    legacy_index: bool,

    /// Use the /8.5 calibration instead of /10 for the current value.
    #[arg(long)]
    scale_8p5: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = SessionConfig {
        index_mode: if args.legacy_index {
            BlockIndexMode::Direct
        } else {
            BlockIndexMode::DecrementWrap
        },
        scale: if args.scale_8p5 {
            GlucoseScale::DividedBy8p5
        } else {
            GlucoseScale::DividedBy10
        },
        read_sensor_time: args.sensor_time,
        fetch_trend: args.trend,
        fetch_history: args.history,
    };

    debug!(?config, scan_timeout = args.scan_timeout, "session configured");

    let (tx, mut rx) = mpsc::channel(64);
    let mut reader =
        PatchReader::connect(config, tx, Duration::from_secs(args.scan_timeout)).await?;
    println!("Connected to BluCon patch reader");

    let pump = tokio::spawn(async move { reader.run().await });

    while let Some(event) = rx.recv().await {
        match event {
            DeviceEvent::Ready => println!("Adapter ready, scanning..."),
            DeviceEvent::Connected => println!("Peripheral connected"),
            DeviceEvent::Disconnected => println!("Peripheral disconnected"),
            DeviceEvent::Reconnecting => println!("Reconnecting..."),
            DeviceEvent::Error(message) => eprintln!("Error: {message}"),
            DeviceEvent::Protocol(event) => print_protocol_event(event),
        }
    }

    info!("event channel closed, shutting down");
    pump.await??;
    Ok(())
}

fn print_protocol_event(event: ProtocolEvent) {
    match event {
        ProtocolEvent::PatchInfo(info) => println!("Patch info: {info}"),
        ProtocolEvent::SensorActiveTime(age) => println!("{age}"),
        ProtocolEvent::Glucose { timestamp, value } => {
            println!("{timestamp}  glucose: {value} mg/dL");
        }
        ProtocolEvent::PatchReadError => eprintln!("Patch read error reported by transmitter"),
        ProtocolEvent::TrendSeries(records) => {
            println!("Trend:");
            for record in records {
                println!("  {:>4}  {} mg/dL", record.label.to_string(), record.value);
            }
        }
        ProtocolEvent::HistorySeries(records) => {
            println!("History:");
            for record in records {
                println!("  {:>4}  {} mg/dL", record.label.to_string(), record.value);
            }
        }
    }
}
