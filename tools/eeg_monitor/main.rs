// tools/eeg_monitor/main.rs
//
// Live metrics monitor for a ThinkGear headset.
// Diagnostic binary — build with `--features cli`.
//
// With no port argument it lists candidate serial ports. Otherwise it opens
// the headset and prints metrics about once a second, driving the decoder
// either from a background reader thread (default) or inline (--polled).

use std::time::{Duration, Instant};

use clap::Parser;

use mindlink::{list_serial_ports, EegConfig, EegDevice};

#[derive(Parser)]
#[command(
    name = "eeg_monitor",
    about = "Print live EEG metrics from a ThinkGear headset"
)]
struct Args {
    /// Serial port (e.g. /dev/cu.usbserial-1101, COM3). Omit to list ports.
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 57_600)]
    baud: u32,

    /// Drive decoding from this process's loop instead of a reader thread
    #[arg(long)]
    polled: bool,

    /// How long to monitor, in seconds
    #[arg(long, default_value_t = 30)]
    seconds: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let port = match args.port {
        Some(p) => p,
        None => {
            let ports = list_serial_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            }
            for info in ports {
                let detail = match (info.manufacturer, info.product) {
                    (Some(m), Some(p)) => format!(" — {} {}", m, p),
                    (_, Some(p)) => format!(" — {}", p),
                    (Some(m), _) => format!(" — {}", m),
                    _ => String::new(),
                };
                println!("{}  [{}]{}", info.port_name, info.port_type, detail);
            }
            return Ok(());
        }
    };

    let mut config = EegConfig::new(port);
    config.baud_rate = args.baud;
    let mut device = EegDevice::open(config)?;

    let report_interval = Duration::from_secs(1);
    if args.polled {
        let deadline = Instant::now() + Duration::from_secs(args.seconds);
        let mut last_report = Instant::now();
        while Instant::now() < deadline {
            // Per-cycle errors are counted in stats; keep polling
            let _ = device.poll_once();
            if last_report.elapsed() >= report_interval {
                report(&device);
                last_report = Instant::now();
            }
        }
    } else {
        device.start()?;
        for _ in 0..args.seconds {
            std::thread::sleep(report_interval);
            report(&device);
        }
        device.stop()?;
    }

    device.close()?;
    Ok(())
}

fn report(device: &EegDevice) {
    let metrics = device.current_metrics();
    let stats = device.stats();
    println!(
        "attention {:>3}  meditation {:>3}  quality {:>3}  buffered {:>5}  packets {} (errors {}, noise bytes {})",
        metrics.attention,
        metrics.meditation,
        metrics.signal_quality,
        device.sample_count(),
        stats.packets_ok,
        stats.total_errors(),
        stats.bytes_discarded,
    );
}
