use clap::Parser;
use crossbeam::channel::{unbounded, RecvTimeoutError};
use delaysyncrs::{
    cli::{format_hex, validate_device, Args, Command},
    delay::{delay_time, device_delay_value, validate_bpm},
    handle_device_list, handle_output_list, logging,
    midi::{ClockEvent, ClockEventKind, ClockGenerator, ClockListener, MidirOutput, SysexOutput},
    sysex::{encode, lookup_parameter, SysexMessage},
    ui::{format_delay_table, BpmDisplay},
    DelayCalculator, Error, Result, SendQueue, Settings, SysexConnection, TapTempo,
    TempoEstimator,
};
use dialoguer::Select;
use std::io::{self, BufRead};
use std::time::{Duration, Instant};

fn main() {
    let args = parse_command_line_arguments();
    initialize_logging(args.log_stderr);

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => exit_with_error(&format!("Error loading configuration: {}", e)),
    };

    if let Err(e) = run_command(args.command, &settings) {
        exit_with_error(&format!("Error: {}", e));
    }
}

fn initialize_logging(log_stderr: bool) {
    let result = if log_stderr {
        logging::init_stderr_logger()
    } else {
        logging::init_logger()
    };
    if let Err(e) = result {
        eprintln!("Warning: logging disabled ({})", e);
    }
    log::info!("Application starting");
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn exit_with_error(error_msg: &str) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn run_command(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Devices => list_available_devices(),
        Command::Delays { bpm } => print_delays(bpm),
        Command::Tap => run_tap_tempo(settings),
        Command::Listen { input } => run_listener(input, settings),
        Command::Simulate { bpm, seconds } => run_simulation(bpm, seconds, settings),
        Command::Encode { param, value } => print_encoding(&param, value),
        Command::Send {
            output,
            param,
            value,
        } => send_parameter(&output, &param, value, settings),
        Command::Sync {
            output,
            bpm,
            subdivision,
        } => sync_delays(&output, bpm, &subdivision, settings),
    }
}

fn list_available_devices() -> Result<()> {
    println!("Available MIDI input devices:");
    for device in handle_device_list() {
        println!("  - {}", device);
    }
    println!("Available MIDI output devices:");
    for device in handle_output_list() {
        println!("  - {}", device);
    }
    Ok(())
}

fn print_delays(bpm: f64) -> Result<()> {
    let delays = DelayCalculator::new().all_delay_times(bpm)?;
    print!("{}", format_delay_table(bpm, &delays));
    Ok(())
}

fn run_tap_tempo(settings: &Settings) -> Result<()> {
    let mut tap = TapTempo::new(settings.tap.clone());
    let epoch = Instant::now();
    println!("Press Enter in time with the music, 'q' then Enter to quit.");

    for line in io::stdin().lock().lines() {
        if line?.trim().eq_ignore_ascii_case("q") {
            break;
        }
        let now_ms = epoch.elapsed().as_secs_f64() * 1000.0;
        match tap.tap(now_ms) {
            Some(bpm) => {
                let quarter = delay_time(f64::from(bpm), 1.0)
                    .map(|ms| format!("{:.2} ms", ms))
                    .unwrap_or_else(|_| "out of range".to_string());
                println!("{} BPM ({} taps), quarter note {}", bpm, tap.tap_count(), quarter);
            }
            None => println!("Tap again..."),
        }
    }
    Ok(())
}

fn choose_input_device(input: Option<String>) -> Result<String> {
    let devices = handle_device_list();
    let device_name = match input {
        Some(name) => name,
        None => {
            if devices.is_empty() {
                return Err(Error::DeviceNotFound("no MIDI input devices".to_string()));
            }
            let index = Select::new()
                .with_prompt("Select MIDI clock input")
                .items(&devices)
                .default(0)
                .interact()
                .map_err(|e| Error::DeviceNotFound(format!("no device selected: {}", e)))?;
            devices[index].clone()
        }
    };

    validate_device(&device_name, &devices).map_err(|msg| {
        eprintln!("{}", msg);
        Error::DeviceNotFound(device_name.clone())
    })?;
    Ok(device_name)
}

fn forward_clock_events(estimator: &mut TempoEstimator) -> crossbeam::channel::Receiver<ClockEvent> {
    let (tx, rx) = unbounded();
    for kind in [
        ClockEventKind::BpmChanged,
        ClockEventKind::Start,
        ClockEventKind::Continue,
        ClockEventKind::Stop,
    ] {
        let tx = tx.clone();
        estimator.events().subscribe(kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    rx
}

fn show_clock_event(display: &BpmDisplay, calculator: &DelayCalculator, event: &ClockEvent) {
    match event {
        ClockEvent::BpmChanged(bpm) => match calculator.all_delay_times(f64::from(*bpm)) {
            Ok(delays) => display.set_bpm(*bpm, &delays),
            Err(e) => log::warn!("Cannot compute delays for {} BPM: {}", bpm, e),
        },
        ClockEvent::Start => display.set_transport("playing"),
        ClockEvent::Continue => display.set_transport("playing (continued)"),
        ClockEvent::Stop => display.set_transport("stopped"),
        ClockEvent::Unrecognized(_) => {}
    }
}

fn run_listener(input: Option<String>, settings: &Settings) -> Result<()> {
    let device_name = choose_input_device(input)?;

    let mut estimator = TempoEstimator::with_settings(settings.tempo.clone());
    let events = forward_clock_events(&mut estimator);

    let mut listener = ClockListener::new();
    listener.start(&device_name, estimator)?;
    println!(
        "Listening for MIDI clock on {}. Press Ctrl+C to exit...",
        listener.port_name().unwrap_or(device_name.as_str())
    );

    let display = BpmDisplay::new();
    let calculator = DelayCalculator::new();
    for event in events.iter() {
        show_clock_event(&display, &calculator, &event);
    }

    display.finish();
    listener.stop();
    Ok(())
}

fn run_simulation(bpm: f64, seconds: u64, settings: &Settings) -> Result<()> {
    validate_bpm(bpm)?;

    let mut estimator = TempoEstimator::with_settings(settings.tempo.clone());
    let events = forward_clock_events(&mut estimator);
    let mut generator = ClockGenerator::new(bpm);
    let clock = generator
        .start()
        .ok_or_else(|| Error::UnsupportedTransport("internal clock already running".to_string()))?;

    let display = BpmDisplay::new();
    let calculator = DelayCalculator::new();
    let deadline = Instant::now() + Duration::from_secs(seconds);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match clock.recv_timeout(remaining) {
            Ok(timed) => estimator.handle_message(timed.message, timed.timestamp_ms),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
        for event in events.try_iter() {
            show_clock_event(&display, &calculator, &event);
        }
    }

    let reported = estimator.last_reported_bpm();
    generator.stop();
    display.finish();

    match reported {
        Some(estimated) => println!("Internal clock at {} BPM, estimated {} BPM", bpm, estimated),
        None => println!("Internal clock at {} BPM, no tempo reported", bpm),
    }
    Ok(())
}

fn print_encoding(param: &str, value: i32) -> Result<()> {
    let descriptor = lookup_parameter(param)?;
    let messages = encode(param, value)?;

    match descriptor.enum_label(value) {
        Some(label) => println!("{} = {} ({})", descriptor.name, value, label),
        None => println!("{} = {}", descriptor.name, value),
    }
    for bytes in &messages {
        let decoded = SysexMessage::parse(bytes)?;
        println!(
            "  {}  group {:02X} address {:02X} value {:02X}",
            format_hex(bytes),
            decoded.group,
            decoded.address,
            decoded.value
        );
    }
    Ok(())
}

fn open_send_queue(output: &str, settings: &Settings) -> Result<SendQueue> {
    let port = MidirOutput::open(output)?;
    println!("Connected to MIDI output: {}", port.name());

    let queue = SendQueue::new(SysexConnection::new(&settings.sysex));
    queue.connect(Some(Box::new(port) as Box<dyn SysexOutput>))?;
    Ok(queue)
}

fn send_parameter(output: &str, param: &str, value: i32, settings: &Settings) -> Result<()> {
    let queue = open_send_queue(output, settings)?;
    queue.send(param, value)?;
    println!("Sent {} = {}", param, value);
    Ok(())
}

fn sync_delays(output: &str, bpm: f64, subdivision: &str, settings: &Settings) -> Result<()> {
    let calculator = DelayCalculator::new();
    let (name, factor) = calculator
        .find(subdivision)
        .ok_or_else(|| Error::InvalidSubdivision(format!("'{}' not found", subdivision)))?;
    let delay_ms = delay_time(bpm, factor)?;
    let value = device_delay_value(delay_ms);

    let queue = open_send_queue(output, settings)?;
    let left = queue.enqueue("leftDelay", value)?;
    let right = queue.enqueue("rightDelay", value)?;
    left.wait()?;
    right.wait()?;

    println!(
        "{} at {} BPM = {:.2} ms, sent {} ms to both delay lines",
        name, bpm, delay_ms, value
    );
    Ok(())
}
