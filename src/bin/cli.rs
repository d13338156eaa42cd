use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use hwshm::{
    config::{DEFAULT_LIST_READINGS, DEFAULT_SEGMENT_NAME},
    error::ShmError,
    layout::{DecodeLimits, LayoutVariant, SegmentDecoder, SegmentHeader},
    lookup::{LookupKey, TargetedLookup},
    memory::{segment_exists, MappingHandle, SegmentConfig},
    monitor::{poll_once, PollConfig, PollState, SampleStatus, Selector},
    projection::{project, TelemetrySnapshot},
    query::metric_keywords,
    Result,
};
use std::time::Duration;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        if e.is_retryable() {
            eprintln!("Make sure the monitoring application is running with shared memory support enabled.");
        }
        std::process::exit(1);
    }
}

fn build_app<'a, 'b>(default_list_readings: &'a str) -> App<'a, 'b> {
    let layout_arg = Arg::with_name("layout")
        .short("l")
        .long("layout")
        .value_name("LAYOUT")
        .help("Segment layout: adjacency or offset-table")
        .default_value("offset-table")
        .takes_value(true);

    App::new("hwshm-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read hardware telemetry from a shared memory segment")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("segment")
                .short("s")
                .long("segment")
                .value_name("NAME")
                .help("Shared memory segment name")
                .env("HWSHM_SEGMENT")
                .default_value(DEFAULT_SEGMENT_NAME)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .value_name("FILE")
                .help("Read a segment dump from a file instead of shared memory")
                .env("HWSHM_FILE")
                .takes_value(true),
        )
        .subcommand(SubCommand::with_name("probe").about("Check whether the segment exists"))
        .subcommand(
            SubCommand::with_name("list")
                .about("List sensor groups and their first readings")
                .arg(layout_arg.clone())
                .arg(
                    Arg::with_name("max_readings")
                        .short("n")
                        .long("max-readings")
                        .value_name("COUNT")
                        .help("Readings shown per group")
                        .default_value(default_list_readings)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Print every reading")
                .arg(layout_arg.clone())
                .arg(
                    Arg::with_name("json")
                        .long("json")
                        .help("Emit JSON instead of text"),
                ),
        )
        .subcommand(
            SubCommand::with_name("find")
                .about("Look up one reading in an adjacency-layout segment")
                .arg(
                    Arg::with_name("group")
                        .short("g")
                        .long("group")
                        .value_name("ID")
                        .help("Sensor group id (decimal or 0x-prefixed hex)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("instance")
                        .short("i")
                        .long("instance")
                        .value_name("INSTANCE")
                        .help("Sensor group instance")
                        .default_value("0")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("reading")
                        .short("r")
                        .long("reading")
                        .value_name("ID")
                        .help("Reading id (decimal or 0x-prefixed hex)")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("watch")
                .about("Poll one reading and keep a rolling average")
                .arg(layout_arg)
                .arg(
                    Arg::with_name("keyword")
                        .short("k")
                        .long("keyword")
                        .value_name("KEYWORD")
                        .help("Label keyword, highest priority first (overrides --metric)")
                        .multiple(true)
                        .number_of_values(1)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("metric")
                        .short("m")
                        .long("metric")
                        .value_name("METRIC")
                        .help("Built-in keyword set used when no --keyword is given")
                        .possible_values(&["power", "temperature", "clock"])
                        .default_value("power")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("interval")
                        .short("t")
                        .long("interval")
                        .value_name("MILLIS")
                        .help("Delay between polls in milliseconds")
                        .default_value("3000")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("count")
                        .short("c")
                        .long("count")
                        .value_name("COUNT")
                        .help("Stop after this many polls (0 = forever)")
                        .default_value("0")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("settling")
                        .long("settling")
                        .value_name("COUNT")
                        .help("Samples ignored before averaging")
                        .default_value("3")
                        .takes_value(true),
                ),
        )
        .subcommand(SubCommand::with_name("info").about("Show version and layout information"))
}

fn run() -> Result<()> {
    let default_list_readings = DEFAULT_LIST_READINGS.to_string();
    let matches = build_app(&default_list_readings).get_matches();

    let segment = segment_config(&matches);

    match matches.subcommand() {
        ("probe", Some(_)) => handle_probe(&segment),
        ("list", Some(list_matches)) => handle_list(&segment, list_matches),
        ("dump", Some(dump_matches)) => handle_dump(&segment, dump_matches),
        ("find", Some(find_matches)) => handle_find(&segment, find_matches),
        ("watch", Some(watch_matches)) => handle_watch(&segment, watch_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn segment_config(matches: &ArgMatches) -> SegmentConfig {
    match matches.value_of("file") {
        Some(path) => SegmentConfig::file(path),
        None => SegmentConfig::new(matches.value_of("segment").unwrap_or(DEFAULT_SEGMENT_NAME)),
    }
}

fn layout(matches: &ArgMatches) -> Result<LayoutVariant> {
    matches.value_of("layout").unwrap_or("offset-table").parse()
}

fn parse_number<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| ShmError::invalid_parameter(name, "Missing value"))?;
    raw.parse()
        .map_err(|_| ShmError::invalid_parameter(name, format!("Invalid number '{}'", raw)))
}

fn parse_id(matches: &ArgMatches, name: &str) -> Result<u32> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| ShmError::invalid_parameter(name, "Missing value"))?;
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| ShmError::invalid_parameter(name, format!("Invalid id '{}'", raw)))
}

fn handle_probe(segment: &SegmentConfig) -> Result<()> {
    if segment_exists(segment)? {
        println!("Shared memory segment '{}' FOUND.", segment.name);
    } else {
        println!("Shared memory segment '{}' NOT found.", segment.name);
    }
    Ok(())
}

fn print_header(header: &SegmentHeader) {
    match header {
        SegmentHeader::Adjacency(h) => println!(
            "Layout: adjacency, version {}.{}, polling period {} ms, {} groups",
            h.version, h.revision, h.polling_period, h.group_count
        ),
        SegmentHeader::OffsetTable(h) => println!(
            "Layout: offset-table, version {}.{}, poll time {}, {} sensors, {} readings",
            h.version, h.revision, h.poll_time, h.sensors.count, h.readings.count
        ),
    }
}

fn handle_list(segment: &SegmentConfig, matches: &ArgMatches) -> Result<()> {
    let variant = layout(matches)?;
    let max_readings: usize = parse_number(matches, "max_readings")?;

    let mut handle = MappingHandle::open(segment)?;
    let decoder = SegmentDecoder::new(handle.bytes()?, variant, &DecodeLimits::default())?;
    let segment_data = decoder.decode()?;

    print_header(&segment_data.header);
    println!("Found {} sensor groups:\n", segment_data.group_count());

    for group in &segment_data.groups {
        let label = group
            .group
            .labels()
            .map(|(orig, user)| if user.is_empty() { orig } else { user })
            .unwrap_or_default();
        println!(
            "Group {}: ID={:#x}, Inst={}, Readings={} {}",
            group.index,
            group.group.id(),
            group.group.instance(),
            group.readings.len(),
            label
        );

        for (position, reading) in group.readings.iter().take(max_readings).enumerate() {
            let projected = project(&group.group, reading);
            println!(
                "  Reading {}: ID={:#x}, {} = {:.2} {} (min {:.2}, max {:.2})",
                position,
                projected.reading_id,
                projected.display_label(),
                projected.value,
                projected.unit,
                projected.min,
                projected.max
            );
        }
        if group.readings.len() > max_readings {
            println!("  ... ({} more readings)", group.readings.len() - max_readings);
        }
        println!("{}", "-".repeat(50));
    }

    for issue in &segment_data.issues {
        println!("Warning: {}", issue);
    }

    handle.close();
    Ok(())
}

fn handle_dump(segment: &SegmentConfig, matches: &ArgMatches) -> Result<()> {
    let variant = layout(matches)?;
    let mut handle = MappingHandle::open(segment)?;
    let snapshot = TelemetrySnapshot::capture(&handle, variant, &DecodeLimits::default())?;
    handle.close();

    if matches.is_present("json") {
        let json = serde_json::to_string_pretty(&snapshot.readings)
            .map_err(|e| ShmError::invalid_parameter("json", e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    print_header(&snapshot.header);
    for reading in &snapshot.readings {
        println!(
            "[{}] {} = {:.3} {}",
            reading.display_group_label(),
            reading.display_label(),
            reading.value,
            reading.unit
        );
    }
    println!("{} readings, {} issues", snapshot.len(), snapshot.issues.len());
    Ok(())
}

fn handle_find(segment: &SegmentConfig, matches: &ArgMatches) -> Result<()> {
    let key = LookupKey::new(
        parse_id(matches, "group")?,
        parse_id(matches, "instance")?,
        parse_id(matches, "reading")?,
    );

    let mut handle = MappingHandle::open(segment)?;
    let mut lookup = TargetedLookup::new(DecodeLimits::default());
    let found = lookup.find(&handle, key);
    handle.close();

    match found? {
        Some(reading) => println!(
            "{:#x}/{}/{:#x} = {} (min {}, max {})",
            key.group_id, key.instance, key.reading_id, reading.value, reading.min, reading.max
        ),
        None => println!(
            "Reading {:#x} of group {:#x}/{} not found ({} groups searched)",
            key.reading_id,
            key.group_id,
            key.instance,
            lookup.stats().groups_visited
        ),
    }
    Ok(())
}

fn handle_watch(segment: &SegmentConfig, matches: &ArgMatches) -> Result<()> {
    let variant = layout(matches)?;
    let keywords: Vec<String> = match matches.values_of("keyword") {
        Some(values) => values.map(str::to_string).collect(),
        None => {
            let metric = matches.value_of("metric").unwrap_or("power");
            metric_keywords(metric)
                .ok_or_else(|| {
                    ShmError::invalid_parameter("metric", format!("Unknown metric '{}'", metric))
                })?
                .iter()
                .map(|k| k.to_string())
                .collect()
        }
    };
    let count: u64 = parse_number(matches, "count")?;

    let config = PollConfig::default()
        .with_interval(Duration::from_millis(parse_number(matches, "interval")?))
        .with_settling_readings(parse_number(matches, "settling")?);
    config.validate()?;

    let selector = Selector::Keywords(keywords);
    let limits = DecodeLimits::default();
    let mut state = PollState::new(config);
    state.begin_context("default");

    println!(
        "Polling '{}' every {} ms...",
        segment.name,
        state.config().interval.as_millis()
    );

    loop {
        match poll_once(segment, variant, &limits, &selector, &mut state) {
            Ok(Some(outcome)) => match outcome.status {
                SampleStatus::Settling { seen, of } => println!(
                    "{} = {:.2} {} | Settling ({}/{})",
                    outcome.sample.label, outcome.sample.value, outcome.sample.unit, seen, of
                ),
                SampleStatus::Averaged { average, samples } => println!(
                    "{} = {:.2} {} | Average: {:.2} over {} samples",
                    outcome.sample.label,
                    outcome.sample.value,
                    outcome.sample.unit,
                    average,
                    samples
                ),
            },
            Ok(None) => println!("No reading matched the keywords"),
            Err(e) if e.is_retryable() => println!("Segment unavailable: {}", e),
            Err(e) => return Err(e),
        }

        if count != 0 && state.stats().cycles >= count {
            break;
        }
        std::thread::sleep(state.config().interval);
    }

    let stats = state.stats();
    println!(
        "\n{} polls: {} hits, {} misses, {} failures",
        stats.cycles, stats.hits, stats.misses, stats.failures
    );
    for (context, average) in state.averages() {
        println!("{} | Avg: {:.2}", context, average);
    }
    Ok(())
}

fn show_info() -> Result<()> {
    println!("hwshm shared memory telemetry reader");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Default segment: {}", DEFAULT_SEGMENT_NAME);

    println!("\nLayouts:");
    for variant in [LayoutVariant::Adjacency, LayoutVariant::OffsetTable] {
        println!("  - {} (signature {:#010x})", variant, variant.signature());
    }

    println!("\nCapabilities:");
    println!("  - Read-only mapping of POSIX shared memory or segment dump files");
    println!("  - Bounds-checked decoding of both layouts");
    println!("  - Targeted single-reading lookup (adjacency layout)");
    println!("  - Keyword polling with rolling averages");

    Ok(())
}
