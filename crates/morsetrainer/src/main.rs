//! `morsetrain` - CLI for morsetrainer
//!
//! This binary provides the command-line interface for Morse practice
//! drills and the build timing harness.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use morsetrainer::cli::{
    CheckCommand, Cli, Command, ConfigCommand, DecodeCommand, DrillCommand, HarnessCommand,
    HistoryCommand, StatsCommand, StatusCommand,
};
use morsetrainer::reader::{Decoded, DecoderParams, MorseReader, PcmLevels};
use morsetrainer::session::Mode;
use morsetrainer::{code, harness, init_logging, Attempt, Config, SessionState, Storage,
    ToneGenerator};

#[cfg(target_os = "linux")]
use morsetrainer_linux as platform;

#[cfg(target_os = "macos")]
use morsetrainer_mac as platform;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Harness(harness_cmd) => handle_harness(&config, harness_cmd),
        Command::Drill(drill_cmd) => handle_drill(&config, &drill_cmd),
        Command::Check(check_cmd) => handle_check(&config, &check_cmd),
        Command::Decode(decode_cmd) => handle_decode(&config, &decode_cmd),
        Command::Stats(stats_cmd) => handle_stats(&config, &stats_cmd),
        Command::History(history_cmd) => handle_history(&config, &history_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_harness(
    config: &Config,
    cmd: HarnessCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        HarnessCommand::Run {
            limit,
            label,
            build,
        } => {
            let mut config = config.clone();
            if label.is_some() {
                config.harness.label = label;
            }
            let build_command = if build.is_empty() {
                config.harness.build_command.clone()
            } else {
                build
            };

            let opts = harness::HarnessOptions {
                build_command,
                state_path: config.state_path(),
                log_path: config.timing_log_path(),
                save_dir: config.crash_save_dir(),
                limit,
            };

            println!("Timing {:?}", opts.build_command);
            println!("Log: {}", opts.log_path.display());
            if limit == 0 {
                println!("Press Ctrl-C to stop.");
            }

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(harness::run(&opts))?;
        }
        HarnessCommand::Sweep { label } => {
            let mut config = config.clone();
            if label.is_some() {
                config.harness.label = label;
            }
            let save_dir = config.crash_save_dir();
            let moved = harness::sweep(&save_dir)?;
            println!("Swept {} crash report(s) into {}", moved, save_dir.display());
        }
    }
    Ok(())
}

fn handle_drill(config: &Config, cmd: &DrillCommand) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = config.state_path();
    let mut state = SessionState::load(&state_path)?;
    let mode = Mode::from(cmd.mode);

    let group_count = if cmd.count == 0 {
        config.koch.group_count
    } else {
        cmd.count
    };
    let group_size = if cmd.size == 0 {
        config.koch.group_size
    } else {
        cmd.size
    };

    let mut rng = rand::thread_rng();
    let drill = state.generate_drill(mode, config.koch_settings(), group_size, group_count, &mut rng);
    state.save(&state_path)?;

    let (cwpm, wpm) = state.speeds(mode);
    println!("{} drill at {cwpm}/{wpm} WPM over {:?}:", mode, state.charset(mode));

    match mode {
        Mode::Send => {
            // the user keys what they see
            println!("{drill}");
        }
        Mode::Copy => {
            if let Some(path) = &cmd.render {
                let tone = ToneGenerator::with_settings(
                    cwpm,
                    wpm,
                    config.sound.volume,
                    config.sound.frequency,
                )?;
                let samples = tone.render(&drill)?;
                let duration = ToneGenerator::duration_of(&samples);
                std::fs::write(path, &samples)?;
                println!(
                    "Rendered {:.1}s of audio ({} samples) to {}",
                    duration,
                    samples.len(),
                    path.display()
                );
            } else {
                println!("{}", code::encode(&drill)?);
            }
        }
    }

    println!("Answer with: morsetrain check --mode {mode} \"...\"");
    Ok(())
}

fn handle_check(config: &Config, cmd: &CheckCommand) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = config.state_path();
    let mut state = SessionState::load(&state_path)?;
    let mode = Mode::from(cmd.mode);

    let report = state.check_drill(mode, &cmd.answer, config.koch_settings())?;
    state.save(&state_path)?;

    let storage = Storage::open(config.database_path())?;
    storage.insert(&Attempt::new(
        mode,
        &report.expected,
        &report.received,
        report.hits,
        report.total,
    ))?;
    if let Some(max_age) = config.max_age() {
        storage.prune_older_than(max_age)?;
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Expected: {}", report.expected);
    println!("Received: {}", report.received);
    println!(
        "Score:    {}/{} ({:.0}%)",
        report.hits,
        report.total,
        report.fraction * 100.0
    );
    if report.promoted {
        println!(
            "Charset grew to {:?} - new character unlocked!",
            state.charset(mode)
        );
    }
    Ok(())
}

fn handle_decode(config: &Config, cmd: &DecodeCommand) -> Result<(), Box<dyn std::error::Error>> {
    const NOTHING: char = '\u{00bf}';

    if let Some(path) = &cmd.samples {
        let params = DecoderParams::load(config.params_path())?;
        let mut reader = MorseReader::with_params(params);
        let mut src = PcmLevels::from_buffer(std::fs::read(path)?);

        let mut text = String::new();
        while let Some(item) = reader.read(&mut src) {
            match item {
                Decoded::Character { ch, .. } => text.push(ch.unwrap_or(NOTHING)),
                Decoded::Gap => text.push(' '),
            }
        }
        println!("{}", text.trim());

        // persist the adapted estimates for the next run
        reader.params().save(config.params_path())?;
    } else if let Some(elements) = &cmd.elements {
        println!("{}", code::decode_elements(elements));
    }
    Ok(())
}

fn handle_stats(config: &Config, cmd: &StatsCommand) -> Result<(), Box<dyn std::error::Error>> {
    let state = SessionState::load(&config.state_path())?;
    let mode = Mode::from(cmd.mode);
    let charset = state.charset(mode);
    let stats = match mode {
        Mode::Send => &state.send_stats,
        Mode::Copy => &state.copy_stats,
    };

    if cmd.json {
        let mut report = serde_json::Map::new();
        for ch in charset.chars() {
            let prof = stats.proficiency(ch);
            report.insert(ch.to_string(), serde_json::to_value(prof)?);
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (cwpm, wpm) = state.speeds(mode);
    println!("{mode} proficiency at {cwpm}/{wpm} WPM");
    println!("char  samples  correct");
    for ch in charset.chars() {
        let prof = stats.proficiency(ch);
        println!(
            "   {}  {:>7}  {:>6.0}%",
            ch,
            prof.sample_size,
            prof.fraction * 100.0
        );
    }
    Ok(())
}

fn handle_history(
    config: &Config,
    cmd: &HistoryCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::open(config.database_path())?;
    let attempts = match cmd.mode {
        Some(mode) => storage.get_by_mode(Mode::from(mode), cmd.limit)?,
        None => storage.get_recent(cmd.limit)?,
    };

    if cmd.json {
        let rows: Vec<serde_json::Value> = attempts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "timestamp": a.timestamp.to_rfc3339(),
                    "mode": a.mode.to_string(),
                    "expected": a.expected,
                    "received": a.received,
                    "hits": a.hits,
                    "total": a.total,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if attempts.is_empty() {
        println!("No attempts recorded yet.");
        return Ok(());
    }
    for attempt in attempts {
        println!(
            "{}  {:>4}  {}/{}  {} -> {}",
            attempt.timestamp.format("%Y-%m-%d %H:%M:%S"),
            attempt.mode,
            attempt.hits,
            attempt.total,
            attempt.expected,
            attempt.received,
        );
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = config.state_path();
    let state = SessionState::load(&state_path)?;

    if json {
        let status = serde_json::json!({
            "platform": platform::platform_name(),
            "state_path": state_path,
            "database_path": config.database_path(),
            "copy": {
                "cwpm": state.copy_cwpm,
                "wpm": state.copy_wpm,
                "charset": state.charset(Mode::Copy),
            },
            "send": {
                "cwpm": state.send_cwpm,
                "wpm": state.send_wpm,
                "charset": state.charset(Mode::Send),
            },
            "pending_copy": state.pending_copy,
            "pending_send": state.pending_send,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("morsetrain status");
        println!("-----------------");
        println!("Platform:      {}", platform::platform_name());
        println!("State file:    {}", state_path.display());
        println!("Database:      {}", config.database_path().display());
        println!(
            "Copy:          {}/{} WPM, charset {:?}",
            state.copy_cwpm,
            state.copy_wpm,
            state.charset(Mode::Copy)
        );
        println!(
            "Send:          {}/{} WPM, charset {:?}",
            state.send_cwpm,
            state.send_wpm,
            state.charset(Mode::Send)
        );
        if state.pending_copy.is_some() || state.pending_send.is_some() {
            println!("Pending drill: yes (answer with `morsetrain check`)");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("morsetrain configuration");
                println!("------------------------");
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!("  State file:     {}", config.state_path().display());
                println!("  Params file:    {}", config.params_path().display());
                println!("  Max age (days): {}", config.storage.max_age_days);
                println!();
                println!("[Sound]");
                println!("  Frequency:      {} Hz", config.sound.frequency);
                println!("  Volume:         {}", config.sound.volume);
                println!();
                println!("[Koch]");
                println!("  Threshold:      {}", config.koch.threshold);
                println!("  Min sample:     {}", config.koch.min_sample);
                println!("  Group size:     {}", config.koch.group_size);
                println!("  Group count:    {}", config.koch.group_count);
                println!();
                println!("[Harness]");
                println!("  Build command:  {:?}", config.harness.build_command);
                println!("  Timing log:     {}", config.timing_log_path().display());
                println!("  Save dir:       {}", config.crash_save_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("checking {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("ok"),
                Err(e) => println!("invalid: {e}"),
            }
        }
    }
    Ok(())
}
