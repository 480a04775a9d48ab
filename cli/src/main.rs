//! Tessitura CLI
//!
//! Interactive shell for pitch, key and tempo analysis and for time
//! stretching and pitch shifting audio files.

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Arg, Command};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tessitura_lib::{
    audio_io::{next_output_path, read_audio_file, write_audio_file},
    utils,
    window::WindowType,
    AudioProcessor, Result, SampleBuffer,
};

/// Application state
struct AppState {
    processor: AudioProcessor,
    buffer: Option<SampleBuffer>,
    current_file: Option<PathBuf>,
}

impl AppState {
    fn new() -> Self {
        Self {
            processor: AudioProcessor::new(),
            buffer: None,
            current_file: None,
        }
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let buffer = read_audio_file(path)?;
        log::debug!("Loaded {} frames from {}", buffer.frames(), path.display());
        self.buffer = Some(buffer);
        self.current_file = Some(path.to_path_buf());
        Ok(())
    }
}

/// Print the help message showing available commands
fn print_help() {
    println!("Available commands:");
    println!("  load <filename>                    - Load an audio file");
    println!("  info                               - Show information about loaded audio");
    println!("  pitch                              - Estimate the dominant pitch");
    println!("  key                                - Estimate the key");
    println!("  tempo                              - Estimate tempo and beat positions");
    println!("  analyze                            - Run pitch, key and tempo together");
    println!("  speed <factor>                     - Change speed, keeping pitch (2.0 = twice as fast)");
    println!("  shift <semitones>                  - Change pitch, keeping duration");
    println!("  reset                              - Reload the current file, dropping changes");
    println!("  save [filename]                    - Save audio as WAV (default output_N.wav)");
    println!("  config                             - Show current STFT configuration");
    println!("  set window_size <size>             - Set FFT window size (power of 2, 16-65536)");
    println!("  set hop_size <size>                - Set hop size (1 to window size)");
    println!("  set window_type <type>             - Set window type (hann, hamming, rectangular)");
    println!("  help                               - Show this help message");
    println!("  quit                               - Exit the program");
    println!();
    println!("Examples:");
    println!("  load song.wav");
    println!("  analyze");
    println!("  speed 0.8");
    println!("  shift -3");
    println!("  save slower.wav");
}

fn loaded_buffer(state: &AppState) -> Option<&SampleBuffer> {
    if state.buffer.is_none() {
        println!("No audio loaded. Load a file first.");
    }
    state.buffer.as_ref()
}

fn print_tempo(result: &tessitura_lib::TempoResult) {
    println!("Tempo: {:.2} BPM", result.bpm);
    if result.beat_times.is_empty() {
        println!("No beats detected");
        return;
    }
    let preview: Vec<String> = result
        .beat_times
        .iter()
        .take(8)
        .map(|t| format!("{:.2}", t))
        .collect();
    let more = if result.beat_times.len() > preview.len() {
        " ..."
    } else {
        ""
    };
    println!(
        "Beats: {} at [{}{}]s",
        result.beat_times.len(),
        preview.join(", "),
        more
    );
}

fn analyze_all(state: &AppState) {
    let Some(buffer) = loaded_buffer(state) else {
        return;
    };
    let processor = &state.processor;

    let (pitch, key, tempo) = thread::scope(|s| {
        let pitch = s.spawn(|| processor.analyze_pitch(buffer));
        let key = s.spawn(|| processor.analyze_key(buffer));
        let tempo = s.spawn(|| processor.analyze_tempo(buffer));
        (pitch.join(), key.join(), tempo.join())
    });

    match pitch {
        Ok(Ok(pitch)) => println!("Pitch: {}", pitch),
        Ok(Err(e)) => println!("Error estimating pitch: {}", e),
        Err(_) => println!("Pitch estimation panicked"),
    }
    match key {
        Ok(Ok(key)) => println!("Key: {}", key),
        Ok(Err(e)) => println!("Error estimating key: {}", e),
        Err(_) => println!("Key estimation panicked"),
    }
    match tempo {
        Ok(Ok(tempo)) => print_tempo(&tempo),
        Ok(Err(e)) => println!("Error estimating tempo: {}", e),
        Err(_) => println!("Tempo estimation panicked"),
    }
}

fn save(state: &AppState, target: Option<&str>) {
    let Some(buffer) = loaded_buffer(state) else {
        return;
    };

    let path = match target {
        Some(name) => PathBuf::from(name),
        None => next_output_path(".", "output", "wav"),
    };

    println!("Saving to file: {}", path.display());
    match write_audio_file(&path, buffer) {
        Ok(_) => println!("File saved successfully!"),
        Err(e) => println!("Error saving file: {}", e),
    }
}

fn process_command(command: &str, state: &mut AppState) -> bool {
    let parts: Vec<&str> = command.split_whitespace().collect();

    if parts.is_empty() {
        return true;
    }

    match parts[0] {
        "load" => {
            if parts.len() != 2 {
                println!("Usage: load <filename>");
                return true;
            }

            let path = Path::new(parts[1]);
            println!("Loading file: {}", path.display());

            match state.load(path) {
                Ok(_) => {
                    println!("File loaded successfully!");
                    if let Some(buffer) = &state.buffer {
                        print!("{}", utils::buffer_summary(buffer, state.processor.config()));
                    }
                }
                Err(e) => println!("Error loading file: {}", e),
            }
        }

        "info" => {
            if let Some(buffer) = loaded_buffer(state) {
                if let Some(path) = &state.current_file {
                    println!("File: {}", path.display());
                }
                print!("{}", utils::buffer_summary(buffer, state.processor.config()));
            }
        }

        "pitch" => {
            if let Some(buffer) = loaded_buffer(state) {
                match state.processor.analyze_pitch(buffer) {
                    Ok(pitch) => println!("Pitch: {}", pitch),
                    Err(e) => println!("Error estimating pitch: {}", e),
                }
            }
        }

        "key" => {
            if let Some(buffer) = loaded_buffer(state) {
                match state.processor.analyze_key(buffer) {
                    Ok(key) => println!("Key: {}", key),
                    Err(e) => println!("Error estimating key: {}", e),
                }
            }
        }

        "tempo" => {
            if let Some(buffer) = loaded_buffer(state) {
                match state.processor.analyze_tempo(buffer) {
                    Ok(tempo) => print_tempo(&tempo),
                    Err(e) => println!("Error estimating tempo: {}", e),
                }
            }
        }

        "analyze" => analyze_all(state),

        "speed" => {
            if parts.len() != 2 {
                println!("Usage: speed <factor>");
                return true;
            }
            let Ok(rate) = parts[1].parse::<f64>() else {
                println!("Invalid speed factor: {}", parts[1]);
                return true;
            };
            let Some(buffer) = loaded_buffer(state) else {
                return true;
            };

            match state.processor.change_speed(buffer, rate) {
                Ok(stretched) => {
                    println!(
                        "Speed changed by {}x: {} -> {}",
                        rate,
                        utils::format_time(buffer.duration_seconds()),
                        utils::format_time(stretched.duration_seconds())
                    );
                    state.buffer = Some(stretched);
                }
                Err(e) => println!("Error changing speed: {}", e),
            }
        }

        "shift" => {
            if parts.len() != 2 {
                println!("Usage: shift <semitones>");
                return true;
            }
            let Ok(semitones) = parts[1].parse::<f64>() else {
                println!("Invalid semitone count: {}", parts[1]);
                return true;
            };
            let Some(buffer) = loaded_buffer(state) else {
                return true;
            };

            match state.processor.change_pitch(buffer, semitones) {
                Ok(shifted) => {
                    println!("Pitch shifted by {} semitones", semitones);
                    state.buffer = Some(shifted);
                }
                Err(e) => println!("Error shifting pitch: {}", e),
            }
        }

        "reset" => match state.current_file.clone() {
            Some(path) => match state.load(&path) {
                Ok(_) => println!("Reloaded {}", path.display()),
                Err(e) => println!("Error reloading file: {}", e),
            },
            None => println!("No file to reload. Load a file first."),
        },

        "save" => {
            if parts.len() > 2 {
                println!("Usage: save [filename]");
                return true;
            }
            save(state, parts.get(1).copied());
        }

        "config" => {
            let config = state.processor.config();
            println!("Current STFT Configuration:");
            println!("  Window size: {}", config.window_size);
            println!("  Hop size: {}", config.hop_size);
            println!("  Overlap: {:.1}%", config.overlap_percent());
            println!("  Window type: {}", config.window_type);
            let tempo = state.processor.tempo_config();
            println!("Tempo Configuration:");
            println!(
                "  Range: {}-{} BPM, prior centered on {} BPM",
                tempo.min_bpm, tempo.max_bpm, tempo.start_bpm
            );
        }

        "set" => {
            if parts.len() != 3 {
                println!("Usage: set <parameter> <value>");
                println!("Parameters: window_size, hop_size, window_type");
                return true;
            }

            let param = parts[1];
            let value = parts[2];

            let result = match param {
                "window_size" | "hop_size" => {
                    let Ok(size) = value.parse::<usize>() else {
                        println!("Invalid {}: {}", param, value);
                        return true;
                    };
                    if param == "window_size" {
                        state.processor.set_window_size(size)
                    } else {
                        state.processor.set_hop_size(size)
                    }
                }
                "window_type" => match value.parse::<WindowType>() {
                    Ok(window_type) => state.processor.set_window_type(window_type),
                    Err(e) => {
                        println!("{}", e);
                        let valid: Vec<String> = WindowType::all()
                            .iter()
                            .map(|w| w.name().to_ascii_lowercase())
                            .collect();
                        println!("Valid types: {}", valid.join(", "));
                        return true;
                    }
                },
                _ => {
                    println!("Unknown parameter: {}", param);
                    println!("Parameters: window_size, hop_size, window_type");
                    return true;
                }
            };

            match result {
                Ok(_) => println!("{} set to {}", param, value),
                Err(e) => println!("Error setting {}: {}", param, e),
            }
        }

        "help" => print_help(),

        "quit" | "exit" => return false,

        _ => {
            println!("Unknown command: {}", parts[0]);
            println!("Type 'help' for available commands");
        }
    }

    true
}

fn main() {
    // Parse command line arguments
    let matches = Command::new("Tessitura")
        .version(tessitura_lib::VERSION)
        .about("Pitch, key and tempo analysis with time stretching and pitch shifting")
        .arg(
            Arg::new("file")
                .help("Audio file to load on startup")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("window-size")
                .long("window-size")
                .short('w')
                .help("Set window size (power of 2, 16-65536)")
                .value_name("SIZE")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("hop-size")
                .long("hop-size")
                .short('p')
                .help("Set hop size (1 to window size)")
                .value_name("SIZE")
                .value_parser(clap::value_parser!(usize)),
        )
        .get_matches();

    println!("Tessitura v{}", tessitura_lib::VERSION);
    println!("Type 'help' for available commands\n");

    tessitura_lib::init();

    let mut state = AppState::new();

    if let Some(&size) = matches.get_one::<usize>("window-size") {
        match state.processor.set_window_size(size) {
            Ok(_) => println!("Set window size to {}", size),
            Err(e) => eprintln!("Invalid window size: {}", e),
        }
    }

    if let Some(&hop) = matches.get_one::<usize>("hop-size") {
        match state.processor.set_hop_size(hop) {
            Ok(_) => println!("Set hop size to {}", hop),
            Err(e) => eprintln!("Invalid hop size: {}", e),
        }
    }

    if let Some(filename) = matches.get_one::<String>("file") {
        process_command(&format!("load {}", filename), &mut state);
    }

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to create readline: {}", e);
            std::process::exit(1);
        }
    };

    // Main command loop
    loop {
        match rl.readline("tessitura> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    rl.add_history_entry(trimmed).ok();
                    if !process_command(trimmed, &mut state) {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
}
