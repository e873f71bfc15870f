//! Mathterrain - headless session driver
//!
//! Runs a terrain session for a fixed number of frames against the
//! headless renderer, optionally with the debug server attached.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mathterrain::core::input::{InputState, Key};
use mathterrain::core::types::Vec3;
use mathterrain::core::{Error, Result, logging};
use mathterrain::preset::{Preset, PresetLibrary};
use mathterrain::render::{HeadlessRenderer, TerrainRenderer};
use mathterrain::session::{Session, SessionDebugHandler, SessionSettings};
use mathterrain::terrain::EquationSpec;

const DEFAULT_EQUATION: &str = "sin(x*0.1)*cos(y*0.1)*8";

/// Command line options
#[derive(Debug)]
struct Args {
    preset_file: Option<PathBuf>,
    preset: Option<String>,
    equations: Vec<String>,
    /// 0 runs until the process is killed
    frames: u64,
    dt: f32,
    workers: Option<usize>,
    debug_port: Option<u16>,
    walk: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            preset_file: None,
            preset: None,
            equations: Vec::new(),
            frames: 600,
            dt: 1.0 / 60.0,
            workers: None,
            debug_port: None,
            walk: false,
        }
    }
}

fn parse_args(args: &[String]) -> Result<Args> {
    fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
        args.get(i + 1)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("{flag} needs a value")))
    }
    fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T> {
        raw.parse()
            .map_err(|_| Error::Config(format!("invalid value for {flag}: {raw}")))
    }

    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--preset-file" => {
                parsed.preset_file = Some(PathBuf::from(value(args, i, flag)?));
                i += 1;
            }
            "--preset" => {
                parsed.preset = Some(value(args, i, flag)?.to_string());
                i += 1;
            }
            "--equation" | "-e" => {
                parsed.equations.push(value(args, i, flag)?.to_string());
                i += 1;
            }
            "--frames" => {
                parsed.frames = number(value(args, i, flag)?, flag)?;
                i += 1;
            }
            "--dt" => {
                parsed.dt = number(value(args, i, flag)?, flag)?;
                i += 1;
            }
            "--workers" => {
                parsed.workers = Some(number(value(args, i, flag)?, flag)?);
                i += 1;
            }
            "--debug-port" => {
                parsed.debug_port = Some(number(value(args, i, flag)?, flag)?);
                i += 1;
            }
            "--walk" => parsed.walk = true,
            other => return Err(Error::Config(format!("unknown argument: {other}"))),
        }
        i += 1;
    }
    Ok(parsed)
}

/// Pick the preset to play: named, else the first in the file
fn select_preset(args: &Args) -> Result<Option<Preset>> {
    let Some(path) = &args.preset_file else {
        return Ok(None);
    };
    let library = PresetLibrary::load(path)?;
    let preset = match &args.preset {
        Some(name) => library
            .get(name)
            .ok_or_else(|| Error::Preset(format!("no preset named {name}")))?,
        None => library
            .presets
            .first()
            .ok_or_else(|| Error::Preset(format!("{} has no presets", path.display())))?,
    };
    Ok(Some(preset.clone()))
}

fn start_debug_server(session: Arc<Mutex<Session<HeadlessRenderer>>>, port: u16) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create debug runtime: {}", e);
                return;
            }
        };
        rt.block_on(async move {
            let handler = Arc::new(tokio::sync::Mutex::new(SessionDebugHandler::new(session)));
            match mathterrain_debug::DebugServer::bind(port).await {
                Ok(server) => server.serve(handler).await,
                Err(e) => log::error!("Debug server not started: {}", e),
            }
        });
    });
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;

    let mut settings = SessionSettings::default();
    if let Some(workers) = args.workers {
        settings.terrain.worker_threads = workers;
    }

    let mut session = Session::new(settings, HeadlessRenderer::new())?;
    let preset = select_preset(&args)?;
    if !args.equations.is_empty() {
        let specs: Vec<EquationSpec> = args
            .equations
            .iter()
            .map(|f| EquationSpec::new(f.as_str(), "#6b8e4e"))
            .collect();
        if let Some(environment) = preset.as_ref().and_then(|p| p.environment.as_ref()) {
            session.renderer_mut().set_environment(environment);
        }
        let start = preset.as_ref().map_or(Vec3::new(0.0, 0.0, 5.0), Preset::start);
        session.start_game(&specs, start)?;
    } else if let Some(preset) = &preset {
        log::info!("Playing preset '{}'", preset.name);
        session.apply_preset(preset)?;
    } else {
        session.start_game(&[EquationSpec::new(DEFAULT_EQUATION, "#6b8e4e")], Vec3::new(0.0, 0.0, 5.0))?;
    }

    let session = Arc::new(Mutex::new(session));
    if let Some(port) = args.debug_port {
        start_debug_server(session.clone(), port);
    }

    let mut input = InputState::new();
    if args.walk {
        input.press(Key::W);
    }

    let mut frame = 0u64;
    while args.frames == 0 || frame < args.frames {
        {
            let mut s = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            s.frame(args.dt, &mut input)?;
            if frame % 60 == 0 {
                let stats = s.streamer().stats();
                log::debug!(
                    "frame {}: {} active, {} cached, {} generating, {} triangles",
                    frame,
                    stats.active_chunks,
                    stats.cached_chunks,
                    stats.generating_chunks,
                    stats.merged_triangles
                );
            }
        }
        // Real-time pacing only matters when someone is watching
        if args.debug_port.is_some() {
            std::thread::sleep(Duration::try_from_secs_f32(args.dt).unwrap_or_default());
        }
        frame += 1;
    }

    let s = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let stats = s.streamer().stats();
    let player = s.physics().position();
    log::info!(
        "Finished {} frames: player at ({:.1}, {:.1}, {:.1}), {} active / {} cached / {} empty chunks, {} triangles",
        frame,
        player.x,
        player.y,
        player.z,
        stats.active_chunks,
        stats.cached_chunks,
        stats.empty_chunks,
        stats.merged_triangles
    );
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    log::info!("Mathterrain starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("mathterrain")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&[
            "--equation",
            "x*0.1",
            "-e",
            "sin(y)",
            "--frames",
            "10",
            "--workers",
            "2",
            "--walk",
        ]))
        .unwrap();
        assert_eq!(parsed.equations, vec!["x*0.1", "sin(y)"]);
        assert_eq!(parsed.frames, 10);
        assert_eq!(parsed.workers, Some(2));
        assert!(parsed.walk);
        assert!(parsed.debug_port.is_none());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&["--frames"])).is_err());
        assert!(parse_args(&args(&["--frames", "ten"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
