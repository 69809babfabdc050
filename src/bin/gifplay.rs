use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, Command};
use gifplay::{GifDocument, Loader, LoopCount, PlaybackState, Player, Settings, RESOURCE_EXTENSION};

mod locator;
#[cfg(feature = "png")]
mod png;
use crate::locator::DirLocator;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

/// How often `--play` asks the player for a frame
const TICK: Duration = Duration::from_millis(10);

fn main() {
    env_logger::builder().format_timestamp(None).init();

    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

/// Where the GIF bytes come from
enum Input {
    File(PathBuf),
    Named { name: String, locator: DirLocator },
}

impl Input {
    fn describe(&self) -> String {
        match self {
            Self::File(path) => display_path(path),
            Self::Named { name, locator } => format!("{name} ({})", display_path(&locator.path_of(name, RESOURCE_EXTENSION))),
        }
    }

    fn decode(&self) -> BinResult<GifDocument> {
        Ok(match self {
            Self::File(path) => {
                let data = fs::read(path).map_err(|e| format!("Can't read {}: {}", path.display(), e))?;
                GifDocument::decode(&data)?
            },
            Self::Named { name, locator } => GifDocument::from_named(name, locator)?,
        })
    }
}

fn bin_main() -> BinResult<()> {
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about("Shows which frame of an animated GIF is visible at a given time")
        .arg_required_else_help(true)
        .arg(Arg::new("FILE")
            .help("GIF file, or a resource name when --resources is used")
            .value_parser(value_parser!(PathBuf))
            .required(true))
        .arg(Arg::new("resources")
            .long("resources")
            .value_name("dir")
            .value_parser(value_parser!(PathBuf))
            .help("Look FILE up as <dir>/FILE.gif"))
        .arg(Arg::new("loops")
            .long("loops")
            .value_name("num")
            .value_parser(value_parser!(u32))
            .help("Play this many times instead of what the file says (0 = forever)"))
        .arg(Arg::new("at")
            .long("at")
            .value_name("secs")
            .value_parser(value_parser!(f64))
            .action(ArgAction::Append)
            .help("Print which frame is visible this many seconds into playback. Can be repeated"))
        .arg(Arg::new("play")
            .long("play")
            .action(ArgAction::SetTrue)
            .conflicts_with("at")
            .help("Play in real time, printing every frame change"))
        .arg(Arg::new("limit")
            .long("limit")
            .value_name("secs")
            .value_parser(value_parser!(f64))
            .requires("play")
            .help("Stop playing after this many seconds, even if the animation loops forever"))
        .arg(Arg::new("speed")
            .long("speed")
            .value_name("x")
            .value_parser(value_parser!(f64))
            .default_value("1")
            .help("Playback speed multiplier"))
        .arg(Arg::new("export")
            .long("export")
            .value_name("out.png")
            .value_parser(value_parser!(PathBuf))
            .requires("at")
            .help("Save the frame visible at --at as a PNG file"))
        .arg(Arg::new("quiet")
            .long("quiet")
            .short('q')
            .action(ArgAction::SetTrue)
            .help("Do not display anything on standard output/console"))
        .get_matches_from(wild::args_os());

    let file = matches.get_one::<PathBuf>("FILE").ok_or("Missing file")?;
    let input = match matches.get_one::<PathBuf>("resources") {
        Some(dir) => {
            check_if_paths_exist(&[dir.clone()])?;
            let name = file.to_str().ok_or("Resource names must be valid UTF-8")?.to_owned();
            Input::Named { name, locator: DirLocator::new(dir.clone()) }
        },
        None => {
            check_if_paths_exist(&[file.clone()])?;
            Input::File(file.clone())
        },
    };

    let speed = *matches.get_one::<f64>("speed").ok_or("Missing speed")?;
    if !(speed > 0. && speed.is_finite()) {
        return Err("Speed must be a positive number".into());
    }
    let settings = Settings {
        loop_count: matches.get_one::<u32>("loops").map(|&n| match n {
            0 => LoopCount::Infinite,
            n => LoopCount::Finite(n),
        }),
        speed,
    };
    let quiet = matches.get_flag("quiet");

    if matches.get_flag("play") {
        let limit = matches.get_one::<f64>("limit").copied();
        if limit.is_some_and(|l| !(l >= 0. && l.is_finite())) {
            return Err("Limit must be a non-negative number of seconds".into());
        }
        return play(input, settings, limit.map(Duration::from_secs_f64), quiet);
    }

    let document = input.decode()?;
    let times: Vec<f64> = matches.get_many::<f64>("at").map(|t| t.copied().collect()).unwrap_or_default();

    if let Some(out) = matches.get_one::<PathBuf>("export") {
        let &[at] = times.as_slice() else {
            return Err("--export needs exactly one --at time".into());
        };
        let frame = document.frame_at(at, settings.loop_count)
            .ok_or_else(|| format!("Nothing is visible at {at}s, the animation has finished"))?;
        export(frame, out)?;
        if !quiet {
            println!("frame at {at}s saved to {}", display_path(out));
        }
        return Ok(());
    }

    if quiet {
        return Ok(());
    }

    if times.is_empty() {
        print_info(&input, &document, settings);
        return Ok(());
    }

    for at in times {
        match document.frames().position_at(at, document.effective_loop_count(settings.loop_count)) {
            Some(pos) => println!("{at}s: frame {pos}"),
            None => println!("{at}s: finished"),
        }
    }
    Ok(())
}

fn print_info(input: &Input, document: &GifDocument, settings: Settings) {
    let frames = document.frames();
    println!("{}", input.describe());
    if let Some(first) = frames.get(0) {
        let px = first.pixels();
        println!("  size: {}x{}", px.width(), px.height());
    }
    println!("  frames: {}", frames.len());
    println!("  duration: {}s", frames.duration());
    match settings.loop_count {
        Some(loops) => println!("  loops: {loops} (file says {})", document.loop_count()),
        None => println!("  loops: {}", document.loop_count()),
    }
    for (i, frame) in frames.iter().enumerate() {
        println!("  #{i}: {}s", frame.delay());
    }
}

fn play(input: Input, settings: Settings, limit: Option<Duration>, quiet: bool) -> BinResult<()> {
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    let mut player = Player::new(settings).with_completion_handler(done_tx);
    let loader = Loader::new();

    let ticket = player.request();
    match input {
        Input::File(path) => {
            let data = fs::read(&path).map_err(|e| format!("Can't read {}: {}", path.display(), e))?;
            loader.decode(ticket, data)?;
        },
        Input::Named { name, locator } => loader.decode_named(ticket, name, locator)?,
    }

    let start = Instant::now();
    let mut shown = None;
    loop {
        let now = Instant::now();
        if player.poll(&loader, now)? && !quiet {
            if let Some(doc) = player.document() {
                println!("loaded {} frames, {}s, loops: {}", doc.frames().len(), doc.frames().duration(),
                    doc.effective_loop_count(settings.loop_count));
            }
        }
        if player.state() != PlaybackState::Loading {
            player.tick(now);
            if player.position() != shown {
                shown = player.position();
                if let (Some(pos), false) = (shown, quiet) {
                    let t = player.elapsed(now).unwrap_or(0.);
                    println!("{t:.2}s: frame {pos}");
                }
            }
        }
        if done_rx.try_recv().is_ok() {
            if !quiet {
                println!("finished");
            }
            return Ok(());
        }
        if limit.is_some_and(|limit| now.saturating_duration_since(start) >= limit) {
            log::debug!("stopping after {:?}", limit);
            return Ok(());
        }
        thread::sleep(TICK);
    }
}

#[cfg(feature = "png")]
fn export(frame: &gifplay::Frame, out: &Path) -> BinResult<()> {
    png::export_frame(frame, out)
}

#[cfg(not(feature = "png"))]
#[cold]
fn export(_: &gifplay::Frame, _: &Path) -> BinResult<()> {
    Err("PNG export is disabled in this executable. Recompile with --features=png".into())
}

fn check_if_paths_exist(paths: &[PathBuf]) -> BinResult<()> {
    for path in paths {
        if !path.exists() {
            let mut msg = format!("Unable to find \"{}\"", path.display());
            if path.is_relative() {
                msg += &format!(" (searched in \"{}\")", env::current_dir()?.display());
            }
            return Err(msg.into());
        }
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    let abs_path = dunce::canonicalize(path);
    abs_path.as_deref().unwrap_or(path).display().to_string()
}
