// SPDX-License-Identifier: MPL-2.0
use image_studio::app::{config, Collaborators, Studio, StudioDirs};
use image_studio::domain::gallery::GallerySort;
use image_studio::domain::media::VideoHandle;
use image_studio::domain::session::{AspectRatio, ImageFilter, Rotation, StudioMode};
use image_studio::error::{Error, Result};
use image_studio::generation::{GenerationOutcome, StatusMessage};
use image_studio::media;
use image_studio::session::EditKind;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
image-studio: headless front end of the generative image studio

USAGE:
  image-studio [OPTIONS] <COMMAND> [ARGS]

OPTIONS:
  --data-dir <DIR>      Session and gallery directory
  --config-dir <DIR>    settings.toml and credential directory
  --offline             Use a placeholder backend instead of the API
  -h, --help            Print this help

COMMANDS:
  status                      Show the current session
  mode <create|edit|render|video>
  prompt <TEXT>               Set the prompt
  negative <TEXT>             Set the negative prompt
  aspect <RATIO>              Set the aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)
  image <FILE>                Use an image file as the base image
  generate                    Run a generation with the current session
  enhance | translate         Rewrite the prompt
  filter <NAME>               grayscale, sepia, invert or vintage
  rotate [ccw]                Quarter turn of the on-screen image
  undo | redo
  export <DIR>                Write the generated images to DIR
  gallery list [QUERY]        List saved images, newest first
  gallery save                Save the generated images
  gallery delete <ID>
  gallery favorite <ID>
  gallery open <ID> [edit|video]
  set-key <KEY>               Store the API key
  reset                       Start over with a fresh session
";

struct Flags {
    data_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    offline: bool,
    command: Option<String>,
    rest: Vec<OsString>,
}

fn parse_flags() -> std::result::Result<Flags, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    Ok(Flags {
        data_dir: args.opt_value_from_str("--data-dir")?,
        config_dir: args.opt_value_from_str("--config-dir")?,
        offline: args.contains("--offline"),
        command: args.subcommand()?,
        rest: args.finish(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let flags = match parse_flags() {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("error: {err}\n\n{HELP}");
            return ExitCode::from(2);
        }
    };

    match run(flags).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(flags: Flags) -> Result<()> {
    let dirs = StudioDirs::resolve(flags.data_dir, flags.config_dir)?;
    let (config, config_warning) = config::load_with_override(Some(dirs.config.clone()));
    if let Some(key) = config_warning {
        tracing::warn!(key, "settings could not be read, using defaults");
    }

    let parts = if flags.offline {
        Collaborators::offline(&dirs)?
    } else {
        Collaborators::on_disk(&dirs, &config)
    };
    let (studio, session_warning) = Studio::open(config, parts).await;
    if let Some(key) = session_warning {
        tracing::warn!(key, "saved session could not be read");
    }

    let args: Vec<String> = flags
        .rest
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let result = dispatch(&studio, flags.command.as_deref(), &args).await;
    studio.shutdown().await?;
    result
}

fn argument<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::Config(format!("missing argument: {name}")))
}

async fn dispatch(studio: &Studio, command: Option<&str>, args: &[String]) -> Result<()> {
    match command.unwrap_or("status") {
        "status" => print_status(studio).await,
        "mode" => {
            let mode: StudioMode = argument(args, 0, "mode")?.parse().map_err(Error::Config)?;
            studio.update(|s| s.change_mode(mode)).await;
        }
        "prompt" => {
            let text = args.join(" ");
            studio.update(|s| s.set_prompt(text)).await;
        }
        "negative" => {
            let text = args.join(" ");
            studio.update(|s| s.set_negative_prompt(text)).await;
        }
        "aspect" => {
            let ratio: AspectRatio = argument(args, 0, "ratio")?.parse().map_err(Error::Config)?;
            studio.update(|s| s.set_aspect_ratio(ratio)).await;
        }
        "image" => {
            let path = argument(args, 0, "file")?;
            let bytes = tokio::fs::read(path).await?;
            let image = media::probe(bytes)?;
            studio.update(|s| s.set_image1(Some(image))).await;
        }
        "generate" => generate(studio).await?,
        "enhance" => {
            studio.enhance_prompt().await?;
            println!("{}", studio.state().await.prompt);
        }
        "translate" => {
            studio.translate_prompt().await?;
            println!("{}", studio.state().await.prompt);
        }
        "filter" => {
            let filter: ImageFilter =
                argument(args, 0, "filter")?.parse().map_err(Error::Config)?;
            edit(studio, EditKind::Filter(filter)).await?;
        }
        "rotate" => {
            let rotation = match args.first().map(String::as_str) {
                Some("ccw") => Rotation::CounterClockwise,
                _ => Rotation::Clockwise,
            };
            edit(studio, EditKind::Rotate(rotation)).await?;
        }
        "undo" => report_step(studio.undo().await, "undo"),
        "redo" => report_step(studio.redo().await, "redo"),
        "export" => export(studio, PathBuf::from(argument(args, 0, "dir")?)).await?,
        "gallery" => gallery(studio, args).await?,
        "set-key" => studio.set_credential(argument(args, 0, "key")?)?,
        "reset" => studio.reset().await,
        other => return Err(Error::Config(format!("unknown command: {other}"))),
    }
    Ok(())
}

async fn print_status(studio: &Studio) {
    let session = studio.session().lock().await;
    let state = session.state();
    println!("mode:        {}", state.mode.as_str());
    println!("prompt:      {}", state.prompt);
    println!("aspect:      {}", state.aspect_ratio.as_str());
    println!("batch:       {}", state.batch_size.value());
    println!("base image:  {}", describe(state.image1.as_ref()));
    println!(
        "generated:   {}",
        state.generated_images.as_ref().map_or(0, Vec::len)
    );
    if let Some(video) = state.generated_video.as_ref() {
        println!("video:       {}", describe_video(video));
    }
    println!("history:     {}/{}", session.history_index() + 1, session.history_len());
}

/// Superseded videos are released even while history still points at them.
fn describe_video(video: &VideoHandle) -> String {
    video.path().map_or_else(
        || "expired (superseded by a newer result, generate again)".to_string(),
        |path| path.display().to_string(),
    )
}

fn describe(image: Option<&image_studio::domain::media::EncodedImage>) -> String {
    image.map_or_else(
        || "none".to_string(),
        |image| format!("{}x{} {}", image.width(), image.height(), image.kind().mime_type()),
    )
}

async fn generate(studio: &Studio) -> Result<()> {
    match studio.generate().await {
        GenerationOutcome::Succeeded => {
            let state = studio.state().await;
            let count = state.generated_images.as_ref().map_or(0, Vec::len);
            match state.generated_video.as_ref() {
                Some(video) => println!("video ready: {}", describe_video(video)),
                None => println!("{count} image(s) generated"),
            }
            Ok(())
        }
        GenerationOutcome::Cancelled => {
            println!("cancelled");
            Ok(())
        }
        GenerationOutcome::Failed(err) => Err(err.into()),
        GenerationOutcome::Blocked(blocker) => {
            Err(Error::Config(format!("cannot generate: {}", blocker.message_key())))
        }
    }
}

async fn edit(studio: &Studio, kind: EditKind) -> Result<()> {
    if studio.apply_edit(kind).await.is_some() {
        println!("edit applied");
        return Ok(());
    }
    match studio.status().snapshot().message {
        Some(StatusMessage::Error { message, .. }) => Err(Error::Config(message)),
        _ => {
            println!("nothing to edit");
            Ok(())
        }
    }
}

fn report_step(moved: bool, label: &str) {
    if moved {
        println!("{label} done");
    } else {
        println!("nothing to {label}");
    }
}

async fn export(studio: &Studio, dir: PathBuf) -> Result<()> {
    let images = studio.state().await.generated_images.unwrap_or_default();
    tokio::fs::create_dir_all(&dir).await?;
    for (index, image) in images.iter().enumerate() {
        let path = dir.join(format!("image-{}.{}", index + 1, image.kind().extension()));
        tokio::fs::write(&path, image.bytes()).await?;
        println!("{}", path.display());
    }
    Ok(())
}

async fn gallery(studio: &Studio, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            let query = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            let items = studio.gallery().search(&query, GallerySort::Newest).await?;
            for item in items {
                let star = if item.is_favorite { "*" } else { " " };
                println!("{star} {}  {}  {}", item.id, item.created_at.to_rfc3339(), item.prompt);
            }
        }
        "save" => println!("{} image(s) saved", studio.save_to_gallery().await?),
        "delete" => studio.gallery().delete(argument(args, 1, "id")?).await?,
        "favorite" => {
            let favorite = studio.gallery().toggle_favorite(argument(args, 1, "id")?).await?;
            println!("favorite: {favorite}");
        }
        "open" => {
            let mode = match args.get(2).map(String::as_str) {
                Some("video") => StudioMode::Video,
                _ => StudioMode::Edit,
            };
            studio.open_from_gallery(argument(args, 1, "id")?, mode).await?;
        }
        other => return Err(Error::Config(format!("unknown gallery command: {other}"))),
    }
    Ok(())
}
