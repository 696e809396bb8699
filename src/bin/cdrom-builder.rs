use std::path::Path;

use anyhow::{bail, Context, Result};
use cdrom_builder::artifact::filesystem::move_image;
use cdrom_builder::artifact::iso::IsoReader;
use cdrom_builder::build::state::{BuildState, StepAction};
use cdrom_builder::build::step::StepCreateCd;
use cdrom_builder::config::CdConfig;
use cdrom_builder::ui::ConsoleUi;
use tracing_subscriber::EnvFilter;

const UI_PREFIX: &str = "cdrom";

fn usage() -> &'static str {
    "Usage:\n  cdrom-builder validate <config.toml>\n  cdrom-builder build <config.toml> <output.iso>\n  cdrom-builder ls <image.iso> [dir]\n  cdrom-builder cat <image.iso> <path>"
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, config] if cmd == "validate" => validate(Path::new(config)),
        [cmd, config, output] if cmd == "build" => build(Path::new(config), Path::new(output)),
        [cmd, image] if cmd == "ls" => list(Path::new(image), "/"),
        [cmd, image, dir] if cmd == "ls" => list(Path::new(image), dir),
        [cmd, image, path] if cmd == "cat" => cat(Path::new(image), path),
        _ => bail!(usage()),
    }
}

fn load_valid_config(config_path: &Path) -> Result<CdConfig> {
    let config = CdConfig::load(config_path)?;
    let errors = config.prepare();
    if errors.is_empty() {
        return Ok(config);
    }
    for err in &errors {
        eprintln!("  {err}");
    }
    bail!(
        "CD config '{}' has {} bad entr{}",
        config_path.display(),
        errors.len(),
        if errors.len() == 1 { "y" } else { "ies" }
    )
}

fn validate(config_path: &Path) -> Result<()> {
    let config = load_valid_config(config_path)?;
    println!(
        "[{UI_PREFIX}] {} OK ({} entries)",
        config_path.display(),
        config.cd_files.len()
    );
    Ok(())
}

fn build(config_path: &Path, output: &Path) -> Result<()> {
    let config = load_valid_config(config_path)?;
    let ui = ConsoleUi::new(UI_PREFIX);
    let mut step = StepCreateCd::new(config.manifest());
    let mut state = BuildState::default();

    let result = match step.run(&mut state, &ui) {
        StepAction::Continue => publish(&mut state, output),
        StepAction::Halt => Ok(()),
    };
    step.cleanup();
    result?;

    let summary = serde_json::to_string_pretty(&state.summary()).context("serializing build summary")?;
    println!("{summary}");

    match state.error {
        Some(err) => Err(err).with_context(|| format!("building CD from '{}'", config_path.display())),
        None => Ok(()),
    }
}

/// Move the finished image to `output` and record its final location.
fn publish(state: &mut BuildState, output: &Path) -> Result<()> {
    let Some(cd_path) = state.cd_path.take() else {
        println!("[{UI_PREFIX}] no CD files configured; nothing written");
        return Ok(());
    };
    move_image(&cd_path, output)
        .with_context(|| format!("moving CD to '{}'", output.display()))?;
    state.cd_path = Some(output.to_path_buf());
    Ok(())
}

fn list(image_path: &Path, dir: &str) -> Result<()> {
    let image = IsoReader::open(image_path)
        .with_context(|| format!("opening ISO '{}'", image_path.display()))?;
    let entries = image
        .read_dir(dir)
        .with_context(|| format!("listing '{}' in '{}'", dir, image_path.display()))?;

    println!("volume: {}", image.volume_label());
    for entry in entries {
        if entry.is_dir {
            println!("{:>12}  {}/", "-", entry.name);
        } else {
            println!("{:>12}  {}", entry.size, entry.name);
        }
    }
    Ok(())
}

fn cat(image_path: &Path, path: &str) -> Result<()> {
    use std::io::Write;

    let image = IsoReader::open(image_path)
        .with_context(|| format!("opening ISO '{}'", image_path.display()))?;
    let data = image
        .read_file(path)
        .with_context(|| format!("reading '{}' from '{}'", path, image_path.display()))?;
    std::io::stdout()
        .write_all(&data)
        .context("writing to stdout")?;
    Ok(())
}
