use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::clock::{
  DEFAULT_OFFSET_MINUTES,
  ReferenceClock
};

const CONFIG_ENV_VAR: &str =
  "RESETLINE_CONFIG";
const OFFSET_ENV_VAR: &str =
  "RESETLINE_UTC_OFFSET";
const CONFIG_FILE_NAME: &str =
  ".resetline.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Reference clock offset from UTC,
  /// in minutes.
  pub offset_minutes: i32,
  pub catalog:        PathBuf,
  pub color:          bool,
  pub data:           DataSection,
  pub timeline:       TimelineSection,

  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSection {
  pub location: PathBuf
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineSection {
  pub days_back:  u32,
  pub days_ahead: u32,
  pub width:      usize
}

impl Default for Config {
  fn default() -> Self {
    Self {
      offset_minutes:
        DEFAULT_OFFSET_MINUTES,
      catalog: PathBuf::from(
        "events.json"
      ),
      color: true,
      data: DataSection::default(),
      timeline:
        TimelineSection::default(),
      loaded_files: vec![]
    }
  }
}

impl Default for DataSection {
  fn default() -> Self {
    Self {
      location: PathBuf::from(
        "~/.resetline"
      )
    }
  }
}

impl Default for TimelineSection {
  fn default() -> Self {
    Self {
      days_back:  1,
      days_ahead: 8,
      width:      72
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    )?;

    let mut cfg = if let Some(path) =
      path
    {
      info!(config = %path.display(), "loading config");
      Self::load_file(&path)?
    } else {
      warn!(
        "no config file found; using \
         defaults"
      );
      Self::default()
    };

    if let Ok(raw) =
      std::env::var(OFFSET_ENV_VAR)
    {
      debug!(value = %raw, "offset taken from environment");
      cfg.apply_overrides([(
        "offset_minutes".to_string(),
        raw
      )])?;
    }

    Ok(cfg)
  }

  #[tracing::instrument]
  fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg: Config =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  /// Applies `key=value` overrides on
  /// top of the loaded file. An `rc.`
  /// prefix on the key is accepted.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .trim();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key {
        | "offset_minutes" => {
          self.offset_minutes = value
            .parse()
            .with_context(|| {
              format!(
                "invalid offset_minutes: \
                 {value}"
              )
            })?;
        }
        | "catalog" => {
          self.catalog =
            PathBuf::from(value);
        }
        | "color" => {
          self.color =
            parse_bool(value)?;
        }
        | "data.location" => {
          self.data.location =
            PathBuf::from(value);
        }
        | "timeline.days_back" => {
          self.timeline.days_back =
            value.parse().with_context(
              || {
                format!(
                  "invalid \
                   timeline.days_back: \
                   {value}"
                )
              }
            )?;
        }
        | "timeline.days_ahead" => {
          self.timeline.days_ahead =
            value.parse().with_context(
              || {
                format!(
                  "invalid \
                   timeline.days_ahead: \
                   {value}"
                )
              }
            )?;
        }
        | "timeline.width" => {
          self.timeline.width =
            value.parse().with_context(
              || {
                format!(
                  "invalid \
                   timeline.width: \
                   {value}"
                )
              }
            )?;
        }
        | other => {
          warn!(key = %other, "unknown config key; ignoring");
        }
      }
    }

    Ok(())
  }

  pub fn reference_clock(
    &self
  ) -> anyhow::Result<ReferenceClock> {
    ReferenceClock::from_offset_minutes(
      self.offset_minutes
    )
    .context(
      "invalid reference clock offset"
    )
  }

  #[must_use]
  pub fn catalog_path(&self) -> PathBuf {
    expand_tilde(&self.catalog)
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else {
    expand_tilde(&cfg.data.location)
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(config_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if config_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      config_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate =
    home.join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "invalid boolean: {other}"
      ))
    }
  }
}
