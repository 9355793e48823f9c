// file: src/config/profiles.rs
// version: 1.0.0
// guid: b7f30c92-6e58-4d1a-a24b-19c8e5d7f042

//! Named submission profiles
//!
//! A profile bundles submission options under a name so that
//! `fyrd submit -P high_mem ...` replaces a pile of flags. Profiles are
//! created from `key:value` tokens on the command line, e.g.
//! `fyrd profile add high_mem cores:92 mem:250GB partition:high-mem`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::FyrdError;
use crate::Result;

/// A named bundle of submission options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    /// Memory in MB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    /// Walltime as HH:MM:SS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
}

impl Profile {
    /// Build a profile from `key:value` tokens
    pub fn from_specs(specs: &[String]) -> Result<Self> {
        let mut profile = Profile::default();
        profile.apply_specs(specs)?;
        Ok(profile)
    }

    /// Apply `key:value` tokens on top of the current values
    pub fn apply_specs(&mut self, specs: &[String]) -> Result<()> {
        for spec in specs {
            let (key, value) = spec.split_once(':').ok_or_else(|| {
                FyrdError::Profile(format!(
                    "Expected key:value, got '{}' (keys: cores, mem, time, partition, modules)",
                    spec
                ))
            })?;
            match key {
                "cores" => {
                    let cores: u32 = value.parse().map_err(|_| bad_value(spec))?;
                    if cores == 0 {
                        return Err(bad_value(spec));
                    }
                    self.cores = Some(cores);
                }
                "mem" => self.mem = Some(parse_mem(value).ok_or_else(|| bad_value(spec))?),
                "time" => self.time = Some(parse_time(value).ok_or_else(|| bad_value(spec))?),
                "partition" => self.partition = Some(value.to_string()),
                "modules" => {
                    self.modules = value
                        .split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => {
                    return Err(FyrdError::Profile(format!(
                        "Unknown profile key '{}' in '{}'",
                        key, spec
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Parse a memory spec to MB: `4000`, `4000MB`, `250GB`, `1G`, `500m`
pub fn parse_mem(value: &str) -> Option<u64> {
    let lower = value.trim().to_lowercase();
    let (digits, multiplier) = if let Some(rest) = lower
        .strip_suffix("gb")
        .or_else(|| lower.strip_suffix('g'))
    {
        (rest, 1024)
    } else if let Some(rest) = lower
        .strip_suffix("mb")
        .or_else(|| lower.strip_suffix('m'))
    {
        (rest, 1)
    } else {
        (lower.as_str(), 1)
    };
    let amount: u64 = digits.trim().parse().ok()?;
    if amount == 0 {
        return None;
    }
    amount.checked_mul(multiplier)
}

/// Parse a walltime spec and normalize it to HH:MM:SS.
///
/// Accepts `HH:MM:SS`, `MM:SS`, or plain minutes.
pub fn parse_time(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (hours, minutes, seconds): (u64, u64, u64) = match parts.as_slice() {
        [m] => (0, m.parse().ok()?, 0),
        [m, s] => (0, m.parse().ok()?, s.parse().ok()?),
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse().ok()?),
        _ => return None,
    };
    if minutes > 59 && parts.len() > 1 {
        return None;
    }
    if seconds > 59 {
        return None;
    }
    // Plain-minute input can exceed an hour
    let total = hours * 3600 + minutes * 60 + seconds;
    Some(format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    ))
}

/// On-disk profile collection, one TOML table per profile
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Load the store; a missing file yields an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("No profile file at {}, starting empty", path.display());
            return Ok(Self {
                path,
                profiles: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FyrdError::Profile(format!(
                "Failed to read profile file {}: {}",
                path.display(),
                e
            ))
        })?;
        let profiles: BTreeMap<String, Profile> = toml::from_str(&content).map_err(|e| {
            FyrdError::Profile(format!(
                "Malformed profile file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { path, profiles })
    }

    /// Save the store, creating the parent directory if needed
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(&self.profiles)?;
        std::fs::write(&self.path, rendered)?;
        debug!("Wrote {} profiles to {}", self.profiles.len(), self.path.display());
        Ok(())
    }

    /// Add a new profile; an existing name is an error
    pub fn add(&mut self, name: &str, profile: Profile) -> Result<()> {
        if self.profiles.contains_key(name) {
            return Err(FyrdError::Profile(format!(
                "Profile '{}' already exists (use 'profile update')",
                name
            )));
        }
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    /// Update an existing profile in place with new `key:value` tokens
    pub fn update(&mut self, name: &str, specs: &[String]) -> Result<()> {
        let profile = self
            .profiles
            .get_mut(name)
            .ok_or_else(|| FyrdError::Profile(format!("No profile named '{}'", name)))?;
        profile.apply_specs(specs)
    }

    /// Remove a profile; a missing name is an error
    pub fn remove(&mut self, name: &str) -> Result<Profile> {
        self.profiles
            .remove(name)
            .ok_or_else(|| FyrdError::Profile(format!("No profile named '{}'", name)))
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// The `default` profile, when one has been configured
    pub fn default_profile(&self) -> Option<&Profile> {
        self.profiles.get("default")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Profile)> {
        self.profiles.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

fn bad_value(spec: &str) -> FyrdError {
    FyrdError::Profile(format!("Malformed profile value in '{}'", spec))
}
