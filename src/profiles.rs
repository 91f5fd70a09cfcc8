use crate::session::RenderStyle;
use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug)]
pub struct ProfileDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl ProfileDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Identity issued elsewhere: the auth flow that produced `user_id` is not our
/// concern, we only carry the opaque identifier to the score service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub style: Option<RenderStyle>,
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

pub fn default_profile_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".pokesmash").join("profiles"))
}

pub fn resolve_profile_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_profile_dir(),
    }
}

pub fn list_profiles(dir: &Path) -> Result<Vec<ProfileDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut profiles = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read profile directory")? {
        let entry = entry.wrap_err("Failed to read profile entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid profile filename {:?}", path))?
            .to_owned();
        profiles.push(ProfileDescriptor::new(name, path));
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

pub fn find_profile(dir: &Path, name: &str) -> Result<ProfileDescriptor> {
    let profiles = list_profiles(dir)?;
    profiles
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| eyre!("Profile '{name}' not found in {}", dir.to_string_lossy()))
}

pub fn load_profile(descriptor: &ProfileDescriptor) -> Result<Profile> {
    let raw = fs::read_to_string(&descriptor.path).wrap_err_with(|| {
        format!("Failed to read profile '{}'", descriptor.name)
    })?;
    let profile: Profile = serde_json::from_str(&raw).wrap_err_with(|| {
        format!("Profile '{}' is not valid JSON", descriptor.name)
    })?;
    if profile.user_id.trim().is_empty() {
        return Err(eyre!("Profile '{}' has an empty user id", descriptor.name));
    }
    Ok(profile)
}

pub fn save_profile(descriptor: &ProfileDescriptor, profile: &Profile) -> Result<()> {
    if let Some(parent) = descriptor.path.parent() {
        fs::create_dir_all(parent).wrap_err("Failed to create profile directory")?;
    }
    let raw = serde_json::to_string_pretty(profile)
        .wrap_err("Failed to serialize profile")?;
    fs::write(&descriptor.path, raw).wrap_err_with(|| {
        format!("Failed to write profile '{}'", descriptor.name)
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn load_profile__rejects_an_empty_user_id() {
        // given
        let dir = std::env::temp_dir().join("pokesmash-profile-tests-empty");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("anon.json");
        fs::write(&path, r#"{ "user_id": " ", "display_name": "anon" }"#).unwrap();
        let descriptor = ProfileDescriptor::new("anon", path);

        // when
        let result = load_profile(&descriptor);

        // then
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_profile__round_trips_style_and_identity() {
        // given
        let dir = std::env::temp_dir().join("pokesmash-profile-tests-roundtrip");
        let descriptor = ProfileDescriptor::new("jimmy", dir.join("jimmy.json"));
        let profile = Profile {
            user_id: "twitch:12345".to_string(),
            display_name: "Jimmy".to_string(),
            style: Some(RenderStyle::Showdown),
            last_played_at: None,
        };

        // when
        save_profile(&descriptor, &profile).unwrap();
        let loaded = load_profile(&descriptor).unwrap();

        // then
        assert_eq!(loaded.user_id, profile.user_id);
        assert_eq!(loaded.display_name, profile.display_name);
        assert_eq!(loaded.style, Some(RenderStyle::Showdown));
    }

    #[test]
    fn list_profiles__returns_sorted_json_profiles_only() {
        // given
        let dir = std::env::temp_dir().join("pokesmash-profile-tests-list");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("zoe.json"), "{}").unwrap();
        fs::write(dir.join("abe.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        // when
        let profiles = list_profiles(&dir).unwrap();

        // then
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["abe", "zoe"]);
    }
}
