//! Organ catalog: the fixed set of viewable organs and their assets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown organ: {0}")]
pub struct UnknownOrgan(pub String);

/// Identifies which model and label table to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganKey {
    Lung,
    Heart,
    Heart2,
    Teeth,
    Brain,
    Liver,
    Kidney1,
    Kidney2,
}

/// Which static label table an organ shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelFamily {
    Kidney,
    Heart,
    Lung,
    Liver,
    Brain,
}

impl OrganKey {
    pub const ALL: [OrganKey; 8] = [
        OrganKey::Lung,
        OrganKey::Heart,
        OrganKey::Heart2,
        OrganKey::Teeth,
        OrganKey::Brain,
        OrganKey::Liver,
        OrganKey::Kidney1,
        OrganKey::Kidney2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganKey::Lung => "lung",
            OrganKey::Heart => "heart",
            OrganKey::Heart2 => "heart2",
            OrganKey::Teeth => "teeth",
            OrganKey::Brain => "brain",
            OrganKey::Liver => "liver",
            OrganKey::Kidney1 => "kidney1",
            OrganKey::Kidney2 => "kidney2",
        }
    }

    /// Model asset path, relative to the server root
    pub fn model_path(&self) -> &'static str {
        match self {
            OrganKey::Lung => "models/lung2.glb",
            OrganKey::Heart => "models/heart.glb",
            OrganKey::Heart2 => "models/realistic_human_heart.glb",
            OrganKey::Teeth => "models/Mandibular_teeth_w_base_NIH3D.glb",
            OrganKey::Brain => "models/brain.glb",
            OrganKey::Liver => "models/liver3.glb",
            OrganKey::Kidney1 => "models/kidney.glb",
            OrganKey::Kidney2 => "models/kidney2.glb",
        }
    }

    /// Human-readable organ name (used in prompts and the UI)
    pub fn display_name(&self) -> &'static str {
        match self {
            OrganKey::Lung => "Lung",
            OrganKey::Heart | OrganKey::Heart2 => "Heart",
            OrganKey::Teeth => "Teeth",
            OrganKey::Brain => "Brain",
            OrganKey::Liver => "Liver",
            OrganKey::Kidney1 | OrganKey::Kidney2 => "Kidney",
        }
    }

    /// Static label table family, `None` for organs without one
    pub fn label_family(&self) -> Option<LabelFamily> {
        match self {
            OrganKey::Lung => Some(LabelFamily::Lung),
            OrganKey::Heart | OrganKey::Heart2 => Some(LabelFamily::Heart),
            OrganKey::Brain => Some(LabelFamily::Brain),
            OrganKey::Liver => Some(LabelFamily::Liver),
            OrganKey::Kidney1 | OrganKey::Kidney2 => Some(LabelFamily::Kidney),
            OrganKey::Teeth => None,
        }
    }
}

impl fmt::Display for OrganKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganKey {
    type Err = UnknownOrgan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        // Bare "kidney" is accepted as the first kidney asset
        if wanted == "kidney" {
            return Ok(OrganKey::Kidney1);
        }
        OrganKey::ALL
            .into_iter()
            .find(|organ| organ.as_str() == wanted)
            .ok_or_else(|| UnknownOrgan(s.to_string()))
    }
}

/// Catalog entry as served to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganInfo {
    pub key: OrganKey,
    pub name: String,
    pub model: String,
}

impl From<OrganKey> for OrganInfo {
    fn from(key: OrganKey) -> Self {
        Self {
            key,
            name: key.display_name().to_string(),
            model: key.model_path().to_string(),
        }
    }
}

/// Full catalog in display order
pub fn catalog() -> Vec<OrganInfo> {
    OrganKey::ALL.into_iter().map(OrganInfo::from).collect()
}
