//! Anatomical label entries, static fallback tables, and response parsing

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::organ::{LabelFamily, OrganKey};

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("No JSON array found in response text")]
    NoJsonArray,
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Response contained no labels")]
    Empty,
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
}

/// One annotated anatomical part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Fallback coordinate in the framed model's normalized space
    pub position: [f32; 3],
}

/// Where a label set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Generated,
    Fallback,
}

/// Labels for one organ session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSet {
    pub organ: OrganKey,
    pub source: LabelSource,
    pub labels: Vec<LabelEntry>,
}

impl LabelSet {
    /// The static table for `organ`
    pub fn fallback(organ: OrganKey) -> Self {
        Self {
            organ,
            source: LabelSource::Fallback,
            labels: fallback_labels(organ),
        }
    }
}

type StaticLabel = (&'static str, &'static str, [f32; 3]);

const KIDNEY_LABELS: &[StaticLabel] = &[
    ("Renal Cortex", "Outer layer of the kidney where blood is filtered in the glomeruli.", [0.45, 0.3, 0.1]),
    ("Renal Medulla", "Inner region made of renal pyramids that concentrate urine.", [0.2, 0.15, 0.05]),
    ("Renal Pelvis", "Funnel-shaped basin that collects urine before it enters the ureter.", [-0.15, 0.0, 0.0]),
    ("Renal Artery", "Delivers oxygenated blood from the aorta to the kidney.", [-0.45, 0.2, 0.1]),
    ("Renal Vein", "Returns filtered blood from the kidney to the inferior vena cava.", [-0.45, 0.05, -0.1]),
    ("Ureter", "Muscular tube carrying urine from the renal pelvis to the bladder.", [-0.3, -0.6, 0.0]),
    ("Renal Capsule", "Tough fibrous layer enclosing and protecting the kidney.", [0.55, -0.2, 0.15]),
    ("Renal Pyramid", "Cone-shaped medullary tissue containing loops of Henle and collecting ducts.", [0.25, -0.1, 0.05]),
    ("Major Calyx", "Collects urine from several minor calyces and drains into the renal pelvis.", [0.0, 0.2, 0.0]),
    ("Minor Calyx", "Cup-shaped cavity receiving urine from the tip of a renal pyramid.", [0.1, 0.35, 0.0]),
];

const HEART_LABELS: &[StaticLabel] = &[
    ("Left Atrium", "Receives oxygenated blood from the pulmonary veins.", [0.3, 0.35, -0.2]),
    ("Right Atrium", "Receives deoxygenated blood from the venae cavae.", [-0.35, 0.3, 0.0]),
    ("Left Ventricle", "Thick-walled chamber pumping blood into the aorta.", [0.25, -0.3, 0.1]),
    ("Right Ventricle", "Pumps deoxygenated blood into the pulmonary trunk.", [-0.2, -0.25, 0.25]),
    ("Aorta", "Main artery carrying oxygenated blood to the body.", [0.05, 0.7, 0.0]),
    ("Pulmonary Artery", "Carries deoxygenated blood to the lungs.", [-0.05, 0.55, 0.2]),
    ("Superior Vena Cava", "Returns blood from the upper body to the right atrium.", [-0.4, 0.65, -0.05]),
    ("Mitral Valve", "Valve between the left atrium and left ventricle.", [0.2, 0.05, 0.0]),
];

const LUNG_LABELS: &[StaticLabel] = &[
    ("Trachea", "Airway carrying air from the larynx to the bronchi.", [0.0, 0.8, 0.0]),
    ("Right Main Bronchus", "Wider, more vertical branch supplying the right lung.", [-0.15, 0.45, 0.0]),
    ("Left Main Bronchus", "Narrower branch supplying the left lung.", [0.15, 0.45, 0.0]),
    ("Right Upper Lobe", "Superior lobe of the right lung.", [-0.5, 0.35, 0.0]),
    ("Right Lower Lobe", "Inferior lobe of the right lung.", [-0.5, -0.4, 0.0]),
    ("Left Upper Lobe", "Superior lobe of the left lung, including the lingula.", [0.5, 0.3, 0.0]),
    ("Left Lower Lobe", "Inferior lobe of the left lung.", [0.5, -0.4, 0.0]),
    ("Pleura", "Serous membrane lining the lungs and thoracic cavity.", [0.7, 0.0, 0.1]),
];

const LIVER_LABELS: &[StaticLabel] = &[
    ("Right Lobe", "Largest lobe of the liver.", [-0.4, 0.1, 0.0]),
    ("Left Lobe", "Smaller, flattened lobe extending across the midline.", [0.45, 0.15, 0.0]),
    ("Caudate Lobe", "Small lobe on the posterior surface near the vena cava.", [0.0, 0.2, -0.3]),
    ("Quadrate Lobe", "Lobe on the inferior surface beside the gallbladder.", [0.1, -0.2, 0.2]),
    ("Gallbladder", "Stores and concentrates bile produced by the liver.", [-0.1, -0.35, 0.25]),
    ("Hepatic Portal Vein", "Brings nutrient-rich blood from the gut to the liver.", [0.0, -0.1, -0.15]),
    ("Hepatic Artery", "Supplies oxygenated blood to the liver.", [0.1, -0.05, -0.1]),
    ("Common Bile Duct", "Carries bile to the duodenum.", [-0.05, -0.45, 0.0]),
];

const BRAIN_LABELS: &[StaticLabel] = &[
    ("Frontal Lobe", "Planning, decision making and voluntary movement.", [0.0, 0.35, 0.6]),
    ("Parietal Lobe", "Integrates touch, temperature and spatial sense.", [0.0, 0.6, -0.1]),
    ("Temporal Lobe", "Hearing, language comprehension and memory.", [0.6, -0.05, 0.1]),
    ("Occipital Lobe", "Primary visual processing.", [0.0, 0.2, -0.7]),
    ("Cerebellum", "Coordinates balance and fine motor control.", [0.0, -0.4, -0.5]),
    ("Brainstem", "Controls breathing, heart rate and other vital functions.", [0.0, -0.6, -0.15]),
    ("Thalamus", "Relay station for sensory and motor signals.", [0.0, 0.05, 0.0]),
    ("Hippocampus", "Forms and consolidates new memories.", [0.3, -0.1, 0.0]),
];

fn family_table(family: LabelFamily) -> &'static [StaticLabel] {
    match family {
        LabelFamily::Kidney => KIDNEY_LABELS,
        LabelFamily::Heart => HEART_LABELS,
        LabelFamily::Lung => LUNG_LABELS,
        LabelFamily::Liver => LIVER_LABELS,
        LabelFamily::Brain => BRAIN_LABELS,
    }
}

/// Static label table for an organ (empty for organs without a table)
pub fn fallback_labels(organ: OrganKey) -> Vec<LabelEntry> {
    let Some(family) = organ.label_family() else {
        return Vec::new();
    };
    family_table(family)
        .iter()
        .map(|(name, description, position)| LabelEntry {
            name: name.to_string(),
            description: description.to_string(),
            position: *position,
        })
        .collect()
}

/// Prompt sent to the text-generation service for an organ
pub fn generation_prompt(organ: OrganKey) -> String {
    format!(
        "List the 8 to 10 most important anatomical parts of the human {organ}. \
         Respond with only a JSON array. Each element must be an object with the keys \
         \"name\" (short anatomical name), \"description\" (one sentence) and \
         \"position\" (an array of three numbers between -1 and 1 giving the approximate \
         location on a model centered at the origin, x to the right, y up, z toward the viewer).",
        organ = organ.display_name().to_lowercase()
    )
}

/// Parse the first bracketed JSON array out of free-form response text
///
/// Generated text often wraps the array in prose or markdown fences, so
/// everything outside the outermost `[` ... `]` pair is ignored.
pub fn extract_label_array(text: &str) -> Result<Vec<LabelEntry>, LabelError> {
    let start = text.find('[').ok_or(LabelError::NoJsonArray)?;
    let end = text.rfind(']').ok_or(LabelError::NoJsonArray)?;
    if end < start {
        return Err(LabelError::NoJsonArray);
    }

    let labels: Vec<LabelEntry> = serde_json::from_str(&text[start..=end])?;
    if labels.is_empty() {
        return Err(LabelError::Empty);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kidney_table_has_ten_entries() {
        let labels = fallback_labels(OrganKey::Kidney1);
        assert_eq!(labels.len(), 10);
        assert_eq!(labels, fallback_labels(OrganKey::Kidney2));
        assert_eq!(labels[0].name, "Renal Cortex");
    }

    #[test]
    fn test_every_family_has_a_table() {
        for organ in OrganKey::ALL {
            let labels = fallback_labels(organ);
            if organ.label_family().is_some() {
                assert!(!labels.is_empty(), "{organ} has no fallback labels");
            } else {
                assert!(labels.is_empty());
            }
        }
    }

    #[test]
    fn test_extract_ignores_surrounding_text() {
        let text = "Here you go:\n```json\n[{\"name\": \"Aorta\", \"description\": \"Big artery\", \"position\": [0, 0.7, 0]}]\n```";
        let labels = extract_label_array(text).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name, "Aorta");
        assert_eq!(labels[0].position, [0.0, 0.7, 0.0]);
    }

    #[test]
    fn test_extract_defaults_missing_description() {
        let labels = extract_label_array(r#"[{"name": "Hilum", "position": [1, 2, 3]}]"#).unwrap();
        assert_eq!(labels[0].description, "");
    }

    #[test]
    fn test_extract_rejects_malformed_content() {
        assert!(matches!(extract_label_array("no array here"), Err(LabelError::NoJsonArray)));
        assert!(matches!(extract_label_array("] backwards ["), Err(LabelError::NoJsonArray)));
        assert!(matches!(extract_label_array("[]"), Err(LabelError::Empty)));
        assert!(matches!(
            extract_label_array(r#"[{"name": "Aorta"}]"#),
            Err(LabelError::JsonError(_))
        ));
    }

    #[test]
    fn test_prompt_mentions_organ() {
        assert!(generation_prompt(OrganKey::Kidney2).contains("human kidney"));
    }
}
