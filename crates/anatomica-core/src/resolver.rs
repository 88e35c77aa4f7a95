//! Anatomical label to mesh resolution
//!
//! Model mesh names are inconsistent across assets ("LeftAtriumMesh",
//! "kidney_cortex_01", "Object_12"), so a label is matched with a
//! best-effort cascade:
//!
//! 1. case-insensitive exact name match
//! 2. case-insensitive substring match (mesh name contains the label)
//! 3. synonym-keyword match through [`SYNONYM_GROUPS`]
//!
//! The first rule that produces a hit wins, and within a rule the first
//! mesh in index order wins. There is no scoring, so resolution is fully
//! deterministic for an unchanged index. A miss is expected and is
//! answered by anchoring to the label's fallback coordinate.

use crate::mesh_index::{MeshIndex, MeshRef};

/// Canonical anatomical roots and the keyword variants that identify them
///
/// Order matters: more specific groups come before groups whose variants
/// they contain (e.g. "hypothalamus" before "thalamus").
pub static SYNONYM_GROUPS: &[(&str, &[&str])] = &[
    ("atrium", &["atrium", "atria", "atrial"]),
    ("ventricle", &["ventricle", "ventricular"]),
    ("cortex", &["cortex", "cortical"]),
    ("lobule", &["lobule", "lobular"]),
    ("lobe", &["lobe", "lobar"]),
    ("bronch", &["bronch"]),
    ("aorta", &["aorta", "aortic"]),
    ("valve", &["valve", "valvular", "mitral", "tricuspid"]),
    ("artery", &["artery", "arteries", "arterial"]),
    ("vein", &["vein", "venous", "vena"]),
    ("medulla", &["medulla", "medullary"]),
    ("pelvis", &["pelvis", "pelvic"]),
    ("calyx", &["calyx", "calyces", "calices"]),
    ("capsule", &["capsule", "capsular"]),
    ("pyramid", &["pyramid"]),
    ("ureter", &["ureter"]),
    ("hilum", &["hilum", "hilus", "hilar"]),
    ("trachea", &["trachea", "tracheal"]),
    ("pleura", &["pleura", "pleural"]),
    ("diaphragm", &["diaphragm"]),
    ("hepatic", &["hepatic", "hepato"]),
    ("portal", &["portal"]),
    ("gallbladder", &["gallbladder", "gall bladder", "biliary"]),
    ("cerebellum", &["cerebellum", "cerebellar"]),
    ("hypothalamus", &["hypothalamus", "hypothalamic"]),
    ("thalamus", &["thalamus", "thalamic"]),
    ("hippocampus", &["hippocampus", "hippocampal"]),
    ("brainstem", &["brainstem", "brain stem", "pons", "midbrain"]),
    ("gyrus", &["gyrus", "gyri"]),
    ("tooth", &["tooth", "teeth", "molar", "incisor", "canine"]),
    ("enamel", &["enamel", "crown"]),
    ("root canal", &["root canal", "pulp"]),
];

/// Which cascade rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    Substring,
    Synonym(&'static str),
}

/// Outcome of resolving a label against a mesh index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { mesh: MeshRef, rule: MatchRule },
    NotFound,
}

impl Resolution {
    pub fn mesh(&self) -> Option<&MeshRef> {
        match self {
            Resolution::Found { mesh, .. } => Some(mesh),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Resolve a free-text anatomical label to a mesh
pub fn resolve(index: &MeshIndex, query: &str) -> Resolution {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Resolution::NotFound;
    }

    if let Some(mesh) = index.iter().find(|m| m.key == query) {
        return found(mesh, MatchRule::Exact);
    }

    if let Some(mesh) = index.iter().find(|m| m.key.contains(&query)) {
        return found(mesh, MatchRule::Substring);
    }

    for (canonical, variants) in matching_groups(&query) {
        let hit = index
            .iter()
            .find(|m| variants.iter().any(|variant| m.key.contains(variant)));
        if let Some(mesh) = hit {
            return found(mesh, MatchRule::Synonym(canonical));
        }
    }

    Resolution::NotFound
}

/// Synonym groups with at least one variant appearing in the (lowercased) query
fn matching_groups(query: &str) -> impl Iterator<Item = (&'static str, &'static [&'static str])> + '_ {
    SYNONYM_GROUPS
        .iter()
        .copied()
        .filter(move |(_, variants)| variants.iter().any(|variant| query.contains(variant)))
}

fn found(mesh: &MeshRef, rule: MatchRule) -> Resolution {
    tracing::debug!(mesh = %mesh.name, ?rule, "Resolved label to mesh");
    Resolution::Found {
        mesh: mesh.clone(),
        rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Aabb, NodeTransform, SceneGraph};
    use glam::Vec3;

    fn index_of(names: &[&str]) -> MeshIndex {
        let mut graph = SceneGraph::new("Scene");
        for name in names {
            graph.add_node(
                graph.root(),
                *name,
                NodeTransform::IDENTITY,
                Some(Aabb::new(Vec3::ZERO, Vec3::ONE)),
            );
        }
        MeshIndex::build(&graph)
    }

    fn resolved_name(resolution: &Resolution) -> Option<&str> {
        resolution.mesh().map(|m| m.name.as_str())
    }

    #[test]
    fn test_exact_beats_substring() {
        let index = index_of(&["AortaProxy", "Aorta"]);
        let resolution = resolve(&index, "Aorta");
        assert_eq!(resolved_name(&resolution), Some("Aorta"));
        assert!(matches!(resolution, Resolution::Found { rule: MatchRule::Exact, .. }));
    }

    #[test]
    fn test_exact_is_case_insensitive() {
        let index = index_of(&["RENAL_PELVIS_X", "renal pelvis"]);
        assert_eq!(resolved_name(&resolve(&index, "Renal Pelvis")), Some("renal pelvis"));
    }

    #[test]
    fn test_substring_match() {
        let index = index_of(&["Object_1", "kidney_renal cortex_01"]);
        let resolution = resolve(&index, "Renal Cortex");
        assert_eq!(resolved_name(&resolution), Some("kidney_renal cortex_01"));
        assert!(matches!(resolution, Resolution::Found { rule: MatchRule::Substring, .. }));
    }

    #[test]
    fn test_synonym_only_when_exact_and_substring_miss() {
        let index = index_of(&["Ventricle_L", "LeftAtriumMesh"]);
        let resolution = resolve(&index, "Atria");
        assert_eq!(resolved_name(&resolution), Some("LeftAtriumMesh"));
        assert!(matches!(resolution, Resolution::Found { rule: MatchRule::Synonym("atrium"), .. }));
    }

    #[test]
    fn test_synonym_group_is_respected() {
        // "Left Ventricle" must not resolve through the atrium group
        let index = index_of(&["RightAtrium", "ventricular_wall"]);
        assert_eq!(resolved_name(&resolve(&index, "Left Ventricle")), Some("ventricular_wall"));
    }

    #[test]
    fn test_first_node_in_index_order_wins() {
        let index = index_of(&["cortex_a", "cortex_b"]);
        assert_eq!(resolved_name(&resolve(&index, "cortex")), Some("cortex_a"));
    }

    #[test]
    fn test_not_found() {
        let index = index_of(&["Object_1", "Object_2"]);
        assert_eq!(resolve(&index, "Renal Artery"), Resolution::NotFound);
        assert_eq!(resolve(&index, "   "), Resolution::NotFound);
        assert_eq!(resolve(&MeshIndex::default(), "Aorta"), Resolution::NotFound);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let index = index_of(&["lobe_upper", "LowerLobe", "Bronchus"]);
        let first = resolve(&index, "Right Lower Lobe");
        for _ in 0..10 {
            assert_eq!(resolve(&index, "Right Lower Lobe"), first);
        }
    }

    #[test]
    fn test_specific_group_checked_before_contained_group() {
        let index = index_of(&["Thalamus_L", "Hypothalamus_core"]);
        let resolution = resolve(&index, "the hypothalamic region");
        assert_eq!(resolved_name(&resolution), Some("Hypothalamus_core"));
    }

    #[test]
    fn test_unnamed_meshes_never_match() {
        let index = index_of(&["", "", "Aorta", "kidney_renal cortex_01", "LeftAtriumMesh"]);
        assert_eq!(index.len(), 5);

        let exact = resolve(&index, "Aorta");
        assert_eq!(resolved_name(&exact), Some("Aorta"));
        assert!(matches!(exact, Resolution::Found { rule: MatchRule::Exact, .. }));

        let substring = resolve(&index, "Renal Cortex");
        assert_eq!(resolved_name(&substring), Some("kidney_renal cortex_01"));
        assert!(matches!(substring, Resolution::Found { rule: MatchRule::Substring, .. }));

        let synonym = resolve(&index, "Atria");
        assert_eq!(resolved_name(&synonym), Some("LeftAtriumMesh"));
        assert!(matches!(synonym, Resolution::Found { rule: MatchRule::Synonym("atrium"), .. }));

        assert_eq!(resolve(&index_of(&["", ""]), "Ureter"), Resolution::NotFound);
    }
}
