use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FADE: i64 = 500;

/// Which side of the face each parameter id belongs to (`exps.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceMap {
    #[serde(default)]
    pub left_face: Vec<String>,
    #[serde(default)]
    pub right_face: Vec<String>,
    #[serde(default)]
    pub center_face: Vec<String>,
}

impl FaceMap {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read face map: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse face map: {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionParam {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of an `.exp.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(default = "default_fade")]
    pub fade_in: i64,
    #[serde(default = "default_fade")]
    pub fade_out: i64,
    #[serde(default)]
    pub params: Vec<ExpressionParam>,
}

fn default_fade() -> i64 {
    DEFAULT_FADE
}

impl Expression {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read expression: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse expression: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize expression as JSON")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write expression: {}", path.display()))
    }

    fn param(&self, id: &str) -> Option<&ExpressionParam> {
        self.params.iter().find(|param| param.id == id)
    }
}

/// Combine a left-face and a right-face expression.
///
/// Left-face ids come from `left`, right-face ids from `right`, centre ids
/// from `left` falling back to `right`, anything unclassified from `right`.
/// Fades are taken from `left`.
pub fn merge_face_expressions(left: &Expression, right: &Expression, face_map: &FaceMap) -> Expression {
    let left_ids: HashSet<&str> = face_map.left_face.iter().map(String::as_str).collect();
    let right_ids: HashSet<&str> = face_map.right_face.iter().map(String::as_str).collect();
    let center_ids: HashSet<&str> = face_map.center_face.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let ordered_ids: Vec<&str> = left
        .params
        .iter()
        .chain(&right.params)
        .map(|param| param.id.as_str())
        .filter(|id| seen.insert(*id))
        .collect();

    let params = ordered_ids
        .into_iter()
        .filter_map(|id| {
            let chosen = if left_ids.contains(id) {
                left.param(id)
            } else if right_ids.contains(id) {
                right.param(id)
            } else if center_ids.contains(id) {
                left.param(id).or_else(|| right.param(id))
            } else {
                right.param(id)
            };
            chosen.cloned()
        })
        .collect();

    Expression {
        fade_in: left.fade_in,
        fade_out: left.fade_out,
        params,
    }
}

/// Merge two expression files into `output`.
pub fn merge_face_expression_files(left: &Path, right: &Path, face_map: &Path, output: &Path) -> Result<Expression> {
    let merged = merge_face_expressions(
        &Expression::load(left)?,
        &Expression::load(right)?,
        &FaceMap::load(face_map)?,
    );
    merged.save(output)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn expression(value: Value) -> Expression {
        serde_json::from_value(value).expect("expression")
    }

    fn values(expression: &Expression) -> Vec<(String, Value)> {
        expression
            .params
            .iter()
            .map(|param| (param.id.clone(), param.extra["val"].clone()))
            .collect()
    }

    #[test]
    fn given_face_map_when_merging_then_each_side_comes_from_its_file() {
        let left = expression(json!({
            "fade_in": 200,
            "params": [
                {"id": "EYE_L", "val": 1},
                {"id": "EYE_R", "val": 1},
                {"id": "MOUTH", "val": 1},
                {"id": "OTHER", "val": 1}
            ]
        }));
        let right = expression(json!({
            "fade_in": 900, "fade_out": 900,
            "params": [
                {"id": "EYE_L", "val": 2},
                {"id": "EYE_R", "val": 2},
                {"id": "BROW_C", "val": 2},
                {"id": "OTHER", "val": 2},
                {"id": "LEFT_ONLY", "val": 2}
            ]
        }));
        let face_map = FaceMap {
            left_face: vec!["EYE_L".to_string(), "LEFT_ONLY".to_string()],
            right_face: vec!["EYE_R".to_string()],
            center_face: vec!["MOUTH".to_string(), "BROW_C".to_string()],
        };

        let merged = merge_face_expressions(&left, &right, &face_map);

        assert_eq!(merged.fade_in, 200);
        assert_eq!(merged.fade_out, DEFAULT_FADE);
        assert_eq!(
            values(&merged),
            vec![
                ("EYE_L".to_string(), json!(1)),
                ("EYE_R".to_string(), json!(2)),
                ("MOUTH".to_string(), json!(1)),
                ("OTHER".to_string(), json!(2)),
                ("BROW_C".to_string(), json!(2)),
            ]
        );
    }

    #[test]
    fn given_files_when_merging_then_output_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let left = dir.path().join("l.exp.json");
        let right = dir.path().join("r.exp.json");
        let map = dir.path().join("exps.json");
        let output = dir.path().join("merged.exp.json");
        fs::write(&left, json!({"params": [{"id": "A", "val": 1}]}).to_string()).expect("left");
        fs::write(&right, json!({"params": [{"id": "B", "val": 2}]}).to_string()).expect("right");
        fs::write(&map, json!({"left_face": ["A"]}).to_string()).expect("map");

        merge_face_expression_files(&left, &right, &map, &output).expect("merge");

        let written = Expression::load(&output).expect("load");
        assert_eq!(written.params.len(), 2);
        assert_eq!(written.fade_in, DEFAULT_FADE);
    }
}
