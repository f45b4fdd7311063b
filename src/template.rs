use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TemplateError;

static TEMPLATE_DIR: Dir = include_dir!("src/templates");

/// One planned set in a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedSet {
    #[serde(default)]
    pub target_reps: Option<u32>,
    #[serde(default)]
    pub target_weight: Option<f64>,
    #[serde(default)]
    pub target_duration_secs: Option<u32>,
    #[serde(default)]
    pub rest_secs: u32,
}

impl PlannedSet {
    pub fn reps(reps: u32, weight: f64, rest_secs: u32) -> Self {
        Self {
            target_reps: Some(reps),
            target_weight: Some(weight),
            target_duration_secs: None,
            rest_secs,
        }
    }

    pub fn timed(duration_secs: u32, rest_secs: u32) -> Self {
        Self {
            target_reps: None,
            target_weight: None,
            target_duration_secs: Some(duration_secs),
            rest_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub id: String,
    pub name: String,
    pub sets: Vec<PlannedSet>,
}

/// A trainer-authored blueprint of exercises, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub exercises: Vec<ExerciseTemplate>,
}

impl WorkoutTemplate {
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Source of workout templates
pub trait TemplateProvider {
    fn fetch_template(&self, id: &str) -> Result<WorkoutTemplate, TemplateError>;
    fn list_templates(&self) -> Result<Vec<WorkoutTemplate>, TemplateError>;
}

fn parse_template(id: &str, contents: &str) -> Result<WorkoutTemplate, TemplateError> {
    serde_json::from_str(contents).map_err(|source| TemplateError::Parse {
        id: id.to_string(),
        source,
    })
}

/// Templates stored as `<id>.json` files in a directory
#[derive(Debug, Clone)]
pub struct DirTemplateProvider {
    dir: PathBuf,
}

impl DirTemplateProvider {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn save(&self, template: &WorkoutTemplate) -> Result<PathBuf, TemplateError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", template.id));
        let data = serde_json::to_vec_pretty(template).map_err(|source| TemplateError::Parse {
            id: template.id.clone(),
            source,
        })?;
        fs::write(&path, data)?;
        Ok(path)
    }
}

impl TemplateProvider for DirTemplateProvider {
    fn fetch_template(&self, id: &str) -> Result<WorkoutTemplate, TemplateError> {
        let path = self.dir.join(format!("{id}.json"));
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        parse_template(id, &contents)
    }

    fn list_templates(&self) -> Result<Vec<WorkoutTemplate>, TemplateError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            match parse_template(&id, &fs::read_to_string(&path)?) {
                Ok(t) => templates.push(t),
                Err(e) => log::warn!("skipping unreadable template {}: {e}", path.display()),
            }
        }
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }
}

/// Templates compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplateProvider;

impl TemplateProvider for BundledTemplateProvider {
    fn fetch_template(&self, id: &str) -> Result<WorkoutTemplate, TemplateError> {
        let contents = TEMPLATE_DIR
            .get_file(format!("{id}.json"))
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        parse_template(id, contents)
    }

    fn list_templates(&self) -> Result<Vec<WorkoutTemplate>, TemplateError> {
        let mut templates = TEMPLATE_DIR
            .files()
            .filter_map(|f| {
                let id = f.path().file_stem()?.to_str()?;
                parse_template(id, f.contents_utf8()?).ok()
            })
            .collect::<Vec<_>>();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }
}

/// Consults each provider in order; the first hit wins
#[derive(Default)]
pub struct LayeredTemplateProvider {
    providers: Vec<Box<dyn TemplateProvider>>,
}

impl LayeredTemplateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<P: TemplateProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl TemplateProvider for LayeredTemplateProvider {
    fn fetch_template(&self, id: &str) -> Result<WorkoutTemplate, TemplateError> {
        for provider in &self.providers {
            match provider.fetch_template(id) {
                Err(TemplateError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(TemplateError::NotFound(id.to_string()))
    }

    fn list_templates(&self) -> Result<Vec<WorkoutTemplate>, TemplateError> {
        let mut seen = std::collections::HashSet::new();
        let mut all = Vec::new();
        for provider in &self.providers {
            for t in provider.list_templates()? {
                if seen.insert(t.id.clone()) {
                    all.push(t);
                }
            }
        }
        Ok(all)
    }
}
