//! Baseline image listing and simulated image/video generation
//!
//! Generation is simulated: the tools write a small placeholder file
//! describing what would have been produced.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::params::{GenerateFromImageParams, ListBaselineImagesParams};
use super::{parse_arguments, Tool, ToolError};

const LIST_TOOL: &str = "list_baseline_images";

/// Sentinel returned in place of a listing when the directory is missing
pub fn missing_dir_sentinel(dir: &Path) -> String {
    format!("Error: '{}' directory not found.", dir.display())
}

/// Keep names ending in `suffix`, joined onto `dir`, in the given order
pub fn filter_listing<I>(dir: &Path, names: I, suffix: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter(|name| name.ends_with(suffix))
        .map(|name| dir.join(name).display().to_string())
        .collect()
}

/// Lists baseline images from a fixed directory
pub struct ListBaselineImages {
    dir: PathBuf,
    suffix: String,
}

impl ListBaselineImages {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    /// Matching paths in directory-listing order
    ///
    /// A missing directory yields a one-element list holding the sentinel
    /// string. Other I/O failures are returned as errors.
    pub async fn list(&self) -> Result<Vec<String>, ToolError> {
        let io_error = |source| ToolError::Io {
            tool: LIST_TOOL.to_string(),
            path: self.dir.display().to_string(),
            source,
        };

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.dir.display(), "Baseline directory not found");
                return Ok(vec![missing_dir_sentinel(&self.dir)]);
            }
            Err(e) => return Err(io_error(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }

        Ok(filter_listing(&self.dir, names, &self.suffix))
    }
}

#[async_trait]
impl Tool for ListBaselineImages {
    fn name(&self) -> &str {
        LIST_TOOL
    }

    fn description(&self) -> &str {
        "List the baseline images available as starting points for generated media."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ListBaselineImagesParams))
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let _params: ListBaselineImagesParams = parse_arguments(LIST_TOOL, arguments)?;
        let paths = self.list().await?;
        Ok(serde_json::json!(paths))
    }
}

/// Kind of simulated media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "generate_image_from_prompt_and_image",
            MediaKind::Video => "generate_video_from_prompt_and_image",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MediaKind::Image => {
                "Generate a campaign image from a creative prompt and a baseline image."
            }
            MediaKind::Video => {
                "Generate a short campaign video from a creative prompt and a baseline image."
            }
        }
    }
}

/// Success record returned by the generation tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub status: String,
    pub kind: MediaKind,
    pub path: String,
    pub source_image: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// Simulated generator writing placeholder files
///
/// File names are `<input stem>_<n>.<ext>` where `n` comes from a
/// per-generator counter. Files are created with create-new semantics and
/// taken names are skipped, so existing artifacts are never overwritten.
pub struct SimulatedGenerator {
    kind: MediaKind,
    output_dir: PathBuf,
    counter: AtomicU64,
}

impl SimulatedGenerator {
    pub fn new(kind: MediaKind, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            output_dir: output_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ToolError {
        ToolError::Io {
            tool: self.kind.tool_name().to_string(),
            path: path.display().to_string(),
            source,
        }
    }

    /// Write a placeholder asset for `image_path` and return its record
    pub async fn generate(
        &self,
        prompt: &str,
        image_path: &str,
    ) -> Result<GenerationRecord, ToolError> {
        let stem = Path::new(image_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: self.kind.tool_name().to_string(),
                message: format!("image_path '{}' has no file name", image_path),
            })?;

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| self.io_error(&self.output_dir, e))?;

        let (path, mut file) = loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let path = self
                .output_dir
                .join(format!("{}_{}.{}", stem, n, self.kind.extension()));

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(self.io_error(&path, e)),
            }
        };

        let created_at = Utc::now();
        let placeholder = format!(
            "Simulated {:?} asset\nSource image: {}\nPrompt: {}\nCreated: {}\n",
            self.kind,
            image_path,
            prompt,
            created_at.to_rfc3339()
        );
        file.write_all(placeholder.as_bytes())
            .await
            .map_err(|e| self.io_error(&path, e))?;

        tracing::info!(path = %path.display(), kind = ?self.kind, "Wrote simulated asset");

        Ok(GenerationRecord {
            status: "success".to_string(),
            kind: self.kind,
            path: path.display().to_string(),
            source_image: image_path.to_string(),
            prompt: prompt.to_string(),
            created_at,
        })
    }
}

#[async_trait]
impl Tool for SimulatedGenerator {
    fn name(&self) -> &str {
        self.kind.tool_name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(GenerateFromImageParams))
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let params: GenerateFromImageParams = parse_arguments(self.name(), arguments)?;
        let record = self.generate(&params.prompt, &params.image_path).await?;
        serde_json::to_value(record).map_err(|e| ToolError::InvalidArguments {
            tool: self.name().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_listing_keeps_matching_suffix_in_order() {
        let listing = names(&["image1.png", "image2.jpg", "image3.png", "document.txt"]);
        let result = filter_listing(Path::new("images_baseline"), listing, ".png");

        assert_eq!(
            result,
            vec![
                Path::new("images_baseline").join("image1.png").display().to_string(),
                Path::new("images_baseline").join("image3.png").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_filter_listing_does_not_sort() {
        let listing = names(&["zeta.png", "alpha.png", "mid.png"]);
        let result = filter_listing(Path::new("images_baseline"), listing, ".png");

        assert_eq!(
            result,
            vec![
                "images_baseline/zeta.png",
                "images_baseline/alpha.png",
                "images_baseline/mid.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_matches_directory_order() {
        let tmp = TempDir::new().unwrap();
        for name in ["image1.png", "image2.jpg", "image3.png", "document.txt"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let tool = ListBaselineImages::new(tmp.path(), ".png");
        let result = tool.list().await.unwrap();

        let expected: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".png"))
            .map(|n| tmp.path().join(n).display().to_string())
            .collect();
        assert_eq!(result, expected);
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let tool = ListBaselineImages::new(tmp.path(), ".png");
        assert!(tool.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_directory_returns_sentinel() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("images_baseline");
        let tool = ListBaselineImages::new(&missing, ".png");

        let result = tool.list().await.unwrap();
        assert_eq!(result, vec![missing_dir_sentinel(&missing)]);
        assert_eq!(
            missing_dir_sentinel(Path::new("images_baseline")),
            "Error: 'images_baseline' directory not found."
        );
    }

    #[tokio::test]
    async fn test_list_tool_call_returns_json_array() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hero.png"), b"x").unwrap();
        let tool = ListBaselineImages::new(tmp.path(), ".png");

        let value = tool.call(serde_json::Value::Null).await.unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_image_path() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("generated_images");
        let generator = SimulatedGenerator::new(MediaKind::Image, &out);

        let record = generator
            .generate("cup on a mossy rock", "images_baseline/image3.png")
            .await
            .unwrap();

        let path = Path::new(&record.path);
        assert_eq!(record.status, "success");
        assert_eq!(path.parent().unwrap(), out.as_path());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("image3_"));
        assert_eq!(path.extension().unwrap(), "png");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_generate_video_path() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("generated_videos");
        let generator = SimulatedGenerator::new(MediaKind::Video, &out);

        let value = generator
            .call(serde_json::json!({
                "prompt": "slow pan",
                "image_path": "images_baseline/image3.png"
            }))
            .await
            .unwrap();

        let path = PathBuf::from(value["path"].as_str().unwrap());
        assert_eq!(path.parent().unwrap(), out.as_path());
        assert!(path.file_stem().unwrap().to_string_lossy().starts_with("image3_"));
        assert_eq!(path.extension().unwrap(), "mp4");
        assert_eq!(value["kind"], "video");
    }

    #[tokio::test]
    async fn test_generate_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("generated_images");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("image3_1.png"), b"existing").unwrap();

        let generator = SimulatedGenerator::new(MediaKind::Image, &out);
        let first = generator.generate("a", "image3.png").await.unwrap();
        let second = generator.generate("b", "image3.png").await.unwrap();

        assert_ne!(first.path, second.path);
        assert!(!first.path.ends_with("image3_1.png"));
        assert_eq!(std::fs::read(out.join("image3_1.png")).unwrap(), b"existing");
    }

    #[tokio::test]
    async fn test_generate_rejects_missing_arguments() {
        let tmp = TempDir::new().unwrap();
        let generator = SimulatedGenerator::new(MediaKind::Image, tmp.path());

        let err = generator
            .call(serde_json::json!({"prompt": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
