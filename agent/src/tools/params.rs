//! Parameter types for the media tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListBaselineImagesParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GenerateFromImageParams {
    #[schemars(description = "Creative direction for the generated asset")]
    pub prompt: String,

    #[schemars(description = "Path of the baseline image to start from (from list_baseline_images)")]
    pub image_path: String,
}
