//! Shape generation request model.
//!
//! `ShapeGenerationRequest` is what callers build; `ShapeArguments` is what
//! travels on the wire once every image has been uploaded.

use crate::gradio::FileData;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;

/// Name of the remote operation that turns images into a mesh.
pub const SHAPE_GENERATION_API: &str = "/shape_generation";

/// Parameter names of `/shape_generation`, in the operation's positional order.
pub const PARAMETER_ORDER: [&str; 13] = [
    "caption",
    "image",
    "mv_image_front",
    "mv_image_back",
    "mv_image_left",
    "mv_image_right",
    "steps",
    "guidance_scale",
    "seed",
    "octree_resolution",
    "check_box_rembg",
    "num_chunks",
    "randomize_seed",
];

/// Where an input image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A local file.
    Path(PathBuf),
    /// A remote image fetched before upload.
    Url(String),
    /// In-memory bytes, e.g. from an HTTP upload.
    Bytes { file_name: String, data: Vec<u8> },
}

impl ImageSource {
    /// Interprets a command-line value: `http(s)://` values are URLs, anything
    /// else is a local path.
    #[must_use]
    pub fn from_arg(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    /// Returns the file name sent along with the upload.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.png".to_string()),
            Self::Url(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|base| base.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .unwrap_or("image.png")
                .to_string(),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// Describes the source for logs and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes { file_name, data } => format!("{file_name} ({} bytes)", data.len()),
        }
    }
}

/// The image inputs of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    /// The single-view input image.
    Primary,
    /// Multi-view front image.
    Front,
    /// Multi-view back image.
    Back,
    /// Multi-view left image.
    Left,
    /// Multi-view right image.
    Right,
}

impl ImageSlot {
    /// All slots, in parameter order.
    pub const ALL: [Self; 5] = [
        Self::Primary,
        Self::Front,
        Self::Back,
        Self::Left,
        Self::Right,
    ];

    /// Returns the wire parameter name of this slot.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Primary => "image",
            Self::Front => "mv_image_front",
            Self::Back => "mv_image_back",
            Self::Left => "mv_image_left",
            Self::Right => "mv_image_right",
        }
    }
}

/// A request to generate a shape from a caption and/or images.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGenerationRequest {
    pub caption: Option<String>,
    pub image: Option<ImageSource>,
    pub mv_image_front: Option<ImageSource>,
    pub mv_image_back: Option<ImageSource>,
    pub mv_image_left: Option<ImageSource>,
    pub mv_image_right: Option<ImageSource>,
    /// Diffusion steps.
    pub steps: u32,
    /// Classifier-free guidance scale.
    pub guidance_scale: f64,
    pub seed: u64,
    /// Resolution of the octree used for surface extraction.
    pub octree_resolution: u32,
    /// Remove the image background before generation.
    pub check_box_rembg: bool,
    /// Number of chunks used when decoding the volume.
    pub num_chunks: u32,
    /// Let the server pick a random seed instead of `seed`.
    pub randomize_seed: bool,
}

impl Default for ShapeGenerationRequest {
    fn default() -> Self {
        Self {
            caption: None,
            image: None,
            mv_image_front: None,
            mv_image_back: None,
            mv_image_left: None,
            mv_image_right: None,
            steps: 30,
            guidance_scale: 5.0,
            seed: 1234,
            octree_resolution: 256,
            check_box_rembg: true,
            num_chunks: 8000,
            randomize_seed: true,
        }
    }
}

impl ShapeGenerationRequest {
    /// Creates a request for a single input image with default parameters.
    #[must_use]
    pub fn from_image(image: ImageSource) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    /// Sets the caption.
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Sets the image for a slot.
    #[must_use]
    pub fn with_image(mut self, slot: ImageSlot, image: ImageSource) -> Self {
        *self.slot_mut(slot) = Some(image);
        self
    }

    /// Sets the number of diffusion steps.
    #[must_use]
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the guidance scale.
    #[must_use]
    pub fn with_guidance_scale(mut self, guidance_scale: f64) -> Self {
        self.guidance_scale = guidance_scale;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the octree resolution.
    #[must_use]
    pub fn with_octree_resolution(mut self, octree_resolution: u32) -> Self {
        self.octree_resolution = octree_resolution;
        self
    }

    /// Enables or disables background removal.
    #[must_use]
    pub fn with_background_removal(mut self, enabled: bool) -> Self {
        self.check_box_rembg = enabled;
        self
    }

    /// Sets the chunk count.
    #[must_use]
    pub fn with_num_chunks(mut self, num_chunks: u32) -> Self {
        self.num_chunks = num_chunks;
        self
    }

    /// Enables or disables server-side seed randomization.
    #[must_use]
    pub fn with_randomize_seed(mut self, randomize: bool) -> Self {
        self.randomize_seed = randomize;
        self
    }

    /// Returns the image in a slot.
    #[must_use]
    pub fn image(&self, slot: ImageSlot) -> Option<&ImageSource> {
        match slot {
            ImageSlot::Primary => self.image.as_ref(),
            ImageSlot::Front => self.mv_image_front.as_ref(),
            ImageSlot::Back => self.mv_image_back.as_ref(),
            ImageSlot::Left => self.mv_image_left.as_ref(),
            ImageSlot::Right => self.mv_image_right.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: ImageSlot) -> &mut Option<ImageSource> {
        match slot {
            ImageSlot::Primary => &mut self.image,
            ImageSlot::Front => &mut self.mv_image_front,
            ImageSlot::Back => &mut self.mv_image_back,
            ImageSlot::Left => &mut self.mv_image_left,
            ImageSlot::Right => &mut self.mv_image_right,
        }
    }
}

/// Wire form of a shape generation request.
///
/// Every parameter is always present; unset images serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeArguments {
    pub caption: Option<String>,
    pub image: Option<FileData>,
    pub mv_image_front: Option<FileData>,
    pub mv_image_back: Option<FileData>,
    pub mv_image_left: Option<FileData>,
    pub mv_image_right: Option<FileData>,
    pub steps: u32,
    pub guidance_scale: f64,
    pub seed: u64,
    pub octree_resolution: u32,
    pub check_box_rembg: bool,
    pub num_chunks: u32,
    pub randomize_seed: bool,
}

impl ShapeArguments {
    /// Combines a request with the file payloads of its uploaded images.
    #[must_use]
    pub fn from_request(
        request: &ShapeGenerationRequest,
        mut uploaded: HashMap<ImageSlot, FileData>,
    ) -> Self {
        Self {
            caption: request.caption.clone(),
            image: uploaded.remove(&ImageSlot::Primary),
            mv_image_front: uploaded.remove(&ImageSlot::Front),
            mv_image_back: uploaded.remove(&ImageSlot::Back),
            mv_image_left: uploaded.remove(&ImageSlot::Left),
            mv_image_right: uploaded.remove(&ImageSlot::Right),
            steps: request.steps,
            guidance_scale: request.guidance_scale,
            seed: request.seed,
            octree_resolution: request.octree_resolution,
            check_box_rembg: request.check_box_rembg,
            num_chunks: request.num_chunks,
            randomize_seed: request.randomize_seed,
        }
    }

    /// Returns the arguments as the positional `data` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be serialized.
    pub fn to_positional(&self) -> Result<Vec<JsonValue>, serde_json::Error> {
        let JsonValue::Object(mut fields) = serde_json::to_value(self)? else {
            return Ok(Vec::new());
        };
        Ok(PARAMETER_ORDER
            .iter()
            .map(|name| fields.remove(*name).unwrap_or(JsonValue::Null))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_source_from_arg() {
        assert_eq!(
            ImageSource::from_arg("https://example.com/a/demo.png?x=1").file_name(),
            "demo.png"
        );
        assert_eq!(
            ImageSource::from_arg("assets/demo.png"),
            ImageSource::Path(PathBuf::from("assets/demo.png"))
        );
    }

    fn uploaded_primary() -> HashMap<ImageSlot, FileData> {
        [(
            ImageSlot::Primary,
            FileData::uploaded("/tmp/gradio/x/test.png", "test.png", 10),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn defaults_match_the_reference_call() {
        let request = ShapeGenerationRequest::default();
        assert_eq!(request.steps, 30);
        assert_eq!(request.guidance_scale, 5.0);
        assert_eq!(request.seed, 1234);
        assert_eq!(request.octree_resolution, 256);
        assert!(request.check_box_rembg);
        assert_eq!(request.num_chunks, 8000);
        assert!(request.randomize_seed);
    }

    #[test]
    fn arguments_contain_all_and_only_documented_fields() {
        let request = ShapeGenerationRequest::from_image(ImageSource::Path("test.png".into()));
        let args = ShapeArguments::from_request(&request, uploaded_primary());

        let value = serde_json::to_value(&args).expect("serialize");
        let object = value.as_object().expect("object");

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = PARAMETER_ORDER.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);

        for name in ["caption", "mv_image_front", "mv_image_back", "mv_image_left", "mv_image_right"] {
            assert_eq!(object[name], JsonValue::Null, "{name} should be null");
        }
        assert_eq!(object["image"]["path"], "/tmp/gradio/x/test.png");
    }

    #[test]
    fn positional_data_follows_parameter_order() {
        let request = ShapeGenerationRequest::from_image(ImageSource::Path("test.png".into()))
            .with_steps(1)
            .with_guidance_scale(3.0)
            .with_seed(0)
            .with_octree_resolution(16)
            .with_num_chunks(1000);
        let data = ShapeArguments::from_request(&request, uploaded_primary())
            .to_positional()
            .expect("positional");

        assert_eq!(data.len(), 13);
        assert_eq!(data[0], JsonValue::Null);
        assert_eq!(data[1]["orig_name"], "test.png");
        assert_eq!(&data[2..6], &[JsonValue::Null, JsonValue::Null, JsonValue::Null, JsonValue::Null]);
        assert_eq!(data[6], json!(1));
        assert_eq!(data[7], json!(3.0));
        assert_eq!(data[8], json!(0));
        assert_eq!(data[9], json!(16));
        assert_eq!(data[10], json!(true));
        assert_eq!(data[11], json!(1000));
        assert_eq!(data[12], json!(true));
    }

    #[test]
    fn with_image_fills_the_requested_slot() {
        let request = ShapeGenerationRequest::default()
            .with_image(ImageSlot::Back, ImageSource::Url("https://example.com/back.png".into()));
        assert!(request.image(ImageSlot::Back).is_some());
        assert!(request.image(ImageSlot::Primary).is_none());
    }

    #[test]
    fn image_source_file_names() {
        assert_eq!(ImageSource::Path("/data/in/bus.png".into()).file_name(), "bus.png");
        assert_eq!(
            ImageSource::Url("https://example.com/test_files/bus.png?raw=1".into()).file_name(),
            "bus.png"
        );
        assert_eq!(
            ImageSource::Bytes {
                file_name: "upload.jpg".into(),
                data: vec![1, 2, 3],
            }
            .file_name(),
            "upload.jpg"
        );
    }
}
