use crate::models::{GenerationResponse, ProviderResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImageListPayload {
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct SingleImagePayload {
    image: ImageRef,
}

/// The result shapes providers are known to return, in match precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    ImageList(Vec<String>),
    SingleImage(String),
    UrlList(Vec<String>),
    Url(String),
    Unrecognized,
}

impl ResultShape {
    /// First matching variant wins. The image-list check has to run before the
    /// bare-list check so that list entries are never misread.
    pub fn classify(value: &Value) -> Self {
        if let Some(urls) = image_list(value) {
            return ResultShape::ImageList(urls);
        }
        if let Some(url) = single_image(value) {
            return ResultShape::SingleImage(url);
        }
        if let Some(urls) = url_list(value) {
            return ResultShape::UrlList(urls);
        }
        match value {
            Value::String(url) if is_usable(url) => ResultShape::Url(url.clone()),
            _ => ResultShape::Unrecognized,
        }
    }

    pub fn into_urls(self) -> Vec<String> {
        match self {
            ResultShape::ImageList(urls) | ResultShape::UrlList(urls) => urls,
            ResultShape::SingleImage(url) | ResultShape::Url(url) => vec![url],
            ResultShape::Unrecognized => Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResultShape::ImageList(_) => "image list",
            ResultShape::SingleImage(_) => "single image",
            ResultShape::UrlList(_) => "URL list",
            ResultShape::Url(_) => "URL",
            ResultShape::Unrecognized => "unrecognized",
        }
    }
}

fn is_usable(url: &str) -> bool {
    !url.trim().is_empty()
}

fn image_list(value: &Value) -> Option<Vec<String>> {
    if !value.is_object() {
        return None;
    }
    let payload = ImageListPayload::deserialize(value).ok()?;
    let urls: Vec<String> = payload.images.into_iter().map(|image| image.url).collect();
    (!urls.is_empty() && urls.iter().all(|url| is_usable(url))).then_some(urls)
}

fn single_image(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    let payload = SingleImagePayload::deserialize(value).ok()?;
    is_usable(&payload.image.url).then_some(payload.image.url)
}

fn url_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if !items.first()?.is_string() {
        return None;
    }
    let urls: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|url| is_usable(url))
        .map(str::to_string)
        .collect();
    (!urls.is_empty()).then_some(urls)
}

/// Reduces a provider result to the canonical response, or `None` when it
/// carries no usable image.
pub fn normalize(result: &ProviderResult) -> Option<GenerationResponse> {
    let shape = ResultShape::classify(result.as_value());
    log::debug!("Provider result recognized as {}", shape.label());

    let urls = shape.into_urls();
    (!urls.is_empty()).then(|| GenerationResponse::new(urls))
}
