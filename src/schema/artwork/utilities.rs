//! Presentation rules for artwork dimensions and video embeds

use serde_json::Value;
use url::Url;

/// Inches for `in`, centimetres for `cm`; roughly fifty feet either way.
const MAX_HANGABLE_IN: f64 = 600.0;
const MAX_HANGABLE_CM: f64 = 1524.0;

/// Physical dimensions as Gravity reports them (numbers or numeric strings)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub diameter: Option<f64>,
}

/// Leading number of a JSON value, like `"20 in"` → `20.0`
pub fn parse_dimension(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim_start();
            let end = s
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
                .map_or(s.len(), |(i, _)| i);
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn is_dimensional(value: Option<f64>) -> bool {
    value.is_some_and(|v| v > 0.0)
}

fn is_tiny_dimensional(value: Option<f64>) -> bool {
    value.is_some_and(|v| v > 3.0)
}

/// Width and height, no diameter, and at most a few units deep
pub fn is_two_dimensional(dimensions: &Dimensions) -> bool {
    is_dimensional(dimensions.width)
        && is_dimensional(dimensions.height)
        && !is_dimensional(dimensions.diameter)
        && !is_tiny_dimensional(dimensions.depth)
}

pub fn is_too_big(dimensions: &Dimensions, metric: Option<&str>) -> bool {
    let limit = match metric {
        Some("in") => MAX_HANGABLE_IN,
        Some("cm") => MAX_HANGABLE_CM,
        _ => return false,
    };
    dimensions.width.is_some_and(|w| w > limit) || dimensions.height.is_some_and(|h| h > limit)
}

pub fn is_hangable(dimensions: &Dimensions, metric: Option<&str>) -> bool {
    is_two_dimensional(dimensions) && !is_too_big(dimensions, metric)
}

pub fn is_embedded_video(website: Option<&str>, category: Option<&str>) -> bool {
    let is_video_host = website.is_some_and(|w| w.contains("vimeo") || w.contains("youtu"));
    is_video_host && category.is_some_and(|c| c.contains("Video"))
}

/// iframe markup for a YouTube or Vimeo link
pub fn embed(website: &str, width: &str, height: &str, autoplay: bool) -> Option<String> {
    let url = Url::parse(website).ok()?;
    let id = website.rsplit('/').next()?;
    let autoplay = u8::from(autoplay);

    let src = match url.host_str()? {
        "youtu.be" | "youtube.com" => format!(
            "https://www.youtube.com/embed/{id}?rel=0&amp;showinfo=0&amp;autoplay={autoplay}"
        ),
        "vimeo.com" => {
            format!("//player.vimeo.com/video/{id}?color=ffffff&amp;autoplay={autoplay}")
        }
        _ => return None,
    };

    Some(format!(
        "<iframe width='{width}' height='{height}' src='{src}' frameborder='0' allowfullscreen></iframe>"
    ))
}
