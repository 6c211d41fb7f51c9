//! Candidate extraction: decides whether one observed request URL is
//! plausibly the media asset of the post being resolved.
//!
//! The decision is a pure function of the URL, the post's declared kind and
//! the registry state at the time of the call.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;
use url::Url;

use crate::registry::DedupRegistry;
use crate::types::{ContentHint, ObservedRequest, PostKind};

/// URL fragments that mark profile pictures and fixed-size thumbnails.
pub const THUMBNAIL_MARKERS: &[&str] = &["s150x150", "/profile_pic"];

/// Query parameter carrying base64 JSON delivery metadata on video requests.
pub const DELIVERY_METADATA_PARAM: &str = "efg";

/// Baseline encodes are inferior, except this one.
const ACCEPTED_BASELINE: &str = "baseline_1";

// Browsers emit `efg` with and without padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a request was not promoted to a candidate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("not a media asset")]
    NotMedia,
    #[error("thumbnail or profile picture")]
    Thumbnail,
    #[error("{found:?} asset does not match a {expected} post")]
    KindMismatch {
        expected: PostKind,
        found: ContentHint,
    },
    #[error("no signature")]
    NoSignature,
    #[error("delivery metadata undecodable: {0}")]
    MetadataUndecodable(String),
    #[error("inferior encode {0}")]
    InferiorEncode(String),
    #[error("already claimed")]
    AlreadyClaimed,
}

/// Decoded `efg` payload. Only the fields the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeliveryMetadata {
    #[serde(default, deserialize_with = "string_or_number")]
    pub xpv_asset_id: Option<String>,
    #[serde(default)]
    pub vencode_tag: Option<String>,
}

fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Final path segment of a URL, e.g. `469088879_..._n.jpg`.
pub fn filename_signature(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    signature_of(&parsed)
}

fn signature_of(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// What the URL path says about the asset type.
pub fn content_hint(url: &Url) -> Option<ContentHint> {
    let last = url.path_segments()?.next_back()?.to_ascii_lowercase();
    if last.ends_with(".mp4") {
        Some(ContentHint::Video)
    } else if last.ends_with(".jpg") {
        Some(ContentHint::Image)
    } else if last.ends_with(".webp") {
        Some(ContentHint::Webp)
    } else {
        None
    }
}

/// Whether a URL is a profile picture or a fixed small thumbnail.
pub fn is_thumbnail(url: &str) -> bool {
    THUMBNAIL_MARKERS.iter().any(|m| url.contains(m))
}

/// Decode the `efg` delivery metadata. `Ok(None)` when the parameter is absent.
pub fn delivery_metadata(url: &Url) -> Result<Option<DeliveryMetadata>, String> {
    let Some(raw) = url
        .query_pairs()
        .find(|(k, _)| k == DELIVERY_METADATA_PARAM)
        .map(|(_, v)| v.into_owned())
    else {
        return Ok(None);
    };

    // Form decoding turns an unescaped '+' into a space.
    let raw = raw.trim().replace(' ', "+");
    let bytes = LENIENT_STANDARD
        .decode(&raw)
        .or_else(|_| LENIENT_URL_SAFE.decode(&raw))
        .map_err(|e| format!("base64: {e}"))?;
    let meta: DeliveryMetadata =
        serde_json::from_slice(&bytes).map_err(|e| format!("json: {e}"))?;
    Ok(Some(meta))
}

/// Whether an encoding tag names a known-inferior baseline encode.
pub fn is_inferior_encode(tag: &str) -> bool {
    tag.contains("baseline") && !tag.contains(ACCEPTED_BASELINE)
}

fn kind_accepts(kind: PostKind, hint: ContentHint) -> bool {
    match kind {
        PostKind::Image => hint.is_image(),
        PostKind::Reel => hint.is_video(),
        PostKind::Carousel => true,
    }
}

/// Run the eligibility gate over one observed request URL.
pub fn classify(
    url: &str,
    kind: PostKind,
    registry: &DedupRegistry,
) -> Result<ObservedRequest, Rejection> {
    let parsed = Url::parse(url).map_err(|_| Rejection::NotMedia)?;
    let hint = content_hint(&parsed).ok_or(Rejection::NotMedia)?;

    if is_thumbnail(url) {
        return Err(Rejection::Thumbnail);
    }
    if !kind_accepts(kind, hint) {
        return Err(Rejection::KindMismatch {
            expected: kind,
            found: hint,
        });
    }

    let signature = signature_of(&parsed).ok_or(Rejection::NoSignature)?;

    let (asset_id, variant_tag) = if hint.is_video() {
        let meta = match delivery_metadata(&parsed) {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                return Err(Rejection::MetadataUndecodable("missing efg".to_string()));
            }
            Err(e) => {
                tracing::warn!("Failed to decode delivery metadata for {url}: {e}");
                return Err(Rejection::MetadataUndecodable(e));
            }
        };
        if let Some(tag) = meta.vencode_tag.as_deref() {
            if is_inferior_encode(tag) {
                return Err(Rejection::InferiorEncode(tag.to_string()));
            }
        }
        (meta.xpv_asset_id, meta.vencode_tag)
    } else {
        (None, None)
    };

    let req = ObservedRequest {
        url: url.to_string(),
        content_hint: hint,
        signature,
        asset_id,
        variant_tag,
    };

    if registry.is_claimed(&req) {
        return Err(Rejection::AlreadyClaimed);
    }
    Ok(req)
}
