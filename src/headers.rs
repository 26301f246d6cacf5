use hyper::header::HeaderValue;

pub const GET: HeaderValue = HeaderValue::from_static("GET");

/// Fallback when the upstream does not announce a content type.
pub const IMAGE_JPEG: HeaderValue = HeaderValue::from_static("image/jpeg");

pub const ACCEPT_IMAGES: HeaderValue = HeaderValue::from_static("image/*");

/// Proxied images are immutable per url, so edges are allowed to keep serving
/// them long after the short fresh window.
pub const CACHE_CONTROL_PROXIED: HeaderValue =
    HeaderValue::from_static("public, max-age=300, s-maxage=86400, stale-while-revalidate=604800");

pub const USER_AGENT_VALUE: HeaderValue =
    HeaderValue::from_static(concat!("image_proxy/", env!("CARGO_PKG_VERSION")));
