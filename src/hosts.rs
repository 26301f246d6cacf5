/// Hosts the proxy may fetch from on a client's behalf.
///
/// Membership is exact and case-sensitive, with no wildcard or suffix
/// matching: this list gates outbound requests built from attacker-controlled
/// input, so it is kept narrower than whatever the rendering layer is allowed
/// to display directly. Changes go through source review.
pub const ALLOWED_HOSTS: &[&str] = &[
    "uploads.mangadex.org",
    "mangadex.org",
    "cdn.mangadex.org",
];

pub fn is_allowed_host(host: &str) -> bool {
    ALLOWED_HOSTS.contains(&host)
}
