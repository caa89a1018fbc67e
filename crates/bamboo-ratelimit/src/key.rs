//! Context key helpers.

use std::net::IpAddr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha1::{Digest, Sha1};

/// The part of a context before the first `/`.
///
/// Limits are registered per base context, so `"login"` and
/// `"login/<hashed-ip>"` share one limit but keep separate counters.
///
/// ```
/// use bamboo_ratelimit::base_context;
///
/// assert_eq!(base_context("login/abc"), "login");
/// assert_eq!(base_context("login"), "login");
/// ```
#[must_use]
pub fn base_context(context: &str) -> &str {
    context.split('/').next().unwrap_or(context)
}

/// Hashes an address into a short, URL-safe token.
#[must_use]
pub fn hash_ip(ip: &IpAddr) -> String {
    URL_SAFE_NO_PAD.encode(Sha1::digest(ip.to_string().as_bytes()))
}

/// Builds the per-address counter key for `context`.
#[must_use]
pub fn ip_context(context: &str, ip: &IpAddr) -> String {
    format!("{context}/{}", hash_ip(ip))
}
