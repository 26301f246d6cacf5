use crate::env::ConfigurationKey::{ProxyPathPrefix, UpstreamTimeoutSeconds};
use crate::env::secret_value;
use crate::headers::{ACCEPT_IMAGES, CACHE_CONTROL_PROXIED, GET, IMAGE_JPEG, USER_AGENT_VALUE};
use crate::hosts::is_allowed_host;
use crate::sign::{SignedToken, UrlSigner};
use futures::TryStreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Either, Empty, StreamBody};
use hyper::body::{Bytes, Frame, Incoming};
use hyper::header::{ACCEPT, ALLOW, CACHE_CONTROL, CONTENT_TYPE, ETAG, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

pub static PROXY_PATH: LazyLock<&'static str> =
    LazyLock::new(|| secret_value(ProxyPathPrefix).unwrap_or("/proxy"));

static CLIENT: LazyLock<Client> = LazyLock::new(|| {
    let timeout = secret_value(UpstreamTimeoutSeconds)
        .and_then(|it| it.parse::<u64>().ok())
        .unwrap_or(10);
    // redirects are never followed: the target was allow-listed, its
    // redirect destination was not
    Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build upstream http client")
});

/// Relayed upstream bytes on the left, empty rejection bodies on the right.
pub type ProxyBody = Either<BoxBody<Bytes, reqwest::Error>, Empty<Bytes>>;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Rejection {
    MissingParameter,
    BadSignature,
    BadEncoding,
    HostNotAllowed,
    UpstreamError,
}

impl Rejection {
    /// Signature and encoding failures both collapse to 400 so that the
    /// response does not reveal which check failed.
    fn status(self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::BadSignature | Self::BadEncoding => {
                StatusCode::BAD_REQUEST
            }
            Self::HostNotAllowed => StatusCode::FORBIDDEN,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

/// The local path to embed in place of a remote image url.
pub fn signed_proxy_path(signer: &UrlSigner, raw_url: &str) -> String {
    let SignedToken { u, sig } = signer.sign(raw_url);
    format!("{}?u={u}&sig={sig}", *PROXY_PATH)
}

pub async fn handle_proxy(request: Request<Incoming>, signer: &UrlSigner) -> Response<ProxyBody> {
    let path = *PROXY_PATH;
    if request.method() != Method::GET {
        let mut response = Response::builder();
        let headers = response.headers_mut().unwrap();
        headers.insert(ALLOW, GET);
        debug!("405 {path}");
        return response
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Either::Right(Empty::new()))
            .unwrap();
    }
    match authorize(signer, request.uri().query()) {
        Ok(url) => match relay(url).await {
            Ok(response) => {
                debug!("{} {path}", response.status().as_u16());
                response
            }
            Err(rejection) => rejected(rejection, path),
        },
        Err(rejection) => rejected(rejection, path),
    }
}

fn rejected(rejection: Rejection, path: &str) -> Response<ProxyBody> {
    let status = rejection.status();
    debug!("{} {path} {rejection:?}", status.as_u16());
    Response::builder()
        .status(status)
        .body(Either::Right(Empty::new()))
        .unwrap()
}

/// Authenticates the query string and recovers the upstream url.
/// Performs no I/O: the host check happens before any fetch is attempted.
fn authorize(signer: &UrlSigner, query: Option<&str>) -> Result<Url, Rejection> {
    let query = query.ok_or(Rejection::MissingParameter)?;
    let mut u = None;
    let mut sig = None;
    for pair in query.split('&') {
        let mut iter = pair.splitn(2, '=');
        match iter.next() {
            Some("u") => u = iter.next(),
            Some("sig") => sig = iter.next(),
            _ => {}
        }
    }
    let u = u
        .filter(|it| !it.is_empty())
        .ok_or(Rejection::MissingParameter)?;
    let sig = sig
        .filter(|it| !it.is_empty())
        .ok_or(Rejection::MissingParameter)?;
    if !signer.verify(u, sig) {
        return Err(Rejection::BadSignature);
    }
    let raw_url = signer.decode(u).ok_or(Rejection::BadEncoding)?;
    let url = Url::parse(&raw_url).map_err(|_| Rejection::BadEncoding)?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(Rejection::BadEncoding),
    }
    let host = url.host_str().ok_or(Rejection::BadEncoding)?;
    if !is_allowed_host(host) {
        warn!("proxy target not allow-listed: {host}");
        return Err(Rejection::HostNotAllowed);
    }
    Ok(url)
}

/// Fetches the upstream image and relays it as a stream.
///
/// The upstream status is forwarded verbatim, including non-2xx codes;
/// only connection-level failures collapse to a generic 502.
async fn relay(url: Url) -> Result<Response<ProxyBody>, Rejection> {
    let host = url.host_str().unwrap_or_default();
    // Url::port() is None for the scheme's default port
    let origin = match url.port() {
        Some(port) => format!("{}://{host}:{port}/", url.scheme()),
        None => format!("{}://{host}/", url.scheme()),
    };
    let upstream = CLIENT
        .get(url)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .header(REFERER, origin)
        .header(ACCEPT, ACCEPT_IMAGES)
        .send()
        .await
        .map_err(|err| {
            warn!("upstream fetch failed: {err}");
            Rejection::UpstreamError
        })?;
    let mut response = Response::builder().status(upstream.status());
    let headers = response.headers_mut().unwrap();
    headers.insert(
        CONTENT_TYPE,
        upstream
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or(IMAGE_JPEG),
    );
    headers.insert(CACHE_CONTROL, CACHE_CONTROL_PROXIED);
    if let Some(etag) = upstream.headers().get(ETAG) {
        headers.insert(ETAG, etag.clone());
    }
    let body = StreamBody::new(upstream.bytes_stream().map_ok(Frame::data));
    Ok(response.body(Either::Left(body.boxed())).unwrap())
}
