use crate::env::ConfigurationKey::{BindAddress, Port};
use crate::env::secret_value;
use crate::proxy::{PROXY_PATH, handle_proxy};
use crate::sign::UrlSigner;
use http_body_util::{Either, Empty};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::spawn;
use tracing::debug;

pub async fn serve() {
    let signer = Arc::new(
        UrlSigner::from_env().expect("missing or empty proxy signing key (PROXY_SIGNING_KEY)"),
    );
    let proxy_path = *PROXY_PATH.deref();
    let port = secret_value(Port)
        .and_then(|it| it.parse::<u16>().ok())
        .unwrap_or(8080);
    let listener = TcpListener::bind((secret_value(BindAddress).unwrap_or("0.0.0.0"), port))
        .await
        .unwrap_or_else(|_| panic!("could not bind to {port}"));
    loop {
        if let Ok((tcp_stream, _)) = listener.accept().await {
            let signer = signer.clone();
            spawn(async move {
                let io = TokioIo::new(tcp_stream);
                let _ = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |request| {
                            let signer = signer.clone();
                            async move {
                                if request.uri().path() == proxy_path {
                                    Ok::<_, Infallible>(handle_proxy(request, &signer).await)
                                } else {
                                    debug!("404 {}", request.uri().path());
                                    Ok::<_, Infallible>(
                                        Response::builder()
                                            .status(StatusCode::NOT_FOUND)
                                            .body(Either::Right(Empty::new()))
                                            .unwrap(),
                                    )
                                }
                            }
                        }),
                    )
                    .await;
            });
        }
    }
}
