use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::sync::LazyLock;
use tracing::info;

static FILE: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::<&'static str, &'static str>::new();
    if let Ok(content) = File::open("./.env").and_then(|ref mut it| {
        let mut content = String::new();
        it.read_to_string(&mut content).map(|_| content)
    }) {
        content
            .lines()
            .filter(|&line| !line.trim_start().starts_with('#'))
            .for_each(|line| {
                if let Some((key, value)) = line.split_once('=') {
                    info!("{} loaded from environment file", key.trim());
                    map.insert(
                        key.trim().to_string().leak(),
                        value.trim().to_string().leak(),
                    );
                }
            })
    }
    map
});

static ENV: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::<&'static str, &'static str>::new();
    std::env::vars().for_each(|(key, value)| {
        info!("{key} loaded from environment variable");
        map.insert(
            key.trim().to_string().leak(),
            value.trim().to_string().leak(),
        );
    });
    map
});

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ConfigurationKey {
    BindAddress,
    Port,
    ProxySigningKey,
    ProxyPathPrefix,
    UpstreamTimeoutSeconds,
}

impl ConfigurationKey {
    fn name(&self) -> &'static str {
        match self {
            Self::BindAddress => "BIND_ADDRESS",
            Self::Port => "PORT",
            Self::ProxySigningKey => "PROXY_SIGNING_KEY",
            Self::ProxyPathPrefix => "PROXY_PATH_PREFIX",
            Self::UpstreamTimeoutSeconds => "UPSTREAM_TIMEOUT_SECONDS",
        }
    }
}

pub fn secret_value(key: ConfigurationKey) -> Option<&'static str> {
    match ENV.get(key.name()).or_else(|| FILE.get(key.name())) {
        Some(value) => Some(*value),
        None => None,
    }
}
