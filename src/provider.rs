use std::collections::HashMap;
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::http::{HttpResponse, ResolverConfig, ReqwestTransport, Transport};
use crate::package::{is_absolute_url, validate_package_name, PackageUrlInfo, Source};

/// Body returned by the jspm generator.
///
/// Only `map.imports` is read; everything else in the payload is ignored. Missing
/// objects decode as empty so an absent entry surfaces as [`Error::LookupKeyMissing`].
#[derive(Debug, Default, Deserialize)]
pub struct GeneratorResponse {
    #[serde(default)]
    pub map: GeneratedMap,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeneratedMap {
    #[serde(default)]
    pub imports: HashMap<String, String>,
}

/// Resolves package names against the configured CDN providers.
///
/// The client holds no mutable state and may be shared between threads.
pub struct ProviderClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: ResolverConfig,
}

impl ProviderClient<ReqwestTransport> {
    /// Creates a client that talks to the real providers over HTTPS.
    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config).map_err(|source| Error::Transport {
            url: config.skypack_cdn.clone(),
            source,
        })?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> ProviderClient<T> {
    pub fn new(transport: T, config: ResolverConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `name` with the given provider.
    ///
    /// # Errors
    ///
    /// - [`Error::PackageNotFound`] if the provider answers with a status >= 400.
    /// - [`Error::LookupKeyMissing`] if the jspm generator succeeds without an entry for `name`.
    /// - [`Error::Transport`] for network failures.
    pub fn resolve(&self, name: &str, provider: Source) -> Result<PackageUrlInfo> {
        validate_package_name(name)?;
        let info = match provider {
            Source::Skypack => self.resolve_skypack(name)?,
            Source::Jspm | Source::Jsdelivr | Source::Unpkg => self.resolve_generator(name, provider)?,
        };
        for url in [&info.pin, &info.import] {
            if !is_absolute_url(url) {
                return Err(Error::InvalidResponse {
                    name: name.to_string(),
                    provider,
                    reason: format!("`{url}` is not an absolute URL"),
                });
            }
        }
        tracing::debug!(name, %provider, pin = %info.pin, import = %info.import, "resolved");
        Ok(info)
    }

    fn resolve_skypack(&self, name: &str) -> Result<PackageUrlInfo> {
        let cdn = &self.config.skypack_cdn;
        let url = join_url(cdn, name);
        let response = self.fetch(&url, &[], name, Source::Skypack)?;

        let pin = response.header("x-pinned-url").unwrap_or(name);
        let import = response.header("x-import-url").unwrap_or(name);
        Ok(PackageUrlInfo {
            look_up: name.to_string(),
            pin: join_url(cdn, pin),
            import: join_url(cdn, import),
        })
    }

    fn resolve_generator(&self, name: &str, provider: Source) -> Result<PackageUrlInfo> {
        let install = format!("npm:{name}");
        let query = [
            ("install", install.as_str()),
            ("env", "browser"),
            ("provider", provider.as_str()),
        ];
        let response = self.fetch(&self.config.jspm_generator, &query, name, provider)?;

        let generated: GeneratorResponse =
            serde_json::from_slice(&response.body).map_err(|e| Error::InvalidResponse {
                name: name.to_string(),
                provider,
                reason: e.to_string(),
            })?;
        let url = generated
            .map
            .imports
            .get(name)
            .ok_or_else(|| Error::LookupKeyMissing {
                name: name.to_string(),
                provider,
            })?;
        Ok(PackageUrlInfo {
            look_up: name.to_string(),
            pin: url.clone(),
            import: url.clone(),
        })
    }

    fn fetch(&self, url: &str, query: &[(&str, &str)], name: &str, provider: Source) -> Result<HttpResponse> {
        tracing::debug!(url, ?query, "GET");
        let response = self
            .transport
            .get(url, query)
            .map_err(|source| Error::Transport { url: url.to_string(), source })?;
        if response.status >= 400 {
            return Err(Error::PackageNotFound {
                name: name.to_string(),
                provider,
                status: response.status,
            });
        }
        Ok(response)
    }
}

/// Joins a CDN base URL with a path from a header or a package name.
/// Values that are already absolute URLs are returned as-is.
fn join_url(base: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::error::TransportError;
    use crate::http::SKYPACK_CDN;

    struct StubTransport {
        response: HttpResponse,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StubTransport {
        fn new(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
            Self {
                response: HttpResponse {
                    status,
                    headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                    body: body.as_bytes().to_vec(),
                },
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str, query: &[(&str, &str)]) -> std::result::Result<HttpResponse, TransportError> {
            let query = query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            self.requests.lock().unwrap().push((url.to_string(), query));
            Ok(self.response.clone())
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn get(&self, _url: &str, _query: &[(&str, &str)]) -> std::result::Result<HttpResponse, TransportError> {
            Err("connection refused".into())
        }
    }

    fn client(transport: StubTransport) -> ProviderClient<StubTransport> {
        ProviderClient::new(transport, ResolverConfig::default())
    }

    #[test]
    fn test_skypack_uses_headers_and_falls_back_to_name() {
        let client = client(StubTransport::new(200, &[("x-pinned-url", "/pin/a")], ""));
        let info = client.resolve("lodash", Source::Skypack).unwrap();
        assert_eq!(info.look_up, "lodash");
        assert_eq!(info.pin, format!("{SKYPACK_CDN}/pin/a"));
        assert_eq!(info.import, format!("{SKYPACK_CDN}/lodash"));

        let requests = client.transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, format!("{SKYPACK_CDN}/lodash"));
        assert!(requests[0].1.is_empty());
    }

    #[test]
    fn test_skypack_import_header() {
        let client = client(StubTransport::new(
            200,
            &[("x-pinned-url", "/pin/react@v18.2.0-abc/react.js"), ("x-import-url", "/-/react@v18.2.0-abc/react.js")],
            "",
        ));
        let info = client.resolve("react", Source::Skypack).unwrap();
        assert_eq!(info.pin, format!("{SKYPACK_CDN}/pin/react@v18.2.0-abc/react.js"));
        assert_eq!(info.import, format!("{SKYPACK_CDN}/-/react@v18.2.0-abc/react.js"));
    }

    #[test]
    fn test_skypack_not_found() {
        let client = client(StubTransport::new(404, &[], "Not Found"));
        let err = client.resolve("does-not-exist", Source::Skypack).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { status: 404, provider: Source::Skypack, .. }));
    }

    #[test]
    fn test_generator_query_and_result() {
        let body = r#"{"staticDeps":[],"map":{"imports":{"left-pad":"https://cdn.example/left-pad.js"}}}"#;
        let client = client(StubTransport::new(200, &[], body));
        let info = client.resolve("left-pad", Source::Jsdelivr).unwrap();
        assert_eq!(info.pin, "https://cdn.example/left-pad.js");
        assert_eq!(info.import, "https://cdn.example/left-pad.js");

        let requests = client.transport.requests.lock().unwrap();
        let (url, query) = &requests[0];
        assert_eq!(url, crate::http::JSPM_GENERATOR);
        assert!(query.contains(&("install".to_string(), "npm:left-pad".to_string())));
        assert!(query.contains(&("env".to_string(), "browser".to_string())));
        assert!(query.contains(&("provider".to_string(), "jsdelivr".to_string())));
    }

    #[test]
    fn test_generator_missing_key() {
        let body = r#"{"map":{"imports":{"other":"https://cdn.example/other.js"}}}"#;
        let client = client(StubTransport::new(200, &[], body));
        let err = client.resolve("left-pad", Source::Jspm).unwrap_err();
        assert!(matches!(err, Error::LookupKeyMissing { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_generator_missing_map_is_lookup_failure() {
        let client = client(StubTransport::new(200, &[], "{}"));
        let err = client.resolve("left-pad", Source::Unpkg).unwrap_err();
        assert!(matches!(err, Error::LookupKeyMissing { provider: Source::Unpkg, .. }));
    }

    #[test]
    fn test_generator_server_error_is_not_found() {
        let client = client(StubTransport::new(500, &[], "oops"));
        let err = client.resolve("left-pad", Source::Jspm).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { status: 500, .. }));
    }

    #[test]
    fn test_generator_invalid_body() {
        let client = client(StubTransport::new(200, &[], "<html>"));
        let err = client.resolve("left-pad", Source::Jspm).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[test]
    fn test_generator_relative_url_rejected() {
        let body = r#"{"map":{"imports":{"left-pad":"./left-pad.js"}}}"#;
        let client = client(StubTransport::new(200, &[], body));
        let err = client.resolve("left-pad", Source::Jspm).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[test]
    fn test_transport_failure_propagates() {
        let client = ProviderClient::new(FailingTransport, ResolverConfig::default());
        let err = client.resolve("react", Source::Skypack).unwrap_err();
        match err {
            Error::Transport { url, source } => {
                assert_eq!(url, format!("{SKYPACK_CDN}/react"));
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_url_as_name() {
        let client = client(StubTransport::new(200, &[], ""));
        let err = client.resolve("https://cdn.example/x.js", Source::Skypack).unwrap_err();
        assert!(matches!(err, Error::InvalidPackageName(_)));
        assert!(client.transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://cdn.skypack.dev/", "/pin/a"), "https://cdn.skypack.dev/pin/a");
        assert_eq!(join_url("https://cdn.skypack.dev", "@babel/core"), "https://cdn.skypack.dev/@babel/core");
        assert_eq!(join_url("https://cdn.skypack.dev", "https://other.example/a.js"), "https://other.example/a.js");
    }
}
