use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// A CDN or package-metadata service able to turn a package name into URLs.
///
/// `Jsdelivr` and `Unpkg` are served through the jspm generator, which accepts them as
/// its `provider` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Skypack,
    #[default]
    Jspm,
    Jsdelivr,
    Unpkg,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Skypack, Source::Jspm, Source::Jsdelivr, Source::Unpkg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Skypack => "skypack",
            Source::Jspm => "jspm",
            Source::Jsdelivr => "jsdelivr",
            Source::Unpkg => "unpkg",
        }
    }

    /// Parses a provider name, falling back to [`Source::Jspm`] with a warning
    /// when the value is not recognized.
    pub fn parse_lenient(value: &str) -> Source {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(provider = value, "unknown provider, using jspm");
            Source::Jspm
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == lower)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// The resolved URLs of one package.
///
/// `pin` is the canonical (usually versioned) URL; `import` is what goes into the import map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageUrlInfo {
    /// The name that was requested.
    pub look_up: String,
    pub pin: String,
    pub import: String,
}

impl PackageUrlInfo {
    /// Returns the `major.minor.patch` version embedded in the pin URL, e.g. `react@18.2.0`
    /// or `lodash@v4.17.21-<hash>`. Pre-release and build suffixes are not kept.
    pub fn version(&self) -> Option<Version> {
        static VERSION_RE: OnceLock<Regex> = OnceLock::new();
        let re = VERSION_RE.get_or_init(|| {
            Regex::new(r"@v?(\d+\.\d+\.\d+)")
                .expect("version pattern is valid")
        });
        re.captures_iter(&self.pin)
            .filter_map(|caps| Version::parse(&caps[1]).ok())
            .last()
    }
}

/// Checks that `name` is a bare package name usable as a lock key and import specifier.
///
/// `?`, `#` and whitespace are rejected since they would change the request URL.
pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains("://")
        || name.starts_with('/')
        || name.chars().any(|c| c == '?' || c == '#' || c.is_whitespace())
    {
        return Err(Error::InvalidPackageName(name.to_string()));
    }
    Ok(())
}

/// Checks that `value` parses as an absolute URL.
pub(crate) fn is_absolute_url(value: &str) -> bool {
    url::Url::parse(value).map(|url| url.has_host()).unwrap_or(false)
}
