//! Package freshness checks against a Python package index
//!
//! Fetches `<index>/<package>/json`, turns the release list into semantic
//! versions and compares it with an installed version.

use crate::{
    error::{Result, ToolboxError},
    utils::log_name::component_logger,
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PYPI_URL: &str = "https://pypi.org/pypi/";
const TEST_PYPI_URL: &str = "https://test.pypi.org/pypi/";
const USER_AGENT: &str = concat!("handy-toolbox/", env!("CARGO_PKG_VERSION"));

static PYTHON_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^(?P<release>\d+(?:\.\d+)*)
        (?:[._-]?(?P<pre_kind>alpha|beta|preview|pre|rc|a|b|c)[._-]?(?P<pre_num>\d*))?
        (?:[._-]?(?P<post_kind>post|rev|r)[._-]?(?P<post_num>\d*))?
        (?:[._-]?dev[._-]?(?P<dev_num>\d*))?
        (?:\+(?P<local>[a-z0-9._-]+))?$",
    )
    .expect("static regex is valid")
});

/// Where package metadata is looked up
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PackageIndex {
    #[default]
    PyPi,
    TestPyPi,
    /// Any index exposing the same JSON API, e.g. `https://mirror.local/pypi/`
    Custom(String),
}

impl PackageIndex {
    pub fn base_url(&self) -> &str {
        match self {
            Self::PyPi => PYPI_URL,
            Self::TestPyPi => TEST_PYPI_URL,
            Self::Custom(url) => url,
        }
    }

    /// Human readable index name used in errors and logs
    pub fn name(&self) -> &str {
        match self {
            Self::PyPi => "PyPI",
            Self::TestPyPi => "TestPyPI",
            Self::Custom(url) => url,
        }
    }

    /// JSON metadata URL for `package`
    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}/json", self.base_url().trim_end_matches('/'), package)
    }

    /// JSON metadata URL for one release of `package`
    pub fn version_url(&self, package: &str, version: &str) -> String {
        format!(
            "{}/{}/{}/json",
            self.base_url().trim_end_matches('/'),
            package,
            version
        )
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageIndex {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        match value.to_ascii_lowercase().as_str() {
            "pypi" => Ok(Self::PyPi),
            "testpypi" | "test-pypi" | "test_pypi" => Ok(Self::TestPyPi),
            lower if lower.starts_with("http://") || lower.starts_with("https://") => {
                Ok(Self::Custom(value.to_string()))
            }
            _ => Err(ToolboxError::config(format!(
                "Unknown package index '{value}' (expected pypi, testpypi or an http(s) URL)"
            ))),
        }
    }
}

/// Options for [`PypiClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PypiConfig {
    pub index: PackageIndex,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Let pre-releases count as the latest version
    pub include_pre_releases: bool,
    /// Retry on TestPyPI when PyPI does not know the package
    pub fallback_to_test_pypi: bool,
}

impl Default for PypiConfig {
    fn default() -> Self {
        Self {
            index: PackageIndex::default(),
            timeout_secs: 10,
            include_pre_releases: false,
            fallback_to_test_pypi: true,
        }
    }
}

impl PypiConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ToolboxError::config("Index timeout must be at least one second"));
        }
        if let PackageIndex::Custom(url) = &self.index {
            let lower = url.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(ToolboxError::config(format!(
                    "Custom index must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }
}

/// Parse a Python-style version string into a semantic version.
///
/// Missing components are zero filled, pre-release tags become semver
/// pre-release identifiers (`1.0rc1` -> `1.0.0-rc.1`, `2.0.0.dev3` ->
/// `2.0.0-dev.3`). Post releases, release segments past the third and
/// local labels are kept as build metadata.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let text = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let caps = PYTHON_VERSION
        .captures(text)
        .ok_or_else(|| ToolboxError::invalid_version(raw))?;

    let mut release = Vec::new();
    for part in caps["release"].split('.') {
        release.push(
            part.parse::<u64>()
                .map_err(|_| ToolboxError::invalid_version(raw))?,
        );
    }
    let component = |i: usize| release.get(i).copied().unwrap_or(0);

    let number = |name: &str| -> Result<u64> {
        match caps.name(name).map(|m| m.as_str()) {
            None | Some("") => Ok(0),
            Some(digits) => digits
                .parse()
                .map_err(|_| ToolboxError::invalid_version(raw)),
        }
    };

    let mut pre = Vec::new();
    if let Some(kind) = caps.name("pre_kind") {
        let label = match kind.as_str().to_ascii_lowercase().as_str() {
            "a" | "alpha" => "alpha",
            "b" | "beta" => "beta",
            _ => "rc",
        };
        pre.push(format!("{label}.{}", number("pre_num")?));
    }
    // the dev group matches an empty string when the tag has no number
    if caps.name("dev_num").is_some() {
        pre.push(format!("dev.{}", number("dev_num")?));
    }

    let mut build = Vec::new();
    if caps.name("post_kind").is_some() {
        build.push(format!("post.{}", number("post_num")?));
    }
    if release.len() > 3 {
        let extra: Vec<String> = release[3..].iter().map(u64::to_string).collect();
        build.push(format!("r.{}", extra.join(".")));
    }
    if let Some(local) = caps.name("local") {
        build.push(local.as_str().replace(['_', '-'], "."));
    }

    let mut version = Version::new(component(0), component(1), component(2));
    if !pre.is_empty() {
        version.pre =
            Prerelease::new(&pre.join(".")).map_err(|_| ToolboxError::invalid_version(raw))?;
    }
    if !build.is_empty() {
        version.build =
            BuildMetadata::new(&build.join(".")).map_err(|_| ToolboxError::invalid_version(raw))?;
    }
    Ok(version)
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    info: IndexInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct IndexInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    yanked: bool,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    info: VersionInfo,
    #[serde(default)]
    urls: Vec<DistributionFile>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    requires_python: Option<String>,
    #[serde(default)]
    yanked: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DistributionFile {
    filename: String,
}

/// Narrows the list returned by [`ReleaseInfo::versions_filtered`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionFilter {
    pub exclude_pre_releases: bool,
    pub excluded_versions: Vec<Version>,
    /// Keep only versions strictly older than this one
    pub before_version: Option<Version>,
    /// Keep only versions strictly newer than this one
    pub after_version: Option<Version>,
}

impl VersionFilter {
    pub fn matches(&self, version: &Version) -> bool {
        if self.exclude_pre_releases && !version.pre.is_empty() {
            return false;
        }
        if self.excluded_versions.contains(version) {
            return false;
        }
        if self.before_version.as_ref().is_some_and(|before| version >= before) {
            return false;
        }
        !self.after_version.as_ref().is_some_and(|after| version <= after)
    }
}

/// Metadata of a single published release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDetails {
    pub package: String,
    pub version: Version,
    pub summary: Option<String>,
    pub requires_python: Option<String>,
    pub yanked: bool,
    /// Distribution file names, sdists and wheels alike
    pub files: Vec<String>,
}

impl VersionDetails {
    /// Decode a per-release JSON payload
    pub fn from_json(package: &str, index: &PackageIndex, version: &str, body: &str) -> Result<Self> {
        let url = index.version_url(package, version);
        let response: VersionResponse = serde_json::from_str(body)
            .map_err(|e| ToolboxError::invalid_response(&url, e.to_string()))?;

        let non_empty = |text: Option<String>| text.filter(|t| !t.trim().is_empty());

        Ok(Self {
            package: package.to_string(),
            version: parse_version(&response.info.version)?,
            summary: non_empty(response.info.summary),
            requires_python: non_empty(response.info.requires_python),
            yanked: response.info.yanked.unwrap_or(false),
            files: response.urls.into_iter().map(|file| file.filename).collect(),
        })
    }
}

/// Release metadata for one package, fetched once
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    package: String,
    index: PackageIndex,
    current: Version,
    versions: Vec<Version>,
}

impl ReleaseInfo {
    /// Decode an index JSON payload.
    ///
    /// Release keys that are not versions and releases whose files were all
    /// yanked are left out of [`ReleaseInfo::all_versions`].
    pub fn from_json(package: &str, index: PackageIndex, body: &str) -> Result<Self> {
        let url = index.package_url(package);
        let response: IndexResponse = serde_json::from_str(body)
            .map_err(|e| ToolboxError::invalid_response(&url, e.to_string()))?;

        let current = parse_version(&response.info.version)?;

        let mut versions: Vec<Version> = response
            .releases
            .into_iter()
            .filter(|(_, files)| files.is_empty() || files.iter().any(|f| !f.yanked))
            .filter_map(|(raw, _)| match parse_version(&raw) {
                Ok(version) => Some(version),
                Err(_) => {
                    debug!("Ignoring unparseable release '{}' of {}", raw, package);
                    None
                }
            })
            .collect();
        versions.sort();
        versions.dedup();

        Ok(Self {
            package: package.to_string(),
            index,
            current,
            versions,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }

    /// The version the index advertises as current
    pub fn latest_stable(&self) -> &Version {
        &self.current
    }

    /// Newest pre-release, if the package has any
    pub fn latest_pre_release(&self) -> Option<&Version> {
        self.versions.iter().rev().find(|v| !v.pre.is_empty())
    }

    /// Every published version, oldest first
    pub fn all_versions(&self) -> &[Version] {
        &self.versions
    }

    /// Published versions without pre-releases, oldest first
    pub fn stable_versions(&self) -> Vec<&Version> {
        self.versions.iter().filter(|v| v.pre.is_empty()).collect()
    }

    /// Published versions accepted by `filter`, oldest first
    pub fn versions_filtered(&self, filter: &VersionFilter) -> Vec<&Version> {
        self.versions.iter().filter(|v| filter.matches(v)).collect()
    }

    /// Latest version under the given pre-release policy
    pub fn latest(&self, include_pre_releases: bool) -> &Version {
        match self.latest_pre_release() {
            Some(pre) if include_pre_releases && pre > &self.current => pre,
            _ => &self.current,
        }
    }

    /// Compare an installed version with this package's latest version
    pub fn freshness(&self, installed: Version, include_pre_releases: bool) -> Freshness {
        Freshness::new(installed, self.latest(include_pre_releases).clone())
    }
}

/// Outcome of comparing an installed version with the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Freshness {
    pub up_to_date: bool,
    pub installed: Version,
    pub latest: Version,
    pub update_available: bool,
}

impl Freshness {
    pub fn new(installed: Version, latest: Version) -> Self {
        Self {
            up_to_date: installed >= latest,
            update_available: latest > installed,
            installed,
            latest,
        }
    }

    /// Installed build is ahead of the index, typically a development build
    pub fn installed_is_newer(&self) -> bool {
        self.installed > self.latest
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.update_available {
            write!(f, "update available: {} -> {}", self.installed, self.latest)
        } else if self.installed_is_newer() {
            write!(
                f,
                "{} is newer than the latest release {}",
                self.installed, self.latest
            )
        } else {
            write!(f, "{} is up to date", self.installed)
        }
    }
}

/// Blocking client for a package index JSON API
#[derive(Debug, Clone)]
pub struct PypiClient {
    http: reqwest::blocking::Client,
    config: PypiConfig,
}

impl PypiClient {
    /// Create a client from validated configuration
    pub fn new(config: PypiConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolboxError::network(config.index.base_url(), e))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PypiConfig {
        &self.config
    }

    /// Fetch release metadata from the configured index
    pub fn fetch(&self, package: &str) -> Result<ReleaseInfo> {
        self.fetch_from(&self.config.index, package)
    }

    /// Fetch metadata of one release from the configured index
    #[instrument(skip(self))]
    pub fn fetch_version(&self, package: &str, version: &str) -> Result<VersionDetails> {
        let log = component_logger("pypi.fetch_version", false)?;
        let _span = log.span().entered();

        let package = package_name(package)?;
        let version = version.trim();
        parse_version(version)?;

        let index = &self.config.index;
        let url = index.version_url(package, version);
        let body = self.get_text(&url, index, &format!("{package} {version}"))?;

        VersionDetails::from_json(package, index, version, &body)
    }

    #[instrument(skip(self))]
    fn fetch_from(&self, index: &PackageIndex, package: &str) -> Result<ReleaseInfo> {
        let package = package_name(package)?;
        let url = index.package_url(package);
        let body = self.get_text(&url, index, package)?;

        ReleaseInfo::from_json(package, index.clone(), &body)
    }

    /// GET `url`, mapping 404 to `PackageNotFound` for `what`
    fn get_text(&self, url: &str, index: &PackageIndex, what: &str) -> Result<String> {
        debug!("Querying {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| ToolboxError::network(url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ToolboxError::package_not_found(what, index.name()));
        }

        response
            .error_for_status()
            .and_then(|response| response.text())
            .map_err(|e| ToolboxError::network(url, e))
    }

    /// Fetch from the configured index, retrying on TestPyPI when PyPI
    /// does not know the package and fallback is enabled
    pub fn load_with_fallback(&self, package: &str) -> Result<ReleaseInfo> {
        match self.fetch(package) {
            Err(ToolboxError::PackageNotFound { .. })
                if self.config.fallback_to_test_pypi
                    && self.config.index == PackageIndex::PyPi =>
            {
                info!("{} not found on PyPI, trying TestPyPI", package);
                match self.fetch_from(&PackageIndex::TestPyPi, package) {
                    Err(ToolboxError::PackageNotFound { package, .. }) => Err(
                        ToolboxError::package_not_found(package, "PyPI or TestPyPI"),
                    ),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Check whether `installed` is the latest published version of `package`
    #[instrument(skip(self))]
    pub fn up_to_date(&self, package: &str, installed: &str) -> Result<Freshness> {
        let log = component_logger("pypi.up_to_date", false)?;
        let _span = log.span().entered();

        let installed = parse_version(installed)?;
        let release = self.load_with_fallback(package)?;
        let freshness = release.freshness(installed, self.config.include_pre_releases);

        if freshness.update_available {
            info!("{} on {}: {}", package, release.index(), freshness);
        } else if freshness.installed_is_newer() {
            warn!("{}: {}", package, freshness);
        } else {
            debug!("{}: {}", package, freshness);
        }
        Ok(freshness)
    }
}

fn package_name(package: &str) -> Result<&str> {
    let package = package.trim();
    if package.is_empty() {
        return Err(ToolboxError::validation("Package name must not be empty"));
    }
    Ok(package)
}

/// Check `installed` against PyPI with default options
pub fn up_to_date(package: &str, installed: &str) -> Result<Freshness> {
    PypiClient::new(PypiConfig::default())?.up_to_date(package, installed)
}
