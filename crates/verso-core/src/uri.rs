use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Scheme used for plain files on the local file system.
pub const FILE_SCHEME: &str = "file";

// Characters that must be escaped in each component so the flat form parses back into the
// same components. `%` is always escaped so decoding is lossless.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const QUERY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const AUTHORITY_ESCAPE: &AsciiSet = &PATH_ESCAPE.add(b'/');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("uri has no scheme: {input:?}")]
    MissingScheme { input: String },
    #[error("invalid uri scheme {scheme:?}")]
    InvalidScheme { scheme: String },
    #[error("invalid percent-encoding in uri {component}: {input:?}")]
    InvalidEncoding {
        component: &'static str,
        input: String,
    },
}

/// A generic resource identifier split into its components.
///
/// Components are stored decoded; only the flat string produced by [`fmt::Display`] is
/// percent-encoded. [`FromStr`] parses that flat form back into identical components.
///
/// Instances are immutable: [`Uri::with`] returns a modified copy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    scheme: String,
    authority: String,
    path: String,
    query: String,
    fragment: String,
}

/// Field overrides applied by [`Uri::with`]. `None` keeps the original component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UriChange {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UriChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }
}

impl Uri {
    /// Builds a URI from decoded components.
    ///
    /// Paths are normalized so the flat form is unambiguous: a path following a non-empty
    /// authority, or any `file` path, always starts with `/`.
    pub fn from_parts(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        let scheme = scheme.into();
        let authority = authority.into();
        let mut path = path.into();

        let needs_root = if scheme == FILE_SCHEME {
            !path.starts_with('/')
        } else {
            !authority.is_empty() && !path.is_empty() && !path.starts_with('/')
        };
        if needs_root {
            path.insert(0, '/');
        }

        Self {
            scheme,
            authority,
            path,
            query: query.into(),
            fragment: fragment.into(),
        }
    }

    /// Builds a `file` URI for a local filesystem path.
    ///
    /// UNC paths (`//server/share/x`) put the server into the authority.
    pub fn file(path: impl AsRef<str>) -> Self {
        let path = fs_path_to_uri_path(path.as_ref());
        let (authority, path) = match path.strip_prefix("//") {
            Some(rest) => match rest.find('/') {
                Some(idx) => (rest[..idx].to_owned(), rest[idx..].to_owned()),
                None => (rest.to_owned(), "/".to_owned()),
            },
            None => (String::new(), path),
        };
        Self::from_parts(FILE_SCHEME, authority, path, "", "")
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Returns a copy of this URI with the components in `change` replaced.
    pub fn with(&self, change: UriChange) -> Self {
        Self::from_parts(
            change.scheme.unwrap_or_else(|| self.scheme.clone()),
            change.authority.unwrap_or_else(|| self.authority.clone()),
            change.path.unwrap_or_else(|| self.path.clone()),
            change.query.unwrap_or_else(|| self.query.clone()),
            change.fragment.unwrap_or_else(|| self.fragment.clone()),
        )
    }

    /// The filesystem path this URI denotes, independent of its scheme.
    ///
    /// - `file` URIs with an authority map to UNC paths (`//server/share`).
    /// - Drive-letter paths drop the leading slash (`/c:/x` -> `c:/x`).
    /// - Separators are backslashes on Windows.
    pub fn fs_path(&self) -> String {
        let unc = self.scheme == FILE_SCHEME && !self.authority.is_empty() && self.path.len() > 1;
        let value = if unc {
            format!("//{}{}", self.authority, self.path)
        } else if starts_with_rooted_drive_letter(&self.path) {
            self.path[1..].to_owned()
        } else {
            self.path.clone()
        };

        if cfg!(windows) {
            value.replace('/', "\\")
        } else {
            value
        }
    }

    /// Returns a copy that denotes the filesystem path `fs_path`.
    ///
    /// For `file` URIs the authority is taken from `fs_path`, so a UNC URI pointed at a local
    /// path loses its server. Other schemes keep their authority, which [`Uri::fs_path`]
    /// never reads.
    pub fn with_fs_path(&self, fs_path: &str) -> Self {
        if self.scheme == FILE_SCHEME {
            let file = Uri::file(fs_path);
            return self.with(UriChange::new().authority(file.authority).path(file.path));
        }
        self.with(UriChange::new().path(fs_path_to_uri_path(fs_path)))
    }
}

/// Converts a filesystem path string into the `path` component of a URI.
///
/// Backslashes become forward slashes on Windows, and drive-letter paths gain a leading
/// slash (`c:/x` -> `/c:/x`). This is the inverse of [`Uri::fs_path`] for local paths.
pub fn fs_path_to_uri_path(path: &str) -> String {
    let path = if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_owned()
    };

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        format!("/{path}")
    } else {
        path
    }
}

fn starts_with_rooted_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':'
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn decode_component(component: &'static str, raw: &str) -> Result<String, UriError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| UriError::InvalidEncoding {
            component,
            input: raw.to_owned(),
        })
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if !self.authority.is_empty() || self.scheme == FILE_SCHEME || self.path.starts_with("//")
        {
            write!(
                f,
                "//{}",
                utf8_percent_encode(&self.authority, AUTHORITY_ESCAPE)
            )?;
        }
        write!(f, "{}", utf8_percent_encode(&self.path, PATH_ESCAPE))?;
        if !self.query.is_empty() {
            write!(f, "?{}", utf8_percent_encode(&self.query, QUERY_ESCAPE))?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", utf8_percent_encode(&self.fragment, QUERY_ESCAPE))?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // RFC 3986, Appendix B.
        static URI_RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = URI_RE.get_or_init(|| {
            regex::Regex::new(r"(?s)^(([^:/?#]+?):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?$")
                .expect("uri regex should compile")
        });

        let missing_scheme = || UriError::MissingScheme {
            input: input.to_owned(),
        };
        let captures = re.captures(input).ok_or_else(missing_scheme)?;
        let scheme = captures.get(2).ok_or_else(missing_scheme)?.as_str();
        if !is_valid_scheme(scheme) {
            return Err(UriError::InvalidScheme {
                scheme: scheme.to_owned(),
            });
        }

        let part = |idx: usize| captures.get(idx).map_or("", |m| m.as_str());
        Ok(Self::from_parts(
            scheme,
            decode_component("authority", part(4))?,
            decode_component("path", part(5))?,
            decode_component("query", part(7))?,
            decode_component("fragment", part(9))?,
        ))
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
