//! Sender descriptors: `sender:<scheme>[?k=v[&k=v]*]`.
//!
//! Keys and values are form-url-encoded (space as `+`, reserved bytes as
//! `%XX`). Encoding sorts keys, so a given option set always yields the
//! same URI. A scheme is a bare token: non-empty and free of `?`, `&`, `=`.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every sender URI starts with this.
pub const SENDER_PREFIX: &str = "sender:";

const QUERY_SPLIT: [char; 2] = ['?', '&'];
const SCHEME_RESERVED: [char; 3] = ['?', '&', '='];

/// Boxed error returned by sender constructors and senders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorFault {
    /// The URI does not start with `sender:`.
    #[error("missing 'sender:' prefix")]
    MissingPrefix,
    /// Nothing between the prefix and the query.
    #[error("empty scheme")]
    EmptyScheme,
    /// The scheme contains a query delimiter.
    #[error("scheme '{0}' contains '?', '&' or '='")]
    InvalidScheme(String),
    /// A query pair without `=`, including an empty pair.
    #[error("query pair '{0}' has no '='")]
    MalformedPair(String),
    /// A percent escape in this pair does not decode to UTF-8.
    #[error("query pair '{0}' does not decode to UTF-8")]
    InvalidEncoding(String),
    /// The same key appears twice in the query.
    #[error("duplicate option '{0}'")]
    DuplicateKey(String),
    /// No constructor is registered for the scheme.
    #[error("no sender registered for scheme '{0}'")]
    UnknownScheme(String),
    /// A typed descriptor was read from a URI of another scheme.
    #[error("expected scheme '{expected}', found '{found}'")]
    SchemeMismatch {
        /// Scheme the reader handles.
        expected: String,
        /// Scheme the URI carries.
        found: String,
    },
    /// A required option is absent.
    #[error("missing option '{0}'")]
    MissingOption(String),
    /// An option is present but its value does not parse.
    #[error("invalid option '{key}': {reason}")]
    InvalidOption {
        /// Option name.
        key: String,
        /// Parse failure.
        reason: String,
    },
}

/// Errors from decoding descriptors and resolving them to senders.
#[derive(Debug, Error)]
pub enum SenderError {
    /// The descriptor itself is unusable (bad syntax or unknown scheme).
    #[error("Malformed sender descriptor '{uri}': {reason}")]
    MalformedDescriptor {
        /// The descriptor as given.
        uri: String,
        /// What is wrong with it.
        reason: DescriptorFault,
    },

    /// The scheme's constructor ran and failed.
    #[error("Cannot create sender for '{uri}'")]
    Resolution {
        /// The descriptor passed to the constructor.
        uri: String,
        /// The constructor's error.
        #[source]
        source: BoxError,
    },
}

impl SenderError {
    pub(crate) fn malformed(uri: &str, reason: DescriptorFault) -> Self {
        Self::MalformedDescriptor {
            uri: uri.to_string(),
            reason,
        }
    }

    /// The descriptor this error is about.
    pub fn uri(&self) -> &str {
        match self {
            Self::MalformedDescriptor { uri, .. } | Self::Resolution { uri, .. } => uri,
        }
    }
}

/// Check that `scheme` can appear in a descriptor.
pub fn check_scheme(scheme: &str) -> Result<(), DescriptorFault> {
    if scheme.is_empty() {
        return Err(DescriptorFault::EmptyScheme);
    }
    if scheme.contains(SCHEME_RESERVED) {
        return Err(DescriptorFault::InvalidScheme(scheme.to_string()));
    }
    Ok(())
}

/// [`check_scheme`] for a bare scheme, reported against `sender:<scheme>`.
pub(crate) fn require_scheme(scheme: &str) -> Result<(), SenderError> {
    check_scheme(scheme)
        .map_err(|fault| SenderError::malformed(&format!("{SENDER_PREFIX}{scheme}"), fault))
}

/// Extract the scheme: the text between `sender:` and the first `?`.
pub fn scheme_of(uri: &str) -> Result<&str, SenderError> {
    let rest = uri
        .strip_prefix(SENDER_PREFIX)
        .ok_or_else(|| SenderError::malformed(uri, DescriptorFault::MissingPrefix))?;
    let scheme = rest.split_once('?').map_or(rest, |(s, _)| s);
    check_scheme(scheme).map_err(|fault| SenderError::malformed(uri, fault))?;
    Ok(scheme)
}

fn encode_component(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn decode_component(s: &str) -> Option<String> {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn write_uri(scheme: &str, options: &BTreeMap<String, String>) -> String {
    let mut uri = format!("{SENDER_PREFIX}{scheme}");
    for (i, (key, value)) in options.iter().enumerate() {
        uri.push(if i == 0 { '?' } else { '&' });
        uri.push_str(&encode_component(key));
        uri.push('=');
        uri.push_str(&encode_component(value));
    }
    uri
}

/// Build the canonical URI for a scheme and its options.
///
/// Escapes use uppercase hex, and `!`, `(`, `)` and `~` are escaped too.
/// Other encoders may emit lowercase hex (`%3a`) or leave those characters
/// bare. Every such form decodes to the same options, but the text differs,
/// so compare decoded descriptors rather than URI strings.
pub fn encode_uri(
    scheme: &str,
    options: &BTreeMap<String, String>,
) -> Result<String, SenderError> {
    require_scheme(scheme)?;
    Ok(write_uri(scheme, options))
}

/// Split a URI into its scheme and decoded options.
pub fn decode_uri(uri: &str) -> Result<(String, BTreeMap<String, String>), SenderError> {
    let scheme = scheme_of(uri)?;
    let mut options = BTreeMap::new();
    let Some((_, query)) = uri.split_once('?') else {
        return Ok((scheme.to_string(), options));
    };
    for pair in query.split(QUERY_SPLIT) {
        let Some((raw_key, raw_value)) = pair.split_once('=') else {
            return Err(SenderError::malformed(
                uri,
                DescriptorFault::MalformedPair(pair.to_string()),
            ));
        };
        let (Some(key), Some(value)) = (decode_component(raw_key), decode_component(raw_value))
        else {
            return Err(SenderError::malformed(
                uri,
                DescriptorFault::InvalidEncoding(pair.to_string()),
            ));
        };
        if options.contains_key(&key) {
            return Err(SenderError::malformed(uri, DescriptorFault::DuplicateKey(key)));
        }
        options.insert(key, value);
    }
    Ok((scheme.to_string(), options))
}

/// A decoded sender descriptor. The scheme is always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderDescriptor {
    scheme: String,
    options: BTreeMap<String, String>,
}

impl SenderDescriptor {
    /// Start a descriptor for `scheme` with no options.
    pub fn new(scheme: impl Into<String>) -> Result<Self, SenderError> {
        let scheme = scheme.into();
        require_scheme(&scheme)?;
        Ok(Self::unchecked(scheme))
    }

    /// For the crate's scheme constants, which are known to be valid.
    pub(crate) fn unchecked(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            options: BTreeMap::new(),
        }
    }

    /// Add or replace an option, builder style.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Decoded value of an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Fetch an option or fail with [`DescriptorFault::MissingOption`].
    pub fn require(&self, key: &str) -> Result<&str, SenderError> {
        self.get(key).ok_or_else(|| {
            SenderError::malformed(&self.to_string(), DescriptorFault::MissingOption(key.into()))
        })
    }

    /// Fail unless this descriptor uses `expected`.
    pub fn expect_scheme(&self, expected: &str) -> Result<(), SenderError> {
        if self.scheme != expected {
            return Err(SenderError::malformed(
                &self.to_string(),
                DescriptorFault::SchemeMismatch {
                    expected: expected.into(),
                    found: self.scheme.clone(),
                },
            ));
        }
        Ok(())
    }

    /// The canonical URI, as [`encode_uri`] would build it.
    pub fn to_uri(&self) -> String {
        write_uri(&self.scheme, &self.options)
    }
}

impl fmt::Display for SenderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl FromStr for SenderDescriptor {
    type Err = SenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, options) = decode_uri(s)?;
        Ok(Self { scheme, options })
    }
}
