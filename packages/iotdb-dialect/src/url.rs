//! Connection URLs of the form `<scheme>://<user>:<password>@<host>:<port>`.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{DialectError, Result};

/// Characters escaped inside the userinfo component.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Parsed connection URL. Credentials are held decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    /// Registered driver scheme
    pub scheme: String,
    /// User name
    pub user: String,
    /// Plain-text password
    pub password: String,
    /// Host name or address
    pub host: String,
    /// Port
    pub port: u16,
}

impl ConnectionUrl {
    pub fn new(
        scheme: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
        }
    }

    /// Parses a URL string, percent-decoding user and password.
    ///
    /// The userinfo is split at the last `@` so that an unencoded `@` in a
    /// password still yields the intended host.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| DialectError::InvalidUrl {
            url: redact(url),
            reason: reason.to_string(),
        };

        let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("empty scheme"));
        }
        let rest = rest.trim_end_matches('/');

        let (userinfo, hostport) = rest
            .rsplit_once('@')
            .ok_or_else(|| invalid("missing credentials"))?;
        let (user, password) = userinfo.split_once(':').unwrap_or((userinfo, ""));

        let (host, port) = hostport
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| invalid(&format!("invalid port '{}': {}", port, e)))?;

        let user = percent_decode_str(user)
            .decode_utf8()
            .map_err(|e| invalid(&format!("user is not UTF-8: {}", e)))?;
        let password = percent_decode_str(password)
            .decode_utf8()
            .map_err(|e| invalid(&format!("password is not UTF-8: {}", e)))?;

        Ok(Self {
            scheme: scheme.to_string(),
            user: user.into_owned(),
            password: password.into_owned(),
            host: host.to_string(),
            port,
        })
    }

    /// Renders the URL with the password masked, for logs.
    pub fn redacted(&self) -> String {
        format!(
            "{}://{}:***@{}:{}",
            self.scheme,
            utf8_percent_encode(&self.user, USERINFO),
            self.host,
            self.port
        )
    }

    /// Returns `http://host:port`, the base for REST requests.
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}@{}:{}",
            self.scheme,
            utf8_percent_encode(&self.user, USERINFO),
            utf8_percent_encode(&self.password, USERINFO),
            self.host,
            self.port
        )
    }
}

impl FromStr for ConnectionUrl {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Masks the userinfo of a raw URL string.
fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, hostport))) => format!("{}://***@{}", scheme, hostport),
        _ => url.to_string(),
    }
}
