use crate::credential::Token;
use crate::error::{ErrorKind, Result};
use crate::oauth::OAuthClient;
use crate::source::SourceHandle;
use std::collections::BTreeMap;
use std::fmt;

/// Name the Drive source registers under.
pub const DRIVE: &str = "drive";

/// Constructs a source from host-supplied parameters and an optional
/// credential.
pub type SourceFactory = Box<dyn Fn(&[String], Option<Token>) -> Result<SourceHandle> + Send + Sync>;

struct Registration {
    client: Option<OAuthClient>,
    factory: SourceFactory,
}

/// The set of source types a host can instantiate.
///
/// Built once by the composition root and passed to whatever needs it; there
/// is no process-wide registry.
#[derive(Default)]
pub struct SourceRegistry {
    oauth: BTreeMap<String, Registration>,
}
impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source type that requires an OAuth credential.
    ///
    /// `client` is the registration hosts use to obtain that credential. It
    /// may be omitted when tokens are acquired out of band.
    pub fn register_oauth<F>(&mut self, name: impl Into<String>, client: Option<OAuthClient>, factory: F) -> Result<()>
    where
        F: Fn(&[String], Option<Token>) -> Result<SourceHandle> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.oauth.contains_key(&name) {
            exn::bail!(ErrorKind::DuplicateSource(name));
        }
        tracing::debug!(source = %name, client = client.is_some(), "Registered OAuth source");
        self.oauth.insert(name, Registration { client, factory: Box::new(factory) });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.oauth.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.oauth.keys().map(String::as_str)
    }

    /// The OAuth client registered for `name`, if the source is known and was
    /// registered with one.
    pub fn oauth(&self, name: &str) -> Option<&OAuthClient> {
        self.oauth.get(name).and_then(|registration| registration.client.as_ref())
    }

    pub fn create(&self, name: &str, params: &[String], token: Option<Token>) -> Result<SourceHandle> {
        let registration =
            self.oauth.get(name).ok_or_else(|| exn::Exn::from(ErrorKind::UnknownSource(name.to_string())))?;
        (registration.factory)(params, token)
    }
}
impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry").field("oauth", &self.oauth.keys().collect::<Vec<_>>()).finish()
    }
}

/// Register the Drive source under [`DRIVE`].
///
/// Every instance shares `options` and `codecs`; parameters are ignored since
/// the credential alone identifies the account. Build `client` with
/// [`OAuthClient::drive`].
#[cfg(feature = "drive")]
pub fn register_drive(
    registry: &mut SourceRegistry,
    client: Option<OAuthClient>,
    options: cumulus_storage::backend::DriveOptions,
    codecs: cumulus_codec::CodecRegistry,
) -> Result<()> {
    use crate::source::DriveSource;

    registry.register_oauth(DRIVE, client, move |_params, token| {
        let source = DriveSource::connect(token, options.clone(), codecs.clone())?;
        Ok(Box::new(source) as SourceHandle)
    })
}
