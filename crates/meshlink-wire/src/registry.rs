//! Sender registry — resolves sender descriptors into senders.
//!
//! Routing strategies (exact, greedy, relay-forwarded, ...) live outside this
//! crate. Each one registers a constructor for its scheme; resolving
//! `sender:<scheme>?...` looks the constructor up and calls it with the
//! caller's context and the unmodified URI.
//!
//! The lock is held only for the map access itself. Constructors run
//! without it and may call back into the registry.

use crate::descriptor::{
    decode_uri, require_scheme, scheme_of, BoxError, DescriptorFault, SenderError,
};
use meshlink_types::WireValue;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, warn};

/// A way of delivering control messages toward some destination.
pub trait Sender: Send + Sync + fmt::Debug {
    /// Hand a message to the routing layer.
    fn send(&self, payload: &WireValue) -> Result<(), BoxError>;

    /// The descriptor that recreates this sender.
    fn to_uri(&self) -> String;
}

/// Opaque context passed to constructors, typically the local node.
/// Constructors downcast it to the type they expect.
pub type SenderContext = dyn Any + Send + Sync;

/// Builds a sender from `(context, uri)`.
pub type SenderConstructor =
    Arc<dyn Fn(&SenderContext, &str) -> Result<Arc<dyn Sender>, BoxError> + Send + Sync>;

static GLOBAL: OnceLock<SenderRegistry> = OnceLock::new();

/// Thread-safe map from scheme name to sender constructor.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    constructors: Arc<RwLock<HashMap<String, SenderConstructor>>>,
}

impl SenderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. Starts empty, lives until exit.
    pub fn global() -> &'static SenderRegistry {
        GLOBAL.get_or_init(SenderRegistry::new)
    }

    /// Install the constructor for `scheme`, replacing any previous one.
    ///
    /// Fails if `scheme` is empty or contains `?`, `&` or `=`, since no
    /// descriptor could ever name it.
    pub fn register<F>(&self, scheme: &str, constructor: F) -> Result<(), SenderError>
    where
        F: Fn(&SenderContext, &str) -> Result<Arc<dyn Sender>, BoxError> + Send + Sync + 'static,
    {
        require_scheme(scheme)?;
        let replaced = {
            let mut map = self
                .constructors
                .write()
                .unwrap_or_else(|e| e.into_inner());
            map.insert(scheme.to_string(), Arc::new(constructor))
                .is_some()
        };
        debug!(scheme, overwrote = replaced, "sender: registered scheme");
        Ok(())
    }

    /// Whether a constructor is installed for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        let map = self.constructors.read().unwrap_or_else(|e| e.into_inner());
        map.contains_key(scheme)
    }

    /// All registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let map = self.constructors.read().unwrap_or_else(|e| e.into_inner());
        let mut schemes: Vec<String> = map.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    fn lookup(&self, scheme: &str) -> Option<SenderConstructor> {
        let map = self.constructors.read().unwrap_or_else(|e| e.into_inner());
        map.get(scheme).cloned()
    }

    /// Build a sender for `uri`.
    ///
    /// The URI is fully validated first; the constructor then receives it
    /// verbatim. A failing constructor is reported as
    /// [`SenderError::Resolution`] with its error kept as the source.
    pub fn resolve(&self, ctx: &SenderContext, uri: &str) -> Result<Arc<dyn Sender>, SenderError> {
        decode_uri(uri)?;
        let scheme = scheme_of(uri)?;
        let constructor = self
            .lookup(scheme)
            .ok_or_else(|| SenderError::malformed(uri, DescriptorFault::UnknownScheme(scheme.into())))?;

        match constructor(ctx, uri) {
            Ok(sender) => {
                debug!("sender: resolved '{}'", uri);
                Ok(sender)
            }
            Err(source) => {
                warn!("sender: constructor for '{}' failed: {}", scheme, source);
                Err(SenderError::Resolution {
                    uri: uri.to_string(),
                    source,
                })
            }
        }
    }
}

impl fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Register a constructor in the process-wide registry.
pub fn register_sender<F>(scheme: &str, constructor: F) -> Result<(), SenderError>
where
    F: Fn(&SenderContext, &str) -> Result<Arc<dyn Sender>, BoxError> + Send + Sync + 'static,
{
    SenderRegistry::global().register(scheme, constructor)
}

/// Resolve a descriptor against the process-wide registry.
pub fn create_sender(ctx: &SenderContext, uri: &str) -> Result<Arc<dyn Sender>, SenderError> {
    SenderRegistry::global().resolve(ctx, uri)
}
