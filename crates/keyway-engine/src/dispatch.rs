//! External collaborator seams
//!
//! The session manager hands out library handles per scope and a reporting
//! sink receives normalized outcomes. The engine only consumes both through
//! the traits below.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::call::CallArguments;
use crate::error::{KeywordError, KeywordOutcome};
use crate::handle::LibraryHandle;
use crate::invoker::KeywordResult;

/// Provides the current handle for a library name
pub trait HandleProvider: Send + Sync {
    /// Handle for `library`, if one is active
    fn handle(&self, library: &str) -> Option<Arc<LibraryHandle>>;
}

impl HandleProvider for HashMap<String, Arc<LibraryHandle>> {
    fn handle(&self, library: &str) -> Option<Arc<LibraryHandle>> {
        self.get(library).cloned()
    }
}

/// Receives every normalized outcome
pub trait OutcomeSink: Send + Sync {
    /// Called once per keyword run
    fn record(&self, library: &str, keyword: &str, outcome: &KeywordOutcome<KeywordResult>);
}

/// Runs keywords against the handles a provider supplies.
///
/// Handles are looked up on every call, so a provider may swap in a fresh
/// handle at any time.
pub struct Dispatcher<P: HandleProvider> {
    provider: P,
    sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl<P: HandleProvider> Dispatcher<P> {
    /// Create a dispatcher over `provider`
    pub fn new(provider: P) -> Self {
        Dispatcher {
            provider,
            sinks: Vec::new(),
        }
    }

    /// Add an outcome sink
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The handle provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run `keyword` from `library`
    pub fn run(
        &self,
        library: &str,
        keyword: &str,
        args: &CallArguments,
    ) -> KeywordOutcome<KeywordResult> {
        let outcome = match self.provider.handle(library) {
            Some(handle) => handle.run(keyword, args),
            None => Err(KeywordError::NoSuchLibrary(library.to_string())),
        };
        if let Err(e) = &outcome {
            debug!(library = %library, keyword = %keyword, error = %e, "keyword run failed");
        }
        for sink in &self.sinks {
            sink.record(library, keyword, &outcome);
        }
        outcome
    }

    /// Run a `Library.Keyword Name` qualified keyword. The library part is
    /// everything before the last dot.
    pub fn run_qualified(&self, full_name: &str, args: &CallArguments) -> KeywordOutcome<KeywordResult> {
        match full_name.rsplit_once('.') {
            Some((library, keyword)) => self.run(library, keyword, args),
            None => {
                let outcome = Err(KeywordError::NoSuchLibrary(String::new()));
                for sink in &self.sinks {
                    sink.record("", full_name, &outcome);
                }
                outcome
            }
        }
    }
}

impl<P: HandleProvider + fmt::Debug> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("provider", &self.provider)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
