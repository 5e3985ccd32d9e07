//! Path resolver chain and the scoped resolution context.
//!
//! A [`PathContext`] holds a stack of [`PathResolver`]s. Resolving a path
//! consults the most recently registered resolver first; each resolver
//! either answers or hands the (possibly rewritten) path to the next one.
//! When every resolver has passed, the normalized path itself is the answer.
//!
//! Registration is scoped: [`PathContext::register`] returns a
//! [`ResolverScope`] guard and dropping the guard removes exactly that
//! resolver again, including when the scope is left through `?` or a panic.
//!
//! Stacks are kept per thread. A resolver registered on one thread is never
//! consulted for resolutions on another thread, so independent wrapper
//! invocations can share the process-wide context concurrently.
//!
//! # Example
//!
//! ```rust
//! use command_virtualizer::resolver::{PathContext, PathResolver, Resolution};
//! use command_virtualizer::Result;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Rebase;
//!
//! impl PathResolver for Rebase {
//!     fn resolve(&self, path: &str) -> Result<Resolution> {
//!         Ok(match path.strip_prefix("/home/u") {
//!             Some(rest) => Resolution::Resolved(format!("/workspace{rest}")),
//!             None => Resolution::Next(path.to_string()),
//!         })
//!     }
//! }
//!
//! let context = PathContext::new();
//! {
//!     let _scope = context.register(Arc::new(Rebase));
//!     assert_eq!(context.resolve("/home/u/src")?, "/workspace/src");
//! }
//! assert_eq!(context.resolve("/home/u/src")?, "/home/u/src");
//! # Ok::<(), command_virtualizer::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::path::{is_absolute, normalize};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

static GLOBAL: Lazy<PathContext> = Lazy::new(PathContext::new);

/// Outcome of asking a single resolver about a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The resolver produced the effective path; the chain stops here
    Resolved(String),
    /// The resolver passes this path on to the next resolver in the chain
    Next(String),
}

/// A strategy that turns a host path into the path effective where the
/// command will actually run.
///
/// Resolvers receive normalized absolute paths. A resolver may keep private
/// mutable state (behind its own lock) for as long as it lives.
pub trait PathResolver: Send + Sync + fmt::Debug {
    /// Resolve `path` or delegate it to the next resolver
    fn resolve(&self, path: &str) -> Result<Resolution>;
}

struct Registration {
    id: u64,
    resolver: Arc<dyn PathResolver>,
}

/// Registry of active path resolvers, one stack per thread
pub struct PathContext {
    /// Directory relative paths are resolved against, `None` for the process cwd
    base_dir: Option<String>,
    stacks: Mutex<HashMap<ThreadId, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl PathContext {
    /// Create an empty context resolving relative paths against the process cwd
    pub fn new() -> Self {
        Self {
            base_dir: None,
            stacks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Resolve relative paths against `dir` instead of the process cwd
    pub fn with_base_dir(mut self, dir: impl Into<String>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The process-wide context
    pub fn global() -> &'static PathContext {
        &GLOBAL
    }

    /// Push `resolver` onto the calling thread's stack.
    ///
    /// The resolver stays active until the returned guard is dropped.
    #[must_use = "the resolver is unregistered as soon as the scope is dropped"]
    pub fn register(&self, resolver: Arc<dyn PathResolver>) -> ResolverScope<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut stacks = self.lock();
        let stack = stacks.entry(thread::current().id()).or_default();
        debug!(id, ?resolver, depth = stack.len() + 1, "registered path resolver");
        stack.push(Registration { id, resolver });

        ResolverScope {
            context: self,
            id,
            _not_send: PhantomData,
        }
    }

    /// Number of resolvers active on the calling thread
    pub fn depth(&self) -> usize {
        self.lock()
            .get(&thread::current().id())
            .map_or(0, Vec::len)
    }

    /// Resolve `path` through the calling thread's resolver chain
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let raw = path.to_str().ok_or_else(|| {
            Error::invalid_path(path.to_string_lossy(), "path is not valid UTF-8")
        })?;
        let base = if is_absolute(raw) {
            None
        } else {
            self.base_dir()?
        };
        let mut current = normalize(raw, base.as_deref())?;

        // Snapshot so resolvers run without the registry lock held
        let chain: Vec<Arc<dyn PathResolver>> = self
            .lock()
            .get(&thread::current().id())
            .map(|stack| stack.iter().rev().map(|r| Arc::clone(&r.resolver)).collect())
            .unwrap_or_default();

        for resolver in chain {
            match resolver.resolve(&current)? {
                Resolution::Resolved(resolved) => {
                    trace!(from = %current, to = %resolved, "path resolved");
                    return Ok(resolved);
                }
                Resolution::Next(next) => current = next,
            }
        }

        Ok(current)
    }

    fn base_dir(&self) -> Result<Option<String>> {
        if let Some(dir) = &self.base_dir {
            return Ok(Some(dir.clone()));
        }
        let cwd = std::env::current_dir()?;
        match cwd.to_str() {
            Some(cwd) => Ok(Some(cwd.to_string())),
            None => Err(Error::invalid_path(
                cwd.to_string_lossy(),
                "current directory is not valid UTF-8",
            )),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadId, Vec<Registration>>> {
        self.stacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: u64) {
        let thread = thread::current().id();
        let mut stacks = self.lock();
        let Some(stack) = stacks.get_mut(&thread) else {
            return;
        };
        if let Some(position) = stack.iter().rposition(|r| r.id == id) {
            if position + 1 != stack.len() {
                warn!(id, position, depth = stack.len(), "path resolver released out of order");
            }
            stack.remove(position);
            debug!(id, depth = stack.len(), "released path resolver");
        }
        if stack.is_empty() {
            stacks.remove(&thread);
        }
    }
}

impl Default for PathContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PathContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathContext")
            .field("base_dir", &self.base_dir)
            .field("depth", &self.depth())
            .finish()
    }
}

/// Guard keeping a resolver registered; dropping it unregisters the resolver.
///
/// The guard is tied to the thread that created it.
pub struct ResolverScope<'a> {
    context: &'a PathContext,
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl ResolverScope<'_> {
    /// Unregister the resolver now
    pub fn release(self) {}
}

impl Drop for ResolverScope<'_> {
    fn drop(&mut self) {
        self.context.release(self.id);
    }
}

impl fmt::Debug for ResolverScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverScope").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rewrites one prefix and passes everything on
    #[derive(Debug)]
    struct Prefix {
        from: &'static str,
        to: &'static str,
        terminal: bool,
    }

    impl PathResolver for Prefix {
        fn resolve(&self, path: &str) -> Result<Resolution> {
            match path.strip_prefix(self.from) {
                Some(rest) if self.terminal => Ok(Resolution::Resolved(format!("{}{}", self.to, rest))),
                Some(rest) => Ok(Resolution::Next(format!("{}{}", self.to, rest))),
                None => Ok(Resolution::Next(path.to_string())),
            }
        }
    }

    fn prefix(from: &'static str, to: &'static str, terminal: bool) -> Arc<dyn PathResolver> {
        Arc::new(Prefix { from, to, terminal })
    }

    #[test]
    fn test_empty_context_is_identity() {
        let context = PathContext::new().with_base_dir("/work");
        assert_eq!(context.resolve("/a/./b").unwrap(), "/a/b");
        assert_eq!(context.resolve("rel").unwrap(), "/work/rel");
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_most_recent_resolver_wins() {
        let context = PathContext::new();
        let _outer = context.register(prefix("/src", "/outer", true));
        let _inner = context.register(prefix("/src", "/inner", true));
        assert_eq!(context.resolve("/src/x").unwrap(), "/inner/x");
    }

    #[test]
    fn test_delegation_passes_rewritten_path() {
        let context = PathContext::new();
        let _bottom = context.register(prefix("/mid", "/final", true));
        let _top = context.register(prefix("/src", "/mid", false));
        assert_eq!(context.resolve("/src/x").unwrap(), "/final/x");
        assert_eq!(context.resolve("/other").unwrap(), "/other");
    }

    #[test]
    fn test_scope_release_restores_stack() {
        let context = PathContext::new();
        let outer = context.register(prefix("/src", "/outer", true));
        {
            let _inner = context.register(prefix("/src", "/inner", true));
            assert_eq!(context.depth(), 2);
        }
        assert_eq!(context.depth(), 1);
        assert_eq!(context.resolve("/src").unwrap(), "/outer");
        outer.release();
        assert_eq!(context.depth(), 0);
        assert_eq!(context.resolve("/src").unwrap(), "/src");
    }

    #[test]
    fn test_scope_released_on_error_path() {
        #[derive(Debug)]
        struct Failing;
        impl PathResolver for Failing {
            fn resolve(&self, path: &str) -> Result<Resolution> {
                Err(Error::invalid_path(path, "rejected"))
            }
        }

        let context = PathContext::new();
        let attempt = || -> Result<String> {
            let _scope = context.register(Arc::new(Failing));
            context.resolve("/x")
        };
        assert!(attempt().is_err());
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_out_of_order_release_removes_exact_entry() {
        let context = PathContext::new();
        let first = context.register(prefix("/a", "/first", true));
        let second = context.register(prefix("/b", "/second", true));
        drop(first);
        assert_eq!(context.depth(), 1);
        assert_eq!(context.resolve("/a").unwrap(), "/a");
        assert_eq!(context.resolve("/b").unwrap(), "/second");
        drop(second);
    }

    #[test]
    fn test_registrations_are_thread_local() {
        let context = PathContext::new();
        let _scope = context.register(prefix("/src", "/mapped", true));

        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(context.depth(), 0);
                assert_eq!(context.resolve("/src").unwrap(), "/src");
            });
        });

        assert_eq!(context.resolve("/src").unwrap(), "/mapped");
    }

    #[test]
    fn test_non_utf8_path_rejected() {
        #[cfg(unix)]
        {
            use std::ffi::OsStr;
            use std::os::unix::ffi::OsStrExt;

            let context = PathContext::new();
            let path = Path::new(OsStr::from_bytes(b"/bad\xff"));
            assert!(matches!(context.resolve(path), Err(Error::InvalidPath { .. })));
        }
    }
}
