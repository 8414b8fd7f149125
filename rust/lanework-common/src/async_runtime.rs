//! Task spawning abstractions for the async runtime.
//! **Note**: at the moment, these are simple functions with baked-in tokio-based
//! implementation.

#[cfg(feature = "tokio")]
pub use impls::spawn;

#[cfg(feature = "tokio")]
mod impls {
    use std::future::Future;

    /// Spawns a future onto the ambient tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime context.
    pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::task::spawn(future)
    }
}
