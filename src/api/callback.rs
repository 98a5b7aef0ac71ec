//! Callback registries for event-driven hosts
//!
//! Handlers are plain boxed closures invoked synchronously, in registration
//! order, on the thread that drives the session.

/// Callback function type for a single event kind
pub type EventCallback<E> = Box<dyn FnMut(&E) + Send>;

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    fn new(id: u32) -> Self {
        CallbackHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Hands out handles that stay unique across every registry of one session
#[derive(Debug, Default)]
pub struct HandleAllocator {
    counter: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_handle(&mut self) -> CallbackHandle {
        self.counter += 1;
        CallbackHandle::new(self.counter)
    }
}

/// Ordered list of handlers for one event kind
pub struct CallbackRegistry<E> {
    callbacks: Vec<(CallbackHandle, EventCallback<E>)>,
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Register a callback under a handle from the session's allocator
    pub fn insert(&mut self, handle: CallbackHandle, callback: EventCallback<E>) {
        self.callbacks.push((handle, callback));
    }

    /// Remove a callback. Returns whether the handle belonged to this registry.
    pub fn remove(&mut self, handle: CallbackHandle) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(registered, _)| *registered != handle);
        self.callbacks.len() != before
    }

    /// Invoke every callback in registration order
    pub fn dispatch(&mut self, event: &E) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
