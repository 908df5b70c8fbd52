//! Page event subscriptions
//!
//! Handlers are tracked by handle so that stopping a hunt removes exactly the
//! handlers that starting it installed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseOver,
    MouseOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: u64,
    kind: EventKind,
}

impl ListenerHandle {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    attached: Vec<ListenerHandle>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capture-phase handler for `kind`
    pub fn attach(&mut self, kind: EventKind) -> ListenerHandle {
        self.next_id += 1;
        let handle = ListenerHandle {
            id: self.next_id,
            kind,
        };
        self.attached.push(handle);
        handle
    }

    /// Remove the handler with this exact handle; false if it was not attached
    pub fn detach(&mut self, handle: ListenerHandle) -> bool {
        let before = self.attached.len();
        self.attached.retain(|h| *h != handle);
        self.attached.len() != before
    }

    pub fn is_attached(&self, kind: EventKind) -> bool {
        self.attached.iter().any(|h| h.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_by_identity() {
        let mut registry = ListenerRegistry::new();
        let first = registry.attach(EventKind::Click);
        let second = registry.attach(EventKind::Click);
        assert_ne!(first, second);

        assert!(registry.detach(first));
        assert!(!registry.detach(first));
        assert!(registry.is_attached(EventKind::Click));
        assert!(registry.detach(second));
        assert!(registry.is_empty());
    }
}
