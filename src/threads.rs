//! Thread repository: the thread collection and the active-thread selector.
//!
//! The repository keeps one invariant: whenever it holds any thread, the
//! active id resolves to one of them. Every operation that can remove the
//! active thread re-selects or creates one before returning.

use crate::model::{
    DisplayContent, FileAttachment, IdClock, Message, Sender, Thread, ThreadId, WELCOME_TITLE,
};

/// Greeting seeded into every new thread.
pub const GREETING: &str = "Hello! My name is Friday. How can I assist you today?";

/// Shortcut hint seeded into every new thread.
pub const SHORTCUT_HINT: &str =
    "You can use shortcuts like `/wp`, `/so`, `/arxiv`, `/mdn`, or `/web.dev` to search specific sites.";

/// Owns all conversation threads.
#[derive(Debug, Clone)]
pub struct ThreadRepository {
    threads: Vec<Thread>,
    active: Option<ThreadId>,
    ids: IdClock,
}

impl Default for ThreadRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadRepository {
    /// A repository holding one fresh welcome thread.
    pub fn new() -> Self {
        let mut repo = Self {
            threads: Vec::new(),
            active: None,
            ids: IdClock::default(),
        };
        repo.create_thread();
        repo
    }

    /// Rebuild from persisted threads.
    ///
    /// An unknown or missing `active` falls back to the first thread, and an
    /// empty list heals into a single welcome thread. Messages saved without
    /// an id get a fresh one.
    pub fn restore(threads: Vec<Thread>, active: Option<ThreadId>) -> Self {
        let floor = threads
            .iter()
            .flat_map(|t| std::iter::once(t.id.0).chain(t.conversation.iter().map(|m| m.id)))
            .max()
            .unwrap_or(0);
        let mut repo = Self {
            threads,
            active,
            ids: IdClock::starting_after(floor),
        };
        for message in repo.threads.iter_mut().flat_map(|t| t.conversation.iter_mut()) {
            if message.id == 0 {
                message.id = repo.ids.next();
            }
        }
        repo.heal();
        repo
    }

    /// Create a welcome thread and make it active.
    pub fn create_thread(&mut self) -> ThreadId {
        let id = ThreadId(self.ids.next());
        let conversation = vec![
            Message {
                id: self.ids.next(),
                from: Sender::Assistant,
                text: GREETING.to_owned(),
                file: None,
            },
            Message {
                id: self.ids.next(),
                from: Sender::Assistant,
                text: SHORTCUT_HINT.to_owned(),
                file: None,
            },
        ];
        self.threads.push(Thread {
            id,
            title: WELCOME_TITLE.to_owned(),
            conversation,
            display_content: DisplayContent::placeholder(),
            active_file: None,
            titled: false,
        });
        self.active = Some(id);
        id
    }

    /// Make `id` active. Unknown ids are ignored; returns whether it switched.
    pub fn select_thread(&mut self, id: ThreadId) -> bool {
        if self.contains(id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Remove a thread, re-selecting when it was the active one.
    ///
    /// Returns whether a thread was removed.
    pub fn delete_thread(&mut self, id: ThreadId) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| t.id != id);
        let removed = self.threads.len() != before;
        if self.active == Some(id) {
            self.active = None;
        }
        self.heal();
        removed
    }

    /// Rename a thread. Blank titles are ignored; returns whether it changed.
    pub fn rename_thread(&mut self, id: ThreadId, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(thread) => {
                thread.title = title.to_owned();
                thread.titled = true;
                true
            }
            None => false,
        }
    }

    /// Drop every thread and start over with one fresh thread.
    pub fn clear_all(&mut self) -> ThreadId {
        self.threads.clear();
        self.active = None;
        self.create_thread()
    }

    /// Append to the active thread. No-op without an active thread.
    pub fn append_message(
        &mut self,
        from: Sender,
        text: impl Into<String>,
        file: Option<FileAttachment>,
    ) -> Option<u64> {
        let target = self.active?;
        self.append_message_to(target, from, text, file)
    }

    /// Append to a specific thread. No-op if it no longer exists.
    pub fn append_message_to(
        &mut self,
        thread: ThreadId,
        from: Sender,
        text: impl Into<String>,
        file: Option<FileAttachment>,
    ) -> Option<u64> {
        let id = self.ids.next();
        let thread = self.get_mut(thread)?;
        thread.conversation.push(Message {
            id,
            from,
            text: text.into(),
            file,
        });
        Some(id)
    }

    /// Active thread id, if any.
    pub fn active_id(&self) -> Option<ThreadId> {
        self.active
    }

    /// The active thread.
    pub fn active(&self) -> Option<&Thread> {
        self.active.and_then(|id| self.get(id))
    }

    /// The active thread, mutably.
    pub fn active_mut(&mut self) -> Option<&mut Thread> {
        let id = self.active?;
        self.get_mut(id)
    }

    /// Look up a thread.
    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    /// Look up a thread mutably.
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    /// Whether a thread with this id exists.
    pub fn contains(&self, id: ThreadId) -> bool {
        self.threads.iter().any(|t| t.id == id)
    }

    /// All threads in creation order.
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Number of threads.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Whether the repository holds no threads.
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Restore the active-thread invariant.
    fn heal(&mut self) {
        if self.active.is_some_and(|id| self.contains(id)) {
            return;
        }
        self.active = self.threads.first().map(|t| t.id);
        if self.active.is_none() {
            self.create_thread();
        }
    }
}
