use std::io;
use std::time::Duration;

use mio::event::Source;
use mio::{Events, Interest, Poll, Token};

/// Thin wrapper over the OS readiness primitive mio already abstracts
/// (epoll/kqueue/IOCP). Centralizes register/reregister/deregister so the
/// Engine never touches `mio::Poll` directly.
pub struct ReadinessMux {
    poll: Poll,
    events: Events,
}

pub struct ReadyBatch<'a> {
    events: &'a Events,
}

impl<'a> ReadyBatch<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &mio::event::Event> {
        self.events.iter()
    }
}

impl ReadinessMux {
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(ReadinessMux {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
        })
    }

    pub fn register(&mut self, source: &mut impl Source, token: Token, interest: Interest) -> io::Result<()> {
        self.poll.registry().register(source, token, interest)
    }

    pub fn reregister(&mut self, source: &mut impl Source, token: Token, interest: Interest) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest)
    }

    pub fn deregister(&mut self, source: &mut impl Source) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<ReadyBatch<'_>> {
        self.poll.poll(&mut self.events, timeout)?;
        Ok(ReadyBatch { events: &self.events })
    }
}
