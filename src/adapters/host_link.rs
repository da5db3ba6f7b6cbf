//! Host-core mailbox adapter.
//!
//! The host protocol core owns framing, checksums and the core register
//! window.  Once it has decoded an application-register access it calls
//! [`HostLink::submit`]; the main loop serves the mailbox through
//! [`HostPort`] and the core collects answers with [`HostLink::take_reply`].
//!
//! Both directions are bounded `heapless` deques, so a stalled core cannot
//! grow memory.  A full request mailbox hands the request back to the core,
//! which answers its host with a busy frame.

use heapless::Deque;
use log::warn;

use crate::app::commands::{HostReply, HostRequest};
use crate::app::ports::HostPort;

/// Requests (and unread replies) the mailbox holds.
pub const MAILBOX_DEPTH: usize = 8;

pub struct HostLink {
    requests: Deque<HostRequest, MAILBOX_DEPTH>,
    replies: Deque<HostReply, MAILBOX_DEPTH>,
    lost_replies: u32,
}

impl Default for HostLink {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLink {
    pub fn new() -> Self {
        Self {
            requests: Deque::new(),
            replies: Deque::new(),
            lost_replies: 0,
        }
    }

    /// Queue a decoded request.  Gives it back when the mailbox is full.
    pub fn submit(&mut self, request: HostRequest) -> Result<(), HostRequest> {
        self.requests.push_back(request)
    }

    /// Oldest unread reply.
    pub fn take_reply(&mut self) -> Option<HostReply> {
        self.replies.pop_front()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Replies dropped because the core never collected them.
    pub fn lost_replies(&self) -> u32 {
        self.lost_replies
    }
}

impl HostPort for HostLink {
    fn poll_request(&mut self) -> Option<HostRequest> {
        self.requests.pop_front()
    }

    fn reply(&mut self, reply: HostReply) {
        if self.replies.is_full() {
            // Oldest answer goes; the core has already timed it out.
            self.replies.pop_front();
            self.lost_replies = self.lost_replies.wrapping_add(1);
            warn!("host link: reply mailbox full, dropped oldest ({} lost)", self.lost_replies);
        }
        let _ = self.replies.push_back(reply);
    }
}
