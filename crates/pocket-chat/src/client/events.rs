//! Events flowing from background tasks to the client, and the updates
//! the client reports after applying them.

use crate::stream::Fragment;
use crate::{ChatError, SessionId};

/// Sent by exchange and title tasks. Applied in arrival order.
#[derive(Debug)]
pub(crate) enum ClientEvent {
    Fragment {
        exchange: u64,
        fragment: Fragment,
    },
    Finished {
        exchange: u64,
        outcome: Result<(), ChatError>,
    },
    TitleFinished {
        session_id: SessionId,
        title: Option<String>,
    },
}

/// What changed after the client applied one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientUpdate {
    Fragment {
        session_id: SessionId,
        text: String,
        cached: bool,
    },
    ExchangeCompleted {
        session_id: SessionId,
    },
    /// The exchange ended in error. Quota rejections leave the client in
    /// `LimitReached`; the others appended a system turn.
    ExchangeFailed {
        session_id: SessionId,
        error: ChatError,
    },
    TitleUpdated {
        session_id: SessionId,
        title: String,
    },
}
