//! Request/response correlation and push routing.
//!
//! Every request carries a `seq` field; the server echoes it in the reply.
//! Inbound maps whose `seq` matches an outstanding call complete that call.
//! Everything else is a server push, routed by its `method` field to the
//! handler registered for that message type.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use htsp_protocol::{field, ClientError, Map, Value};

/// Callback invoked with the full map of a server push.
pub type AsyncHandler = Arc<dyn Fn(&Map) + Send + Sync>;

/// Completion slot of an outstanding call.
pub type Completion = oneshot::Receiver<Result<Map, ClientError>>;

struct PendingCall {
    method: String,
    tx: oneshot::Sender<Result<Map, ClientError>>,
}

struct PendingTable {
    next_seq: u32,
    calls: HashMap<u32, PendingCall>,
    closed: bool,
}

/// A registered call, ready to be written.
pub struct OutgoingCall {
    pub seq: u32,
    pub request: Map,
    pub completion: Completion,
}

/// Pending-call table plus the async handler table.
pub struct Dispatcher {
    pending: Mutex<PendingTable>,
    handlers: RwLock<HashMap<String, AsyncHandler>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(PendingTable {
                next_seq: 1,
                calls: HashMap::new(),
                closed: false,
            }),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a sequence number and register the call.
    ///
    /// The request map is `method`, then `args` in order, then `seq`. Fails
    /// with `ConnectionClosed` once [`fail_all`](Self::fail_all) has run.
    pub fn begin_call(&self, method: &str, args: Map) -> Result<OutgoingCall, ClientError> {
        let mut request = Map::with_capacity(args.len() + 2);
        request.insert(field::METHOD, method);
        for (name, value) in args {
            request.insert(name, value);
        }

        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let seq = pending.next_seq;
        pending.next_seq += 1;
        pending.calls.insert(
            seq,
            PendingCall {
                method: method.to_string(),
                tx,
            },
        );
        drop(pending);

        request.insert(field::SEQ, seq);
        trace!("Call registered: {} seq={}", method, seq);

        Ok(OutgoingCall {
            seq,
            request,
            completion: rx,
        })
    }

    /// Remove an outstanding call without completing it. Returns whether it was
    /// still pending.
    pub fn cancel(&self, seq: u32) -> bool {
        self.pending.lock().calls.remove(&seq).is_some()
    }

    /// Number of outstanding calls.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().calls.len()
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Route one inbound map.
    ///
    /// A reply completes its call even if it carries `error`; interpreting the
    /// reply belongs to the caller.
    pub fn on_frame(&self, map: Map) {
        if let Some(Value::Integer(seq)) = map.get(field::SEQ) {
            let seq = *seq;
            let call = u32::try_from(seq)
                .ok()
                .and_then(|seq| self.pending.lock().calls.remove(&seq));
            match call {
                Some(call) => {
                    trace!("Reply matched: {} seq={}", call.method, seq);
                    if call.tx.send(Ok(map)).is_err() {
                        debug!("Caller of {} seq={} went away", call.method, seq);
                    }
                }
                None => debug!("Dropping reply with stale seq={}", seq),
            }
            return;
        }

        let method = match map.optional_str(field::METHOD) {
            Ok(Some(method)) => method.to_string(),
            Ok(None) => {
                debug!("Dropping message without method or seq");
                return;
            }
            Err(e) => {
                warn!("Dropping message with malformed method: {}", e);
                return;
            }
        };

        let handler = self.handlers.read().get(&method).cloned();
        match handler {
            Some(handler) => {
                trace!("Push routed: {}", method);
                handler(&map);
            }
            None => debug!("No handler for push {}, dropped", method),
        }
    }

    /// Close the table and complete every outstanding call with
    /// `ConnectionClosed`. Later calls fail immediately.
    pub fn fail_all(&self) {
        let calls = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            std::mem::take(&mut pending.calls)
        };
        if !calls.is_empty() {
            debug!("Failing {} pending calls", calls.len());
        }
        for (seq, call) in calls {
            trace!("Call aborted: {} seq={}", call.method, seq);
            let _ = call.tx.send(Err(ClientError::ConnectionClosed));
        }
    }

    /// Register the handler for one push type, replacing any previous one.
    pub fn register_handler<F>(&self, method: &str, handler: F)
    where
        F: Fn(&Map) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert(method.to_string(), Arc::new(handler));
    }

    pub fn unregister_handler(&self, method: &str) -> bool {
        self.handlers.write().remove(method).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reply(seq: u32) -> Map {
        Map::new().with("seq", seq).with("ok", 1)
    }

    #[test]
    fn test_request_field_order() {
        let dispatcher = Dispatcher::new();
        let call = dispatcher
            .begin_call("getChannel", Map::new().with("channelId", 7))
            .unwrap();
        assert_eq!(call.seq, 1);

        let names: Vec<&str> = call.request.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["method", "channelId", "seq"]);

        let next = dispatcher.begin_call("getSysTime", Map::new()).unwrap();
        assert_eq!(next.seq, 2);
    }

    #[tokio::test]
    async fn test_out_of_order_replies() {
        let dispatcher = Dispatcher::new();
        let calls: Vec<OutgoingCall> = (0..3)
            .map(|_| dispatcher.begin_call("getDiskSpace", Map::new()).unwrap())
            .collect();

        for seq in [3, 1, 2] {
            dispatcher.on_frame(reply(seq));
        }

        for call in calls {
            let map = call.completion.await.unwrap().unwrap();
            assert_eq!(map.require_u32("seq"), Ok(call.seq));
        }
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_reply_is_dropped() {
        let dispatcher = Dispatcher::new();
        let first = dispatcher.begin_call("getSysTime", Map::new()).unwrap();
        assert!(dispatcher.cancel(first.seq));
        assert!(!dispatcher.cancel(first.seq));

        let second = dispatcher.begin_call("getSysTime", Map::new()).unwrap();
        dispatcher.on_frame(reply(first.seq));
        assert_eq!(dispatcher.pending_count(), 1);

        dispatcher.on_frame(reply(second.seq));
        let map = second.completion.await.unwrap().unwrap();
        assert_eq!(map.require_u32("seq"), Ok(second.seq));
    }

    #[test]
    fn test_push_invokes_handler_once() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));

        let (h, s) = (Arc::clone(&hits), Arc::clone(&seen));
        dispatcher.register_handler("channelAdd", move |map| {
            h.fetch_add(1, Ordering::SeqCst);
            *s.lock() = Some(map.clone());
        });

        let push = Map::new()
            .with("method", "channelAdd")
            .with("channelId", 12)
            .with("channelName", "BBC ONE");
        dispatcher.on_frame(push.clone());
        dispatcher.on_frame(Map::new().with("method", "tagAdd"));
        dispatcher.on_frame(Map::new().with("unrelated", 1));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().as_ref(), Some(&push));

        assert!(dispatcher.unregister_handler("channelAdd"));
        dispatcher.on_frame(push);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_all_closes_table() {
        let dispatcher = Dispatcher::new();
        let calls: Vec<OutgoingCall> = (0..4)
            .map(|_| dispatcher.begin_call("hello", Map::new()).unwrap())
            .collect();

        dispatcher.fail_all();

        for call in calls {
            assert_eq!(
                call.completion.await.unwrap(),
                Err(ClientError::ConnectionClosed)
            );
        }
        assert!(dispatcher.is_closed());
        assert!(matches!(
            dispatcher.begin_call("hello", Map::new()),
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_error_reply_still_completes() {
        let dispatcher = Dispatcher::new();
        let mut call = dispatcher.begin_call("getChannel", Map::new()).unwrap();
        dispatcher.on_frame(
            Map::new()
                .with("seq", call.seq)
                .with("error", "Channel does not exist"),
        );
        let map = call.completion.try_recv().unwrap().unwrap();
        assert_eq!(map.require_str("error"), Ok("Channel does not exist"));
    }
}
