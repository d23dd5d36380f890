use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, error};

use super::time::Timestamp;

/// Closed set of event payloads a scheduler can carry.
///
/// Implemented by an enum with one variant per event type; `Kind` is the
/// matching field-less tag used to key listeners.
pub trait EventSet: Debug + 'static {
    type Kind: Copy + Eq + Hash + Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

/// One event type that belongs to the set `S`.
pub trait EventMember<S: EventSet>: Sized + 'static {
    const KIND: S::Kind;

    fn wrap(self) -> S;

    /// Tag-checked view of the payload; `None` when `event` is another variant.
    fn peel(event: &S) -> Option<&Self>;
}

#[derive(Debug)]
struct Record<S> {
    event: S,
    enqueued_at: Timestamp,
    planned_at: Timestamp,
    sequence: u64,
}

impl<S> Record<S> {
    fn order_key(&self) -> (Timestamp, u64) {
        (self.planned_at, self.sequence)
    }
}

impl<S> PartialEq for Record<S> {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl<S> Eq for Record<S> {}

impl<S> PartialOrd for Record<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Record<S> {
    // Reversed so the max-heap yields the earliest planned record first, and
    // among equal timestamps the one enqueued first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.order_key().cmp(&self.order_key())
    }
}

/// Time-ordered pending events plus the simulation clock.
///
/// Listeners receive this queue during dispatch, so they can schedule follow-up
/// events while the scheduler is running.
#[derive(Debug)]
pub struct EventQueue<S: EventSet> {
    heap: BinaryHeap<Record<S>>,
    now: Timestamp,
    next_sequence: u64,
}

impl<S: EventSet> Default for EventQueue<S> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now: Timestamp::ZERO,
            next_sequence: 0,
        }
    }
}

impl<S: EventSet> EventQueue<S> {
    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now + delta;
    }

    /// Moves the clock to `now`. The clock never runs backwards.
    pub fn set_now(&mut self, now: Timestamp) {
        self.now = self.now.max(now);
    }

    pub fn enqueue<E: EventMember<S>>(&mut self, event: E) {
        let now = self.now;
        self.push(event.wrap(), now);
    }

    pub fn enqueue_at<E: EventMember<S>>(&mut self, event: E, planned_at: Timestamp) {
        self.push(event.wrap(), planned_at);
    }

    pub fn enqueue_after<E: EventMember<S>>(&mut self, event: E, delay: Duration) {
        let planned_at = self.now + delay;
        self.push(event.wrap(), planned_at);
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.heap.peek().map(|record| record.planned_at)
    }

    pub fn count_pending(&self, kind: S::Kind) -> usize {
        self.heap
            .iter()
            .filter(|record| record.event.kind() == kind)
            .count()
    }

    /// Drops every pending event. The clock is left untouched.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn pop_ready(&mut self) -> Option<S> {
        self.pop_due().map(|record| record.event)
    }

    fn push(&mut self, event: S, planned_at: Timestamp) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.heap.push(Record {
            event,
            enqueued_at: self.now,
            planned_at,
            sequence,
        });
    }

    fn pop_due(&mut self) -> Option<Record<S>> {
        if self.heap.peek()?.planned_at > self.now {
            return None;
        }
        self.heap.pop()
    }
}

type Listener<S, C> = Box<dyn FnMut(&S, &mut EventQueue<S>, &mut C)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u32,
    pub dropped: u32,
}

/// Discrete-time event bus with statically typed listeners.
///
/// `C` is the mutable context handed to every listener (typically the game
/// state). Limitations: single-threaded, listeners can only be added, and an
/// event that keeps re-scheduling itself without a stop condition grows the
/// queue forever.
pub struct EventScheduler<S: EventSet, C> {
    queue: EventQueue<S>,
    listeners: HashMap<S::Kind, Vec<Listener<S, C>>>,
}

impl<S: EventSet, C> Default for EventScheduler<S, C> {
    fn default() -> Self {
        Self {
            queue: EventQueue::default(),
            listeners: HashMap::new(),
        }
    }
}

impl<S: EventSet, C> EventScheduler<S, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to events of type `E`. Listeners of one type run in
    /// registration order.
    pub fn register_listener<E, F>(&mut self, mut handler: F)
    where
        E: EventMember<S>,
        F: FnMut(&E, &mut EventQueue<S>, &mut C) + 'static,
    {
        let listener: Listener<S, C> = Box::new(
            move |event: &S, queue: &mut EventQueue<S>, context: &mut C| match E::peel(event) {
                Some(payload) => handler(payload, queue, context),
                None => error!(
                    expected = ?E::KIND,
                    actual = ?event.kind(),
                    "listener_kind_mismatch"
                ),
            },
        );
        self.listeners.entry(E::KIND).or_default().push(listener);
    }

    pub fn listener_count(&self, kind: S::Kind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    pub fn enqueue<E: EventMember<S>>(&mut self, event: E) {
        self.queue.enqueue(event);
    }

    pub fn enqueue_at<E: EventMember<S>>(&mut self, event: E, planned_at: Timestamp) {
        self.queue.enqueue_at(event, planned_at);
    }

    pub fn enqueue_after<E: EventMember<S>>(&mut self, event: E, delay: Duration) {
        self.queue.enqueue_after(event, delay);
    }

    pub fn queue(&self) -> &EventQueue<S> {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue<S> {
        &mut self.queue
    }

    pub fn now(&self) -> Timestamp {
        self.queue.now()
    }

    pub fn advance(&mut self, delta: Duration) {
        self.queue.advance(delta);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Runs every event whose planned time is not after `now`, earliest first.
    ///
    /// Each record is popped before its listeners run, so listeners may enqueue
    /// more events; anything they schedule for `now` or earlier is handled in the
    /// same call. Events without listeners are dropped with a diagnostic.
    pub fn dispatch(&mut self, context: &mut C) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(record) = self.queue.pop_due() {
            let kind = record.event.kind();
            let Some(listeners) = self.listeners.get_mut(&kind) else {
                debug!(
                    kind = ?kind,
                    planned_at = %record.planned_at,
                    "event_dropped_without_listener"
                );
                stats.dropped = stats.dropped.saturating_add(1);
                continue;
            };
            let latency = self.queue.now.saturating_duration_since(record.enqueued_at);
            debug!(kind = ?kind, latency_ms = latency.as_millis() as u64, "event_dispatched");
            for listener in listeners.iter_mut() {
                listener(&record.event, &mut self.queue, context);
            }
            stats.dispatched = stats.dispatched.saturating_add(1);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(Ping),
        Pong(Pong),
        Orphan(Orphan),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Ping,
        Pong,
        Orphan,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Pong(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Orphan;

    impl EventSet for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                Self::Ping(_) => TestKind::Ping,
                Self::Pong(_) => TestKind::Pong,
                Self::Orphan(_) => TestKind::Orphan,
            }
        }
    }

    impl EventMember<TestEvent> for Ping {
        const KIND: TestKind = TestKind::Ping;

        fn wrap(self) -> TestEvent {
            TestEvent::Ping(self)
        }

        fn peel(event: &TestEvent) -> Option<&Self> {
            match event {
                TestEvent::Ping(inner) => Some(inner),
                _ => None,
            }
        }
    }

    impl EventMember<TestEvent> for Pong {
        const KIND: TestKind = TestKind::Pong;

        fn wrap(self) -> TestEvent {
            TestEvent::Pong(self)
        }

        fn peel(event: &TestEvent) -> Option<&Self> {
            match event {
                TestEvent::Pong(inner) => Some(inner),
                _ => None,
            }
        }
    }

    impl EventMember<TestEvent> for Orphan {
        const KIND: TestKind = TestKind::Orphan;

        fn wrap(self) -> TestEvent {
            TestEvent::Orphan(self)
        }

        fn peel(event: &TestEvent) -> Option<&Self> {
            match event {
                TestEvent::Orphan(inner) => Some(inner),
                _ => None,
            }
        }
    }

    type Log = Vec<String>;

    fn scheduler() -> EventScheduler<TestEvent, Log> {
        EventScheduler::new()
    }

    #[test]
    fn future_event_waits_for_its_time() {
        let mut scheduler = scheduler();
        let mut log = Log::new();
        scheduler.register_listener::<Ping, _>(|ping, _, log: &mut Log| {
            log.push(format!("first {}", ping.0));
        });
        scheduler.register_listener::<Ping, _>(|ping, _, log: &mut Log| {
            log.push(format!("second {}", ping.0));
        });

        scheduler.enqueue_at(Ping(1), Timestamp::from_millis(100));
        scheduler.advance(Duration::from_millis(99));
        assert_eq!(scheduler.dispatch(&mut log), DispatchStats::default());
        assert!(log.is_empty());
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_millis(1));
        let stats = scheduler.dispatch(&mut log);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(log, vec!["first 1".to_string(), "second 1".to_string()]);
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(Duration::from_millis(500));
        scheduler.dispatch(&mut log);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn events_dispatch_in_planned_order_with_fifo_ties() {
        let mut scheduler = scheduler();
        let mut log = Log::new();
        scheduler.register_listener::<Ping, _>(|ping, _, log: &mut Log| {
            log.push(format!("ping {}", ping.0));
        });
        scheduler.register_listener::<Pong, _>(|pong, _, log: &mut Log| {
            log.push(format!("pong {}", pong.0));
        });

        scheduler.enqueue_at(Ping(3), Timestamp::from_millis(30));
        scheduler.enqueue_at(Pong(1), Timestamp::from_millis(10));
        scheduler.enqueue_at(Ping(2), Timestamp::from_millis(10));
        scheduler.enqueue_at(Pong(2), Timestamp::from_millis(10));
        scheduler.advance(Duration::from_millis(30));
        scheduler.dispatch(&mut log);

        assert_eq!(log, vec!["pong 1", "ping 2", "pong 2", "ping 3"]);
    }

    #[test]
    fn listener_can_enqueue_while_dispatching() {
        let mut scheduler = scheduler();
        let mut log = Log::new();
        scheduler.register_listener::<Ping, _>(|ping, queue, log: &mut Log| {
            log.push(format!("ping {}", ping.0));
            queue.enqueue(Pong(ping.0));
            queue.enqueue_after(Pong(ping.0 + 100), Duration::from_millis(50));
        });
        scheduler.register_listener::<Pong, _>(|pong, _, log: &mut Log| {
            log.push(format!("pong {}", pong.0));
        });

        scheduler.enqueue(Ping(1));
        let stats = scheduler.dispatch(&mut log);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(log, vec!["ping 1", "pong 1"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.queue().next_due(), Some(Timestamp::from_millis(50)));

        scheduler.advance(Duration::from_millis(50));
        scheduler.dispatch(&mut log);
        assert_eq!(log.last().map(String::as_str), Some("pong 101"));
    }

    #[test]
    fn event_without_listener_is_dropped_quietly() {
        let mut scheduler = scheduler();
        let mut log = Log::new();
        scheduler.register_listener::<Ping, _>(|ping, _, log: &mut Log| {
            log.push(format!("ping {}", ping.0));
        });

        scheduler.enqueue(Orphan);
        scheduler.enqueue(Ping(5));
        scheduler.enqueue_at(Ping(6), Timestamp::from_millis(10));
        let stats = scheduler.dispatch(&mut log);

        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(log, vec!["ping 5"]);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn clear_discards_pending_events() {
        let mut scheduler = scheduler();
        let mut log = Log::new();
        scheduler.register_listener::<Ping, _>(|ping, _, log: &mut Log| {
            log.push(format!("ping {}", ping.0));
        });
        scheduler.enqueue(Ping(1));
        scheduler.enqueue_after(Ping(2), Duration::from_secs(2));
        assert_eq!(scheduler.queue().count_pending(TestKind::Ping), 2);

        scheduler.clear();
        scheduler.advance(Duration::from_secs(5));
        scheduler.dispatch(&mut log);

        assert!(log.is_empty());
        assert!(scheduler.queue().is_empty());
        assert_eq!(scheduler.listener_count(TestKind::Ping), 1);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut queue = EventQueue::<TestEvent>::default();
        queue.set_now(Timestamp::from_millis(20));
        queue.set_now(Timestamp::from_millis(5));
        assert_eq!(queue.now(), Timestamp::from_millis(20));
    }
}
