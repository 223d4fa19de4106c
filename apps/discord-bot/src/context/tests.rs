use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Sent(String),
    Reacted(u32, String),
    Deleted(u32),
    WaitedReply(Duration),
    WaitedReaction(u32, Duration),
    Help(String),
    // Connection lifecycle, as seen by the pool.
    Acquired(u32, Option<Duration>),
    Released(u32),
}

type Log = std::sync::Arc<Mutex<Vec<Event>>>;

struct MockTransport {
    log: Log,
    next_id: AtomicU32,
    can_react: bool,
    fail_permission_lookup: bool,
    fail_delete: bool,
    replies: Mutex<VecDeque<Option<String>>>,
    reaction: Option<String>,
}

impl MockTransport {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            next_id: AtomicU32::new(1),
            can_react: true,
            fail_permission_lookup: false,
            fail_delete: false,
            replies: Mutex::new(VecDeque::new()),
            reaction: None,
        }
    }

    fn replies(self, replies: &[Option<&str>]) -> Self {
        *self.replies.lock().unwrap() = replies.iter().map(|r| r.map(String::from)).collect();
        self
    }

    fn reaction(mut self, emoji: &str) -> Self {
        self.reaction = Some(emoji.to_string());
        self
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Message = u32;

    async fn send(&self, content: String) -> Result<u32, Error> {
        self.push(Event::Sent(content));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn add_reaction(&self, message: &u32, emoji: &str) -> Result<(), Error> {
        self.push(Event::Reacted(*message, emoji.to_string()));
        Ok(())
    }

    async fn delete(&self, message: &u32) -> Result<(), Error> {
        if self.fail_delete {
            return Err(Error::interaction("message already gone"));
        }
        self.push(Event::Deleted(*message));
        Ok(())
    }

    async fn can_add_reactions(&self) -> Result<bool, Error> {
        if self.fail_permission_lookup {
            return Err(Error::NotFound("guild channel"));
        }
        Ok(self.can_react)
    }

    async fn wait_for_reply(
        &self,
        accept: for<'s> fn(&'s str) -> bool,
        timeout: Duration,
    ) -> Option<String> {
        self.push(Event::WaitedReply(timeout));
        let mut replies = self.replies.lock().unwrap();
        // Replies the filter rejects are skipped, like a real collector would.
        while let Some(reply) = replies.pop_front() {
            match reply {
                Some(content) if accept(&content) => return Some(content),
                Some(_) => continue,
                None => return None,
            }
        }
        None
    }

    async fn wait_for_reaction(
        &self,
        message: &u32,
        choices: &[&str],
        timeout: Duration,
    ) -> Option<String> {
        self.push(Event::WaitedReaction(*message, timeout));
        self.reaction
            .clone()
            .filter(|emoji| choices.contains(&emoji.as_str()))
    }

    fn command_name(&self) -> String {
        "tag create".to_string()
    }

    async fn render_help(&self, command: &str) -> Result<(), Error> {
        self.push(Event::Help(command.to_string()));
        Ok(())
    }
}

struct MockPool {
    log: Log,
    next_id: AtomicU32,
    acquires: AtomicUsize,
    releases: AtomicUsize,
}

impl MockPool {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            next_id: AtomicU32::new(100),
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConnectionPool for MockPool {
    type Connection = u32;

    async fn acquire(&self, timeout: Option<Duration>) -> Result<u32, Error> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::Acquired(id, timeout));
        Ok(id)
    }

    async fn release(&self, conn: u32) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::Released(conn));
    }
}

struct FailingPool;

#[async_trait]
impl ConnectionPool for FailingPool {
    type Connection = u32;

    async fn acquire(&self, _timeout: Option<Duration>) -> Result<u32, Error> {
        Err(Error::Database(sqlx::Error::PoolTimedOut))
    }

    async fn release(&self, _conn: u32) {
        panic!("nothing was ever acquired");
    }
}

type MockContext = InvocationContext<MockTransport, MockPool>;

fn setup(transport: impl FnOnce(&Log) -> MockTransport) -> (MockContext, Log) {
    let log = Log::default();
    let ctx = InvocationContext::new(transport(&log), MockPool::new(&log));
    (ctx, log)
}

fn events(log: &Log) -> Vec<Event> {
    log.lock().unwrap().clone()
}

fn sent(log: &Log) -> Vec<String> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Sent(content) => Some(content),
            _ => None,
        })
        .collect()
}

fn connection_lifecycle(log: &Log) -> Vec<Event> {
    events(log)
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                Event::Acquired(..) | Event::Released(_) | Event::WaitedReaction(..)
            )
        })
        .collect()
}

fn abc() -> Vec<&'static str> {
    vec!["A", "B", "C"]
}

fn numbered(i: usize, m: &&str) -> String {
    format!("{i}: {m}")
}

#[tokio::test]
async fn acquiring_twice_reuses_the_held_connection() {
    let (mut ctx, log) = setup(MockTransport::new);
    let timeout = Some(Duration::from_millis(250));

    let first = *ctx.acquire(timeout).await.unwrap();
    let second = *ctx.acquire(Some(Duration::from_secs(1))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.pool().acquires.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.db().copied(), Some(first));
    assert_eq!(events(&log), [Event::Acquired(first, timeout)]);
}

#[tokio::test]
async fn releasing_twice_only_returns_the_connection_once() {
    let (mut ctx, log) = setup(MockTransport::new);

    let conn = *ctx.acquire(None).await.unwrap();
    ctx.release().await;
    ctx.release().await;

    assert!(!ctx.is_acquired());
    assert_eq!(ctx.pool().releases.load(Ordering::SeqCst), 1);
    assert_eq!(events(&log), [Event::Acquired(conn, None), Event::Released(conn)]);
}

#[tokio::test]
async fn release_without_a_connection_does_not_touch_the_pool() {
    let (mut ctx, log) = setup(MockTransport::new);
    ctx.release().await;
    assert_eq!(ctx.pool().releases.load(Ordering::SeqCst), 0);
    assert!(events(&log).is_empty());
}

#[tokio::test]
async fn scope_releases_after_success_and_failure() {
    let (mut ctx, _log) = setup(MockTransport::new);

    let doubled = ctx
        .acquire(None)
        .scope(|conn| Box::pin(async move { Ok(*conn * 2) }))
        .await
        .unwrap();
    assert_eq!(doubled, 200);
    assert!(!ctx.is_acquired());

    let err = ctx
        .acquire(None)
        .scope(|_conn| Box::pin(async move { Err::<(), _>(Error::interaction("boom")) }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Interaction(msg) if msg == "boom"));
    assert!(!ctx.is_acquired());
    assert_eq!(ctx.pool().releases.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scope_propagates_acquire_failures() {
    let log = Log::default();
    let mut ctx = InvocationContext::new(MockTransport::new(&log), FailingPool);

    let err = ctx
        .acquire(None)
        .scope(|_conn| Box::pin(async move { Ok(()) }))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Database(sqlx::Error::PoolTimedOut)));
    assert!(!ctx.is_acquired());
}

#[tokio::test]
async fn run_releases_the_connection_when_the_body_fails() {
    let (ctx, log) = setup(MockTransport::new);

    let result: Result<(), Error> = ctx
        .run(|cx| {
            Box::pin(async move {
                cx.acquire(None).await?;
                Err(Error::interaction("handler failed"))
            })
        })
        .await;

    assert!(result.is_err());
    assert_eq!(events(&log), [Event::Acquired(100, None), Event::Released(100)]);
}

#[tokio::test]
async fn entry_helpers_send_a_single_code_block() {
    let (ctx, log) = setup(MockTransport::new);

    ctx.entry_to_code(&[("Name", "crimson"), ("ID", "1")]).await.unwrap();
    ctx.indented_entry_to_code(&[("Name", "crimson"), ("ID", "1")]).await.unwrap();

    assert_eq!(
        sent(&log),
        [
            "```\nName: crimson\nID  : 1\n```",
            "```\n\u{200b}Name: crimson\n\u{200b}  ID: 1\n```",
        ]
    );
}

#[tokio::test]
async fn selection_returns_the_numbered_candidate() {
    let (ctx, log) = setup(|log| MockTransport::new(log).replies(&[Some("2")]));

    let picked = ctx.too_many_matches(abc(), numbered).await.unwrap();

    assert_eq!(picked, "B");
    assert_eq!(
        sent(&log),
        [
            "There are too many matches... Which one did you mean? **Only say the number**.",
            "1: A\n2: B\n3: C",
        ]
    );
    assert!(events(&log).contains(&Event::WaitedReply(Duration::from_secs(10))));
}

#[tokio::test]
async fn selection_retries_after_an_out_of_range_number() {
    let (ctx, log) = setup(|log| MockTransport::new(log).replies(&[Some("9"), Some("2")]));

    let picked = ctx.too_many_matches(abc(), numbered).await.unwrap();

    assert_eq!(picked, "B");
    assert_eq!(
        sent(&log).last().map(String::as_str),
        Some("Please give me a valid number. 2 tries remaining...")
    );
}

#[tokio::test]
async fn selection_ignores_replies_that_are_not_numbers() {
    let (ctx, log) = setup(|log| MockTransport::new(log).replies(&[Some("the second"), Some("3")]));

    let picked = ctx.too_many_matches(abc(), numbered).await.unwrap();

    assert_eq!(picked, "C");
    assert_eq!(sent(&log).len(), 2);
}

#[tokio::test]
async fn selection_gives_up_after_three_invalid_numbers() {
    let replies = [Some("0"), Some("4"), Some("17")];
    let (ctx, log) = setup(|log| MockTransport::new(log).replies(&replies));

    let err = ctx.too_many_matches(abc(), numbered).await.unwrap_err();

    assert!(matches!(err, Error::Interaction(msg) if msg == "Too many tries. Goodbye."));
    let notices: Vec<_> = sent(&log).into_iter().skip(2).collect();
    assert_eq!(
        notices,
        [
            "Please give me a valid number. 2 tries remaining...",
            "Please give me a valid number. 1 tries remaining...",
            "Please give me a valid number. 0 tries remaining...",
        ]
    );
}

#[tokio::test]
async fn selection_times_out() {
    let (ctx, _log) = setup(|log| MockTransport::new(log).replies(&[None]));

    let err = ctx.too_many_matches(abc(), numbered).await.unwrap_err();

    assert!(matches!(err, Error::Interaction(msg) if msg == "Took too long. Goodbye."));
}

#[tokio::test]
async fn prompt_confirm_and_deny() {
    let (mut ctx, _log) = setup(|log| MockTransport::new(log).reaction(CONFIRM_EMOJI));
    assert_eq!(ctx.prompt("Delete it?", PromptOptions::default()).await.unwrap(), Some(true));

    let (mut ctx, _log) = setup(|log| MockTransport::new(log).reaction(DENY_EMOJI));
    assert_eq!(ctx.prompt("Delete it?", PromptOptions::default()).await.unwrap(), Some(false));
}

#[tokio::test]
async fn prompt_timeout_is_distinct_from_deny() {
    let (mut ctx, log) = setup(MockTransport::new);
    let options = PromptOptions::default().timeout(Duration::from_secs(5));

    assert_eq!(ctx.prompt("Delete it?", options).await.unwrap(), None);
    assert!(events(&log).contains(&Event::WaitedReaction(1, Duration::from_secs(5))));
}

#[tokio::test]
async fn prompt_sends_instructions_reacts_and_cleans_up() {
    let (mut ctx, log) = setup(|log| MockTransport::new(log).reaction(CONFIRM_EMOJI));
    let options = PromptOptions::default().reacquire(false);

    ctx.prompt("Really?", options).await.unwrap();

    assert_eq!(
        events(&log),
        [
            Event::Sent(format!(
                "Really?\n\nReact with {CONFIRM_EMOJI} to confirm or {DENY_EMOJI} to deny."
            )),
            Event::Reacted(1, CONFIRM_EMOJI.to_string()),
            Event::Reacted(1, DENY_EMOJI.to_string()),
            Event::WaitedReaction(1, Duration::from_secs(60)),
            Event::Deleted(1),
        ]
    );
}

#[tokio::test]
async fn prompt_releases_before_waiting_and_reacquires_after() {
    let (mut ctx, log) = setup(MockTransport::new);
    let held = *ctx.acquire(None).await.unwrap();

    let options = PromptOptions::default().delete_after(false);
    let answer = ctx.prompt("Really?", options).await.unwrap();

    assert_eq!(answer, None);
    assert_eq!(
        connection_lifecycle(&log),
        [
            Event::Acquired(held, None),
            Event::Released(held),
            Event::WaitedReaction(1, Duration::from_secs(60)),
            Event::Acquired(held + 1, None),
        ]
    );
    assert_eq!(ctx.db().copied(), Some(held + 1));
    assert!(!events(&log).contains(&Event::Deleted(1)));
}

#[tokio::test]
async fn prompt_reacquires_after_an_explicit_answer() {
    for (emoji, expected) in [(CONFIRM_EMOJI, Some(true)), (DENY_EMOJI, Some(false))] {
        let (mut ctx, log) = setup(|log| MockTransport::new(log).reaction(emoji));
        let held = *ctx.acquire(None).await.unwrap();

        let answer = ctx.prompt("Really?", PromptOptions::default()).await.unwrap();

        assert_eq!(answer, expected);
        assert_eq!(
            connection_lifecycle(&log),
            [
                Event::Acquired(held, None),
                Event::Released(held),
                Event::WaitedReaction(1, Duration::from_secs(60)),
                Event::Acquired(held + 1, None),
            ]
        );
        assert!(ctx.is_acquired());
    }
}

#[tokio::test]
async fn prompt_fails_before_sending_when_permissions_cannot_be_resolved() {
    let (mut ctx, log) = setup(|log| {
        let mut transport = MockTransport::new(log).reaction(CONFIRM_EMOJI);
        transport.fail_permission_lookup = true;
        transport
    });

    let err = ctx.prompt("Really?", PromptOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::NotFound("guild channel")));
    assert!(events(&log).is_empty());
}

#[tokio::test]
async fn prompt_keeps_the_connection_without_reacquire() {
    let (mut ctx, _log) = setup(|log| MockTransport::new(log).reaction(DENY_EMOJI));
    let held = *ctx.acquire(None).await.unwrap();

    ctx.prompt("Really?", PromptOptions::default().reacquire(false)).await.unwrap();

    assert_eq!(ctx.db().copied(), Some(held));
    assert_eq!(ctx.pool().acquires.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.pool().releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn prompt_swallows_delete_failures() {
    let (mut ctx, _log) = setup(|log| {
        let mut transport = MockTransport::new(log).reaction(CONFIRM_EMOJI);
        transport.fail_delete = true;
        transport
    });

    assert_eq!(ctx.prompt("Really?", PromptOptions::default()).await.unwrap(), Some(true));
}

#[tokio::test]
async fn prompt_without_reaction_permission_has_no_side_effects() {
    let (mut ctx, log) = setup(|log| {
        let mut transport = MockTransport::new(log);
        transport.can_react = false;
        transport
    });
    ctx.acquire(None).await.unwrap();
    log.lock().unwrap().clear();

    let err = ctx.prompt("Really?", PromptOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::MissingPermission("Add Reactions")));
    assert!(events(&log).is_empty());
    assert!(ctx.is_acquired());
}

#[tokio::test]
async fn prompt_defaults_can_be_overridden_per_context() {
    let log = Log::default();
    let ctx = InvocationContext::new(MockTransport::new(&log), MockPool::new(&log))
        .with_prompt_defaults(PromptOptions::default().timeout(Duration::from_secs(15)));

    assert_eq!(ctx.prompt_options().timeout, Duration::from_secs(15));
    assert!(ctx.prompt_options().reacquire);
}

#[tokio::test]
async fn help_defaults_to_the_running_command() {
    let (ctx, log) = setup(MockTransport::new);

    ctx.show_help(None).await.unwrap();
    ctx.show_help(Some("ping")).await.unwrap();

    assert_eq!(
        events(&log),
        [Event::Help("tag create".into()), Event::Help("ping".into())]
    );
}

#[test]
fn debug_output_ignores_field_values() {
    let (ctx, _log) = setup(MockTransport::new);
    assert_eq!(format!("{ctx:?}"), "InvocationContext { .. }");
}

#[test]
fn tick_is_exposed_on_the_context() {
    let (ctx, _log) = setup(MockTransport::new);
    assert_eq!(ctx.tick(true, Some("ok")), format!("{}: ok", code::TICK_YES));
}

#[test]
fn numeric_replies_only() {
    assert!(is_number("12"));
    assert!(!is_number(""));
    assert!(!is_number("-1"));
    assert!(!is_number("2 please"));
}
