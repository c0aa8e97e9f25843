//! Dispatcher behavior: routing, gating, failure isolation, dedup

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{message_from, transport, RecordingTransport};
use relaybot::application::errors::BotError;
use relaybot::application::messaging::Dispatcher;
use relaybot::domain::entities::Role;
use relaybot::domain::traits::{Transport, UserStore};
use relaybot::infrastructure::config::Config;
use relaybot::infrastructure::database::MemoryUserStore;
use relaybot::infrastructure::plugins::{
    command_fn, hook_fn, CommandSpec, Hook, HookEvent, PermissionEvaluator, PluginDescriptor,
    PluginRecord, PluginRegistry,
};

struct Harness {
    registry: Arc<PluginRegistry>,
    store: Arc<MemoryUserStore>,
    dispatcher: Dispatcher,
}

fn harness(owner: &str) -> Harness {
    common::init_logging();
    let config = Arc::new(Config::default());
    let registry = Arc::new(PluginRegistry::new());
    let store = Arc::new(MemoryUserStore::new());
    let permissions = PermissionEvaluator::new(owner, store.clone());
    let dispatcher = Dispatcher::new(registry.clone(), permissions, config);
    Harness {
        registry,
        store,
        dispatcher,
    }
}

fn counting_command(name: &str, pattern: &str) -> (PluginDescriptor, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let run = command_fn(move |_p| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let desc = PluginDescriptor::new()
        .with_name(name)
        .with_command(CommandSpec::new(pattern, run));
    (desc, calls)
}

fn counting_hook(name: &str, hook: Hook) -> (PluginDescriptor, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let f = hook_fn(move |_p| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (
        PluginDescriptor::new().with_name(name).with_hook(hook, f),
        calls,
    )
}

fn register(registry: &PluginRegistry, desc: PluginDescriptor) {
    registry
        .register(PluginRecord::from_descriptor(desc, None, 1).unwrap())
        .unwrap();
}

// End-to-end scenario: a ping command with a reaction glyph reacts once,
// runs once, and reports success.
#[tokio::test]
async fn command_with_reaction_runs_once() {
    let h = harness("");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let run = command_fn(move |p| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            p.transport.send_text(&p.message.chat_id, "pong").await?;
            Ok(())
        }
    });
    register(
        &h.registry,
        PluginDescriptor::new()
            .with_name("ping")
            .with_command(CommandSpec::new("ping", run).with_react("⚡")),
    );

    let (recording, transport) = transport();
    let msg = message_from("u1", "!ping");
    let handled = h
        .dispatcher
        .execute_command(&transport, "ping", &msg, vec![])
        .await
        .unwrap();

    assert!(handled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(recording.reaction_count(), 1);
    assert_eq!(recording.sent_texts(), vec!["pong"]);
}

#[tokio::test]
async fn unknown_command_is_a_silent_no_op() {
    let h = harness("");
    let (recording, transport) = transport();
    let msg = message_from("u1", "!nope");
    let handled = h
        .dispatcher
        .execute_command(&transport, "nope", &msg, vec![])
        .await
        .unwrap();

    assert!(!handled);
    assert!(recording.sent_texts().is_empty());
}

#[tokio::test]
async fn keyword_lookup_is_case_insensitive() {
    let h = harness("");
    let (desc, calls) = counting_command("ping", "ping");
    register(&h.registry, desc);

    let (_, transport) = transport();
    let msg = message_from("u1", "!PING");
    assert!(h
        .dispatcher
        .execute_command(&transport, "PING", &msg, vec![])
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Disabling leaves the keyword in the index (introspection can still find
// it) while invocation and hook fan-out treat the plugin as invisible.
#[tokio::test]
async fn disabled_plugin_is_invisible_to_invocation_and_hooks() {
    let h = harness("");
    let (mut desc, cmd_calls) = counting_command("ping", "ping");
    let (hook_desc, hook_calls) = counting_hook("ignored", Hook::Message);
    desc.on_message = hook_desc.on_message;
    register(&h.registry, desc);
    h.registry.set_enabled("ping", false).unwrap();

    assert!(h.registry.find_by_command("ping").is_some());

    let (_, transport) = transport();
    let msg = message_from("u1", "!ping");
    let handled = h
        .dispatcher
        .execute_command(&transport, "ping", &msg, vec![])
        .await
        .unwrap();
    assert!(!handled);
    assert_eq!(cmd_calls.load(Ordering::SeqCst), 0);

    h.dispatcher
        .run_hook(&transport, HookEvent::message(message_from("u1", "hi")))
        .await;
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn permission_failure_is_reported_and_re_raised() {
    let h = harness("");
    let (desc, calls) = counting_command("admin-only", "purge");
    register(&h.registry, desc.with_permission(Role::Admin));

    let (recording, transport) = transport();
    let msg = message_from("pleb", "!purge");
    let err = h
        .dispatcher
        .execute_command(&transport, "purge", &msg, vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::PermissionDenied(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // The user saw something before the error propagated
    let sent = recording.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("❌"));
}

#[tokio::test]
async fn sufficient_role_passes_the_gate() {
    let h = harness("");
    let (desc, calls) = counting_command("modcmd", "kick");
    register(&h.registry, desc.with_permission(Role::Mod));
    h.store.set_role("mod-user", Role::Admin).unwrap();

    let (_, transport) = transport();
    let msg = message_from("mod-user", "!kick");
    assert!(h
        .dispatcher
        .execute_command(&transport, "kick", &msg, vec![])
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Owner bypass is evaluated before the ban check, so a banned owner still
// clears any required role.
#[tokio::test]
async fn banned_owner_still_executes() {
    let h = harness("15550001111");
    let (desc, calls) = counting_command("owner-only", "shutdown");
    register(&h.registry, desc.with_permission(Role::Owner));
    h.store.set_banned("15550001111", true).unwrap();

    let (_, transport) = transport();
    let msg = message_from("15550001111@s.whatsapp.net", "!shutdown");
    assert!(h
        .dispatcher
        .execute_command(&transport, "shutdown", &msg, vec![])
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rapid_reinvocation_hits_cooldown() {
    let h = harness("");
    let (desc, calls) = counting_command("slow", "slow");
    register(&h.registry, desc.with_cooldown(30));

    let (recording, transport) = transport();
    let msg = message_from("u1", "!slow");
    assert!(h
        .dispatcher
        .execute_command(&transport, "slow", &msg, vec![])
        .await
        .unwrap());

    let err = h
        .dispatcher
        .execute_command(&transport, "slow", &msg, vec![])
        .await
        .unwrap_err();
    assert!(err.cooldown_remaining().unwrap() > 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(recording.sent_texts().len(), 1);

    // Another user is unaffected
    let other = message_from("u2", "!slow");
    assert!(h
        .dispatcher
        .execute_command(&transport, "slow", &other, vec![])
        .await
        .unwrap());
}

#[tokio::test]
async fn run_failure_is_reported_then_re_thrown() {
    let h = harness("");
    let run = command_fn(|_p| async {
        Err(BotError::ExternalService {
            service: "jokes-api".to_string(),
            message: "upstream 500".to_string(),
        })
    });
    register(
        &h.registry,
        PluginDescriptor::new()
            .with_name("jokes")
            .with_command(CommandSpec::new("joke", run)),
    );

    let (recording, transport) = transport();
    let msg = message_from("u1", "!joke");
    let err = h
        .dispatcher
        .execute_command(&transport, "joke", &msg, vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::ExternalService { .. }));
    let sent = recording.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("jokes-api"));
}

#[tokio::test]
async fn failed_reaction_never_aborts_the_command() {
    let h = harness("");
    let (desc, calls) = counting_command("ping", "ping");
    let mut desc = desc;
    desc.command = desc.command.map(|c| c.with_react("⚡"));
    register(&h.registry, desc);

    let recording = Arc::new(RecordingTransport::with_failing_reactions());
    let transport: Arc<dyn Transport> = recording.clone();
    let msg = message_from("u1", "!ping");
    assert!(h
        .dispatcher
        .execute_command(&transport, "ping", &msg, vec![])
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Fan-out isolation: with three subscribers where the middle one fails,
// the first and third still see the event exactly once.
#[tokio::test]
async fn hook_failure_does_not_stop_fan_out() {
    let h = harness("");
    let (first, first_calls) = counting_hook("first", Hook::Message);
    register(&h.registry, first);

    let broken = hook_fn(|_p| async { Err(BotError::Internal("boom".to_string())) });
    register(
        &h.registry,
        PluginDescriptor::new()
            .with_name("broken")
            .with_hook(Hook::Message, broken),
    );

    let (third, third_calls) = counting_hook("third", Hook::Message);
    register(&h.registry, third);

    let (_, transport) = transport();
    h.dispatcher
        .run_hook(&transport, HookEvent::message(message_from("u1", "hi")))
        .await;

    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(third_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hooks_only_fire_for_their_category() {
    let h = harness("");
    let (msg_hook, msg_calls) = counting_hook("watcher", Hook::Message);
    let (status_hook, status_calls) = counting_hook("status-watcher", Hook::Status);
    register(&h.registry, msg_hook);
    register(&h.registry, status_hook);

    let (_, transport) = transport();
    h.dispatcher
        .run_hook(
            &transport,
            HookEvent::raw(Hook::Status, serde_json::json!({"status": "posted"})),
        )
        .await;

    assert_eq!(msg_calls.load(Ordering::SeqCst), 0);
    assert_eq!(status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_inbound_events_are_absorbed() {
    let h = harness("");
    let (desc, calls) = counting_command("ping", "ping");
    register(&h.registry, desc);
    let (msg_hook, hook_calls) = counting_hook("watcher", Hook::Message);
    register(&h.registry, msg_hook);

    let (_, transport) = transport();
    let msg = message_from("u1", "!ping").with_id("msg-42");

    assert!(h
        .dispatcher
        .handle_inbound(&transport, msg.clone())
        .await
        .unwrap());
    // Redelivery of the same id is dropped before any routing
    assert!(!h.dispatcher.handle_inbound(&transport, msg).await.unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inbound_plain_text_only_reaches_hooks() {
    let h = harness("");
    let (desc, calls) = counting_command("ping", "ping");
    register(&h.registry, desc);
    let (msg_hook, hook_calls) = counting_hook("watcher", Hook::Message);
    register(&h.registry, msg_hook);

    let (_, transport) = transport();
    let handled = h
        .dispatcher
        .handle_inbound(&transport, message_from("u1", "just chatting"))
        .await
        .unwrap();

    assert!(!handled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

// Plugin state persists across invocations of the same load via the
// per-plugin mutable context.
#[tokio::test]
async fn plugin_context_persists_across_invocations() {
    let h = harness("");
    let run = command_fn(|p| async move {
        let mut ctx = p.context.lock().unwrap();
        let count = ctx.get("count").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        ctx.insert("count".to_string(), serde_json::json!(count));
        Ok(())
    });
    register(
        &h.registry,
        PluginDescriptor::new()
            .with_name("counter")
            .with_command(CommandSpec::new("count", run)),
    );

    let (_, transport) = transport();
    let msg = message_from("u1", "!count");
    for _ in 0..3 {
        h.dispatcher
            .execute_command(&transport, "count", &msg, vec![])
            .await
            .unwrap();
    }

    let record = h.registry.get("counter").unwrap();
    let ctx = record.context.lock().unwrap();
    assert_eq!(ctx.get("count").and_then(|v| v.as_u64()), Some(3));
}
