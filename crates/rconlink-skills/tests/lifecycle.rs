use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rconlink_client::{CommandResult, CommandSender};
use rconlink_registry::RoutineRef;
use rconlink_skills::{
    run_routine, RoutineTiming, SkillContext, SkillError, SkillManager, CLEAR_SEQUENCE,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

type Responder = Box<dyn Fn(&str) -> (CommandResult, Duration) + Send + Sync>;

/// Sender that records every command and answers from a script.
struct ScriptedSender {
    log: Mutex<Vec<String>>,
    respond: Responder,
}

impl ScriptedSender {
    fn new(respond: impl Fn(&str) -> (CommandResult, Duration) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl CommandSender for ScriptedSender {
    fn send_command(
        &self,
        command: &str,
        _timeout: Duration,
    ) -> impl Future<Output = CommandResult> + Send {
        self.log.lock().unwrap().push(command.to_string());
        let (result, delay) = (self.respond)(command);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

fn ok(value: serde_json::Value) -> (CommandResult, Duration) {
    (CommandResult::ok(value.to_string()), Duration::ZERO)
}

fn fast_timing() -> RoutineTiming {
    RoutineTiming {
        poll_interval: Duration::from_millis(5),
        command_timeout: Duration::from_millis(200),
        walk_timeout: Duration::from_millis(200),
        mine_timeout: Duration::from_millis(200),
        attack_timeout: Duration::from_millis(200),
        settle_delay: Duration::from_millis(5),
    }
}

/// Every non-stop command stalls, keeping routines alive until cancelled.
fn stalling_world() -> Arc<ScriptedSender> {
    ScriptedSender::new(|command| {
        if CLEAR_SEQUENCE.iter().any(|prefix| command.starts_with(prefix)) {
            ok(json!({"stopped": true}))
        } else {
            (CommandResult::ok("{}"), Duration::from_secs(30))
        }
    })
}

async fn wait_until_idle<C: CommandSender + 'static>(manager: &SkillManager<C>, entity_id: i64) {
    for _ in 0..200 {
        if !manager.is_running(entity_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("skill for {entity_id} never finished");
}

#[tokio::test]
async fn second_start_for_same_entity_is_rejected() {
    let manager = SkillManager::with_timing(stalling_world(), fast_timing());

    let first = manager
        .start(5, "mine_until", &json!({"companionId": 5, "resource": "iron"}))
        .expect("first start should succeed");
    assert_eq!(first.skill_name, "mine_until");

    let err = manager
        .start(5, "combat_until", &json!({"companionId": 5}))
        .expect_err("second start should fail");
    match err {
        SkillError::AlreadyRunning {
            entity_id,
            skill,
            pid,
        } => {
            assert_eq!(entity_id, 5);
            assert_eq!(skill, "mine_until");
            assert_eq!(pid, first.pid);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(manager.running().len(), 1);

    manager.shutdown().await;
    assert!(manager.running().is_empty());
}

#[tokio::test]
async fn completion_frees_the_entity() {
    let sender = ScriptedSender::new(|command| {
        if command.starts_with("/fac_world_enemies") {
            ok(json!({"enemies": []}))
        } else {
            ok(json!({}))
        }
    });
    let manager = SkillManager::with_timing(sender, fast_timing());

    let first = manager
        .start(5, "combat_until", &json!({"companionId": 5}))
        .expect("start should succeed");
    wait_until_idle(&manager, 5).await;

    let second = manager
        .start(5, "combat_until", &json!({"companionId": 5}))
        .expect("start after completion should succeed");
    assert_ne!(first.pid, second.pid);
    wait_until_idle(&manager, 5).await;
}

#[tokio::test]
async fn stop_cancels_promptly_and_sends_clear_sequence() {
    let sender = stalling_world();
    let manager = SkillManager::with_timing(Arc::clone(&sender), fast_timing());
    let started = manager
        .start(9, "mine_until", &json!({"companionId": 9, "resource": "coal"}))
        .unwrap();

    let begun = std::time::Instant::now();
    let report = manager.stop(9).await;
    assert!(begun.elapsed() < Duration::from_secs(1));

    assert_eq!(report.stopped.as_ref().map(|s| s.pid), Some(started.pid));
    let cleared: Vec<&str> = report.cleared.iter().map(|c| c.command.as_str()).collect();
    assert_eq!(
        cleared,
        [
            "/fac_move_stop 9",
            "/fac_resource_mine_stop 9",
            "/fac_action_attack_stop 9"
        ]
    );
    assert!(report.summary.contains("stopped mine_until"));
    assert!(!manager.is_running(9));
    assert!(sender.commands().ends_with(&[
        "/fac_move_stop 9".to_string(),
        "/fac_resource_mine_stop 9".to_string(),
        "/fac_action_attack_stop 9".to_string(),
    ]));
}

/// Panics when dropped during normal execution, as when a cancelled
/// routine's in-flight command is torn down.
struct PanicOnDrop;

impl Drop for PanicOnDrop {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            panic!("in-flight command dropped");
        }
    }
}

/// Sender whose behaviour on chat and inventory commands breaks the task
/// running the routine.
struct FaultySender {
    log: Mutex<Vec<String>>,
    /// Panic as soon as this command is issued.
    panic_on: Option<&'static str>,
    /// Chat commands never finish and panic when abandoned.
    trap_chat: bool,
}

impl FaultySender {
    fn panicking_on(command: &'static str) -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            panic_on: Some(command),
            trap_chat: false,
        })
    }

    fn trapping_chat() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            panic_on: None,
            trap_chat: true,
        })
    }

    fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl CommandSender for FaultySender {
    fn send_command(
        &self,
        command: &str,
        _timeout: Duration,
    ) -> impl Future<Output = CommandResult> + Send {
        self.log.lock().unwrap().push(command.to_string());
        if self.panic_on.is_some_and(|prefix| command.starts_with(prefix)) {
            panic!("sender failed on {command}");
        }
        // Built lazily: a discarded PanicOnDrop would fire right here.
        let trap = (self.trap_chat && command.starts_with("/fac_chat_say")).then(|| PanicOnDrop);
        async move {
            if let Some(trap) = trap {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(trap);
            }
            CommandResult::ok("{}")
        }
    }
}

#[tokio::test]
async fn panicking_routine_frees_the_entity() {
    let sender = FaultySender::panicking_on("/fac_companion_inventory");
    let manager = SkillManager::with_timing(Arc::clone(&sender), fast_timing());
    let args = json!({"companionId": 5, "resource": "iron"});

    let first = manager.start(5, "mine_until", &args).expect("first start should succeed");
    wait_until_idle(&manager, 5).await;
    assert!(!manager.is_running(5));
    assert!(!manager.local_status(5).running);
    assert!(sender
        .commands()
        .contains(&"/fac_companion_inventory 5".to_string()));

    let second = manager
        .start(5, "mine_until", &args)
        .expect("start after a panicked run should succeed");
    assert_ne!(first.pid, second.pid);
    wait_until_idle(&manager, 5).await;
}

#[tokio::test]
async fn stop_absorbs_abnormal_task_end() {
    let sender = FaultySender::trapping_chat();
    let manager = SkillManager::with_timing(Arc::clone(&sender), fast_timing());
    let started = manager
        .start(8, "mine_until", &json!({"companionId": 8, "resource": "coal"}))
        .expect("start should succeed");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.is_running(8));

    let report = manager.stop(8).await;
    assert_eq!(report.stopped.as_ref().map(|s| s.pid), Some(started.pid));
    assert!(report.cleared.iter().all(|c| c.success));
    assert!(sender.commands().ends_with(&[
        "/fac_move_stop 8".to_string(),
        "/fac_resource_mine_stop 8".to_string(),
        "/fac_action_attack_stop 8".to_string(),
    ]));
    assert!(!manager.is_running(8));
    assert!(manager.running().is_empty());
}

#[tokio::test]
async fn stop_without_skill_still_clears() {
    let sender = ScriptedSender::new(|_| (CommandResult::failure("not connected: refused"), Duration::ZERO));
    let manager = SkillManager::with_timing(sender, fast_timing());

    let report = manager.stop(4).await;
    assert!(report.stopped.is_none());
    assert_eq!(report.cleared.len(), 3);
    assert!(report.cleared.iter().all(|c| !c.success));
    assert!(report.summary.contains("no skill running"), "{}", report.summary);
}

#[tokio::test]
async fn status_merges_server_and_local_state() {
    let sender = ScriptedSender::new(|command| {
        if command.starts_with("/fac_companion_position") {
            ok(json!({"position": {"x": 1.5, "y": -2}}))
        } else if command.starts_with("/fac_companion_health") {
            ok(json!({"self": {"health": 200, "max": 250, "pct": 80}}))
        } else {
            (CommandResult::ok("{}"), Duration::from_secs(30))
        }
    });
    let manager = SkillManager::with_timing(sender, fast_timing());

    let idle = manager.status(3).await;
    assert_eq!(idle.position, Some(json!({"x": 1.5, "y": -2})));
    assert_eq!(idle.health.as_ref().unwrap()["self"]["pct"], 80);
    assert!(!idle.local.running);

    manager
        .start(3, "mine_until", &json!({"companionId": 3, "resource": "stone"}))
        .unwrap();
    let busy = manager.status(3).await;
    assert!(busy.local.running);
    assert_eq!(busy.local.skill_name, Some("mine_until"));

    let value = serde_json::to_value(&busy).unwrap();
    assert_eq!(value["companionId"], 3);
    assert_eq!(value["running"], true);
    assert_eq!(value["skillName"], "mine_until");

    manager.shutdown().await;
}

#[tokio::test]
async fn status_reports_null_when_queries_fail() {
    let sender = ScriptedSender::new(|_| (CommandResult::failure("Command timeout after 200ms"), Duration::ZERO));
    let manager = SkillManager::with_timing(sender, fast_timing());

    let status = manager.status(1).await;
    assert_eq!(status.position, None);
    assert_eq!(status.health, None);
    let value = serde_json::to_value(&status).unwrap();
    assert!(value["position"].is_null());
}

#[tokio::test]
async fn unknown_skill_and_bad_arguments_fail_synchronously() {
    let manager = SkillManager::with_timing(stalling_world(), fast_timing());
    assert!(matches!(
        manager.start(1, "fly", &json!({})),
        Err(SkillError::UnknownSkill(_))
    ));
    assert!(matches!(
        manager.start(1, "mine_until", &json!({"companionId": 1})),
        Err(SkillError::Registry(_))
    ));
    assert!(manager.running().is_empty());
}

#[tokio::test]
async fn mine_until_collects_target_from_nearby_patch() {
    let harvested = Arc::new(AtomicU64::new(0));
    let world = Arc::clone(&harvested);
    let sender = ScriptedSender::new(move |command| {
        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts[0] {
            "/fac_companion_inventory" => {
                let count = world.load(Ordering::SeqCst);
                if count == 0 {
                    ok(json!({"items": {}}))
                } else {
                    ok(json!({"items": [{"name": "iron-ore", "count": count}]}))
                }
            }
            "/fac_resource_nearest" => ok(json!({"position": {"x": 3, "y": 4}, "distance": 1.2, "amount": 900})),
            "/fac_resource_mine" => ok(json!({"mining": true})),
            "/fac_resource_mine_status" => {
                world.store(50, Ordering::SeqCst);
                ok(json!({"status": {"active": false, "harvested": 50}}))
            }
            _ => ok(json!({})),
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 7, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["7", "iron-ore", "50"].iter().map(|s| s.to_string()).collect();

    let summary = run_routine(RoutineRef::MineUntil, &ctx, &args).await.unwrap();
    assert_eq!(summary, "mined 50 iron-ore; inventory holds 50");

    let commands = sender.commands();
    assert!(commands.contains(&"/fac_resource_mine 7 3 4 50 iron-ore".to_string()));
    assert!(commands.iter().all(|c| !c.starts_with("/fac_move_to")));
    assert_eq!(
        commands.last().map(String::as_str),
        Some("/fac_chat_say 7 Done! I have 50 iron-ore in inventory.")
    );
}

#[tokio::test]
async fn mine_until_stops_when_nothing_is_found() {
    let sender = ScriptedSender::new(|command| {
        if command.starts_with("/fac_resource_nearest") {
            ok(json!({"error": "No copper-ore found within 100 tiles"}))
        } else {
            ok(json!({"items": {}}))
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 2, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["2", "copper", "10"].iter().map(|s| s.to_string()).collect();

    let summary = run_routine(RoutineRef::MineUntil, &ctx, &args).await.unwrap();
    assert_eq!(summary, "mined 0 copper-ore; inventory holds 0");
    assert!(sender
        .commands()
        .contains(&"/fac_chat_say 2 No more copper-ore found nearby.".to_string()));
}

#[tokio::test]
async fn mine_until_stops_on_full_inventory_and_walks_back() {
    let sender = ScriptedSender::new(|command| {
        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts[0] {
            "/fac_companion_inventory" => ok(json!({
                "items": [{"name": "iron-ore", "count": 50}],
                "used_slots": 79,
                "total_slots": 80,
            })),
            "/fac_companion_position" => ok(json!({"position": {"x": 10, "y": 20}})),
            "/fac_resource_nearest" => ok(json!({"position": {"x": 3, "y": 4}, "distance": 1.2})),
            "/fac_resource_mine" => ok(json!({"mining": true})),
            "/fac_resource_mine_status" => ok(json!({"status": {"active": false, "harvested": 50}})),
            _ => ok(json!({})),
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 7, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["7", "iron-ore", "100", "10", "20"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let summary = run_routine(RoutineRef::MineUntil, &ctx, &args).await.unwrap();
    assert_eq!(summary, "mined 50 iron-ore; inventory holds 50");

    let commands = sender.commands();
    assert_eq!(
        commands.iter().filter(|c| c.starts_with("/fac_resource_mine ")).count(),
        1
    );
    let full = commands
        .iter()
        .position(|c| c == "/fac_chat_say 7 Inventory full, stopping here.")
        .expect("full inventory should be announced");
    let walk_home = commands
        .iter()
        .position(|c| c == "/fac_move_to 7 10 20")
        .expect("companion should walk back");
    assert!(full < walk_home);
    assert_eq!(
        commands.last().map(String::as_str),
        Some("/fac_chat_say 7 Done! I have 50 iron-ore in inventory.")
    );
}

#[tokio::test]
async fn combat_until_attacks_nearest_matching_enemy() {
    let sender = ScriptedSender::new(|command| {
        let verb = command.split_whitespace().next().unwrap();
        match verb {
            "/fac_world_enemies" => ok(json!({"enemies": [
                {"name": "small-worm-turret", "type": "turret", "position": {"x": 1, "y": 1}, "distance": 2},
                {"name": "small-biter", "type": "unit", "position": {"x": 4, "y": 0}, "distance": 4},
            ]})),
            "/fac_action_attack_start" => ok(json!({"started": true})),
            "/fac_action_attack_status" => ok(json!({"status": {"active": false, "kills": 1}})),
            _ => ok(json!({})),
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 2, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["2", "biter", "1"].iter().map(|s| s.to_string()).collect();

    let summary = run_routine(RoutineRef::CombatUntil, &ctx, &args).await.unwrap();
    assert_eq!(summary, "1 kills");

    let commands = sender.commands();
    assert_eq!(commands[0], "/fac_companion_stop_all 2");
    assert!(commands.contains(&"/fac_action_attack_start 2 4 0".to_string()));
}

#[tokio::test]
async fn combat_until_retreats_on_low_health() {
    let sender = ScriptedSender::new(|command| {
        let verb = command.split_whitespace().next().unwrap();
        match verb {
            "/fac_world_enemies" => ok(json!({"enemies": [
                {"name": "big-biter", "type": "unit", "position": {"x": 1, "y": 0}, "distance": 1},
            ]})),
            "/fac_action_attack_start" => ok(json!({"started": true})),
            "/fac_action_attack_status" => ok(json!({"status": {"active": true, "kills": 0}})),
            "/fac_companion_health" => ok(json!({"self": {"health": 20, "max": 250, "pct": 8}})),
            _ => ok(json!({})),
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 6, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["6", "all", "1"].iter().map(|s| s.to_string()).collect();

    run_routine(RoutineRef::CombatUntil, &ctx, &args).await.unwrap();
    let commands = sender.commands();
    assert!(commands.contains(&"/fac_chat_say 6 Health low, retreating!".to_string()));
    assert!(commands.contains(&"/fac_action_attack_stop 6".to_string()));
}

#[tokio::test]
async fn build_smelter_line_places_furnaces_and_inserters() {
    let sender = ScriptedSender::new(|command| {
        if command.starts_with("/fac_building_can_place") {
            ok(json!({"can_place": true}))
        } else {
            ok(json!({"success": true}))
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 1, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["1", "10", "20", "2", "stone-furnace", "horizontal", "left"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let summary = run_routine(RoutineRef::BuildSmelterLine, &ctx, &args)
        .await
        .unwrap();
    assert_eq!(summary, "Built smelter line: 4 entities placed");

    let commands = sender.commands();
    assert!(commands.contains(&"/fac_building_place 1 stone-furnace 12 20".to_string()));
    assert!(commands.contains(&"/fac_building_place 1 inserter 11 20 1".to_string()));
}

#[tokio::test]
async fn build_smelter_line_reports_blocked_tiles() {
    let sender = ScriptedSender::new(|command| {
        if command.starts_with("/fac_building_can_place") {
            ok(json!({"can_place": false, "reason": "water"}))
        } else {
            ok(json!({}))
        }
    });
    let ctx = SkillContext::new(Arc::clone(&sender), 1, CancellationToken::new(), fast_timing());
    let args: Vec<String> = ["1", "0", "0", "1", "stone-furnace", "vertical", "top"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let err = run_routine(RoutineRef::BuildSmelterLine, &ctx, &args)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Cannot place stone-furnace at (0, 0): water"), "{err}");
}

#[tokio::test]
async fn cancelled_context_stops_routine() {
    let sender = ScriptedSender::new(|_| ok(json!({})));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = SkillContext::new(sender, 1, cancel, fast_timing());
    let args: Vec<String> = ["1", "all", "3"].iter().map(|s| s.to_string()).collect();

    let err = run_routine(RoutineRef::CombatUntil, &ctx, &args)
        .await
        .unwrap_err();
    assert!(matches!(err, SkillError::Cancelled));
}
